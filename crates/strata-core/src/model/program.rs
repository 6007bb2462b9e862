//! The [`Program`] arena and its query API.

use std::collections::HashMap;

use super::{
    Class, ClassId, ClassKind, EntityKey, EntityKind, EntityRef, Field, FieldId, File, FileId,
    Local, LocalId, Method, MethodId, Origin, Package, PackageId,
};
use crate::intern::DrainedExternals;
use crate::resolution::ResolutionStatus;

/// The assembled entity graph of one analysis run.
///
/// Arenas are append-only vectors indexed by id, so iteration is always in
/// id (creation) order. Secondary indexes map identity keys to ids:
/// qualified class names, `(class, signature)` for methods, `(class, name)`
/// for fields and `(method, key)` for locals.
#[derive(Debug, Clone, Default)]
pub struct Program {
    name: String,

    // Primary storage
    files: Vec<File>,
    packages: Vec<Package>,
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    locals: Vec<Local>,

    // Secondary indexes
    package_by_name: HashMap<String, PackageId>,
    class_by_name: HashMap<String, ClassId>,
    method_index: HashMap<(ClassId, String), MethodId>,
    field_index: HashMap<(ClassId, String), FieldId>,
    local_index: HashMap<(MethodId, String), LocalId>,

    // External members interned on sealed in-project classes
    adopted_methods: HashMap<ClassId, Vec<MethodId>>,
    adopted_fields: HashMap<ClassId, Vec<FieldId>>,

    unknown_class: Option<ClassId>,
}

/// Arena sizes recorded before a file is declared, for per-file rollback.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    files: usize,
    packages: usize,
    classes: usize,
    methods: usize,
    fields: usize,
    locals: usize,
    package_classes: Vec<usize>,
}

impl Program {
    /// Create an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Program {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------------
    // Enumeration
    // ------------------------------------------------------------------------

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.iter()
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    /// All classes, external ones included.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn locals(&self) -> impl Iterator<Item = &Local> {
        self.locals.iter()
    }

    /// In-project classes without an enclosing class.
    pub fn top_level_classes(&self) -> impl Iterator<Item = &Class> {
        self.classes
            .iter()
            .filter(|c| c.is_in_project() && c.enclosing.is_none())
    }

    /// Classes whose declared superclass is `id`.
    pub fn subclasses_of(&self, id: ClassId) -> Vec<ClassId> {
        self.classes
            .iter()
            .filter(|c| c.superclass == Some(id))
            .map(|c| c.id)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn file(&self, id: FileId) -> Option<&File> {
        self.files.get(id.index())
    }

    pub fn package(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(id.index())
    }

    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.index())
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.index())
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.index())
    }

    pub fn local(&self, id: LocalId) -> Option<&Local> {
        self.locals.get(id.index())
    }

    pub fn package_by_name(&self, name: &str) -> Option<PackageId> {
        self.package_by_name.get(name).copied()
    }

    /// Look up a class (in-project or external) by qualified name.
    pub fn class_by_name(&self, qualified_name: &str) -> Option<ClassId> {
        self.class_by_name.get(qualified_name).copied()
    }

    pub fn method_in(&self, class: ClassId, signature: &str) -> Option<MethodId> {
        self.method_index
            .get(&(class, signature.to_string()))
            .copied()
    }

    pub fn field_in(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.field_index.get(&(class, name.to_string())).copied()
    }

    /// External methods interned on a sealed in-project class (implicit
    /// constructors, inherited library methods), in id order.
    pub fn adopted_methods(&self, class: ClassId) -> &[MethodId] {
        self.adopted_methods
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// External fields interned on a sealed in-project class, in id order.
    pub fn adopted_fields(&self, class: ClassId) -> &[FieldId] {
        self.adopted_fields
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn local_in(&self, method: MethodId, key: &str) -> Option<LocalId> {
        self.local_index.get(&(method, key.to_string())).copied()
    }

    /// The synthetic unknown/array class, if any reference needed it.
    pub fn unknown_class(&self) -> Option<ClassId> {
        self.unknown_class
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Resolution status of a class and all of its members.
    pub fn class_resolution(&self, id: ClassId) -> ResolutionStatus {
        let Some(class) = self.class(id) else {
            return ResolutionStatus::complete();
        };
        let methods = class
            .methods
            .iter()
            .filter_map(|m| self.method(*m))
            .map(Method::resolution);
        let fields = class
            .fields
            .iter()
            .filter_map(|f| self.field(*f))
            .map(|f| f.status);
        methods
            .chain(fields)
            .fold(class.type_use_status, ResolutionStatus::merge)
    }

    // ------------------------------------------------------------------------
    // Entity references
    // ------------------------------------------------------------------------

    /// Whether `entity` denotes an entity of this program.
    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Project => true,
            EntityRef::Package(id) => self.package(id).is_some(),
            EntityRef::Class(id) => self.class(id).is_some(),
            EntityRef::Method(id) => self.method(id).is_some(),
            EntityRef::Field(id) => self.field(id).is_some(),
        }
    }

    /// Whether `entity` was declared in the analyzed sources.
    pub fn is_in_project(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Project => true,
            EntityRef::Package(id) => self.package(id).is_some_and(Package::is_in_project),
            EntityRef::Class(id) => self.class(id).is_some_and(Class::is_in_project),
            EntityRef::Method(id) => self.method(id).is_some_and(Method::is_in_project),
            EntityRef::Field(id) => self.field(id).is_some_and(Field::is_in_project),
        }
    }

    /// In-project entities of one kind, in id order.
    pub fn population(&self, kind: EntityKind) -> Vec<EntityRef> {
        match kind {
            EntityKind::Project => vec![EntityRef::Project],
            EntityKind::Package => self
                .packages
                .iter()
                .filter(|p| p.is_in_project())
                .map(|p| EntityRef::Package(p.id))
                .collect(),
            EntityKind::Class => self
                .classes
                .iter()
                .filter(|c| c.is_in_project())
                .map(|c| EntityRef::Class(c.id))
                .collect(),
            EntityKind::Method => self
                .methods
                .iter()
                .filter(|m| m.is_in_project())
                .map(|m| EntityRef::Method(m.id))
                .collect(),
            EntityKind::Field => self
                .fields
                .iter()
                .filter(|f| f.is_in_project())
                .map(|f| EntityRef::Field(f.id))
                .collect(),
        }
    }

    /// Human-readable qualified name of an entity.
    pub fn describe(&self, entity: EntityRef) -> String {
        match self.key_of(entity) {
            Some(EntityKey::Project) => format!("project {}", self.name),
            Some(EntityKey::Package { name }) if name.is_empty() => "(default)".to_string(),
            Some(EntityKey::Package { name }) | Some(EntityKey::Class { name }) => name,
            Some(EntityKey::Method { class, signature }) => format!("{}.{}", class, signature),
            Some(EntityKey::Field { class, name }) => format!("{}.{}", class, name),
            None => format!("{:?}", entity),
        }
    }

    /// Stable key of an entity; `None` if the handle is dangling.
    pub fn key_of(&self, entity: EntityRef) -> Option<EntityKey> {
        match entity {
            EntityRef::Project => Some(EntityKey::Project),
            EntityRef::Package(id) => self.package(id).map(|p| EntityKey::Package {
                name: p.name.clone(),
            }),
            EntityRef::Class(id) => self.class(id).map(|c| EntityKey::Class {
                name: c.qualified_name.clone(),
            }),
            EntityRef::Method(id) => self.method(id).map(|m| EntityKey::Method {
                class: self.qualified_name(m.declaring),
                signature: m.signature.clone(),
            }),
            EntityRef::Field(id) => self.field(id).map(|f| EntityKey::Field {
                class: self.qualified_name(f.declaring),
                name: f.name.clone(),
            }),
        }
    }

    /// Map a stable key back to an entity of this program.
    pub fn resolve_key(&self, key: &EntityKey) -> Option<EntityRef> {
        match key {
            EntityKey::Project => Some(EntityRef::Project),
            EntityKey::Package { name } => self.package_by_name(name).map(EntityRef::Package),
            EntityKey::Class { name } => self.class_by_name(name).map(EntityRef::Class),
            EntityKey::Method { class, signature } => {
                let class = self.class_by_name(class)?;
                self.method_in(class, signature).map(EntityRef::Method)
            }
            EntityKey::Field { class, name } => {
                let class = self.class_by_name(class)?;
                self.field_in(class, name).map(EntityRef::Field)
            }
        }
    }

    pub(crate) fn class_key(&self, id: ClassId) -> EntityKey {
        EntityKey::Class {
            name: self.qualified_name(id),
        }
    }

    pub(crate) fn method_key(&self, id: MethodId) -> EntityKey {
        self.key_of(EntityRef::Method(id))
            .unwrap_or_else(|| EntityKey::Method {
                class: String::new(),
                signature: id.to_string(),
            })
    }

    pub(crate) fn field_key(&self, id: FieldId) -> EntityKey {
        self.key_of(EntityRef::Field(id))
            .unwrap_or_else(|| EntityKey::Field {
                class: String::new(),
                name: id.to_string(),
            })
    }

    fn qualified_name(&self, id: ClassId) -> String {
        self.class(id)
            .map(|c| c.qualified_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    // ------------------------------------------------------------------------
    // Construction (crate-internal)
    // ------------------------------------------------------------------------

    pub(crate) fn next_class_id(&self) -> ClassId {
        ClassId::new(self.classes.len() as u32)
    }

    pub(crate) fn next_method_id(&self) -> MethodId {
        MethodId::new(self.methods.len() as u32)
    }

    pub(crate) fn next_field_id(&self) -> FieldId {
        FieldId::new(self.fields.len() as u32)
    }

    pub(crate) fn add_file(&mut self, path: &str, package: PackageId, line_count: u32) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        self.files.push(File {
            id,
            path: path.to_string(),
            package,
            line_count,
            classes: Vec::new(),
        });
        id
    }

    /// Get or create the package `name`; an in-project origin wins over external.
    pub(crate) fn ensure_package(&mut self, name: &str, origin: Origin) -> PackageId {
        if let Some(id) = self.package_by_name(name) {
            if origin == Origin::InProject {
                self.packages[id.index()].origin = Origin::InProject;
            }
            return id;
        }
        let id = PackageId::new(self.packages.len() as u32);
        self.packages.push(Package {
            id,
            name: name.to_string(),
            origin,
            classes: Vec::new(),
        });
        self.package_by_name.insert(name.to_string(), id);
        id
    }

    /// Append a class whose `id` was taken from [`Program::next_class_id`].
    pub(crate) fn push_class(&mut self, class: Class) -> ClassId {
        let id = class.id;
        debug_assert_eq!(id.index(), self.classes.len());
        if let Some(package) = self.packages.get_mut(class.package.index()) {
            package.classes.push(id);
        }
        if let Some(enclosing) = class.enclosing {
            if let Some(outer) = self.classes.get_mut(enclosing.index()) {
                outer.inner_classes.push(id);
            }
        } else if let Some(file) = class.file {
            if let Some(file) = self.files.get_mut(file.index()) {
                file.classes.push(id);
            }
        }
        if class.kind == ClassKind::Unknown {
            self.unknown_class = Some(id);
        }
        self.class_by_name.insert(class.qualified_name.clone(), id);
        self.classes.push(class);
        id
    }

    /// Append a method and list it on its class, or among the class's
    /// adopted methods when the class is sealed.
    pub(crate) fn push_method(&mut self, method: Method) -> MethodId {
        let id = method.id;
        debug_assert_eq!(id.index(), self.methods.len());
        if !self.attach_member(method.declaring, |class| class.methods.push(id)) {
            self.adopted_methods
                .entry(method.declaring)
                .or_default()
                .push(id);
        }
        self.method_index
            .insert((method.declaring, method.signature.clone()), id);
        self.methods.push(method);
        id
    }

    /// Append a field, listed like [`Program::push_method`] lists methods.
    pub(crate) fn push_field(&mut self, field: Field) -> FieldId {
        let id = field.id;
        debug_assert_eq!(id.index(), self.fields.len());
        if !self.attach_member(field.declaring, |class| class.fields.push(id)) {
            self.adopted_fields
                .entry(field.declaring)
                .or_default()
                .push(id);
        }
        self.field_index
            .insert((field.declaring, field.name.clone()), id);
        self.fields.push(field);
        id
    }

    /// Sealed in-project classes accept no new members; returns `false`
    /// when the member was refused for that reason.
    fn attach_member(&mut self, class: ClassId, attach: impl FnOnce(&mut Class)) -> bool {
        match self.classes.get_mut(class.index()) {
            Some(class) if class.sealed && class.is_in_project() => false,
            Some(class) => {
                attach(class);
                true
            }
            None => true,
        }
    }

    pub(crate) fn push_local(
        &mut self,
        method: MethodId,
        key: &str,
        name: &str,
        type_name: &str,
        is_parameter: bool,
    ) -> LocalId {
        let id = LocalId::new(self.locals.len() as u32);
        self.locals.push(Local {
            id,
            name: name.to_string(),
            method,
            type_name: type_name.to_string(),
            type_ref: None,
            is_parameter,
        });
        if let Some(owner) = self.methods.get_mut(method.index()) {
            owner.locals.push(id);
        }
        self.local_index.insert((method, key.to_string()), id);
        id
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.get_mut(id.index())
    }

    pub(crate) fn method_mut(&mut self, id: MethodId) -> Option<&mut Method> {
        self.methods.get_mut(id.index())
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.fields.get_mut(id.index())
    }

    pub(crate) fn local_mut(&mut self, id: LocalId) -> Option<&mut Local> {
        self.locals.get_mut(id.index())
    }

    /// Record arena sizes so a failed file can be undone.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            files: self.files.len(),
            packages: self.packages.len(),
            classes: self.classes.len(),
            methods: self.methods.len(),
            fields: self.fields.len(),
            locals: self.locals.len(),
            package_classes: self.packages.iter().map(|p| p.classes.len()).collect(),
        }
    }

    /// Drop everything created after `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.files.truncate(checkpoint.files);
        self.packages.truncate(checkpoint.packages);
        self.classes.truncate(checkpoint.classes);
        self.methods.truncate(checkpoint.methods);
        self.fields.truncate(checkpoint.fields);
        self.locals.truncate(checkpoint.locals);

        for (package, len) in self.packages.iter_mut().zip(&checkpoint.package_classes) {
            package.classes.truncate(*len);
        }
        let class_bound = checkpoint.classes;
        let method_bound = checkpoint.methods;
        let field_bound = checkpoint.fields;
        let local_bound = checkpoint.locals;
        for class in &mut self.classes {
            class.inner_classes.retain(|c| c.index() < class_bound);
            class.methods.retain(|m| m.index() < method_bound);
            class.fields.retain(|f| f.index() < field_bound);
        }
        for method in &mut self.methods {
            method.locals.retain(|l| l.index() < local_bound);
        }

        self.package_by_name
            .retain(|_, id| id.index() < checkpoint.packages);
        self.class_by_name.retain(|_, id| id.index() < class_bound);
        self.method_index.retain(|_, id| id.index() < method_bound);
        self.field_index.retain(|_, id| id.index() < field_bound);
        self.local_index.retain(|_, id| id.index() < local_bound);
        for methods in self.adopted_methods.values_mut() {
            methods.retain(|m| m.index() < method_bound);
        }
        for fields in self.adopted_fields.values_mut() {
            fields.retain(|f| f.index() < field_bound);
        }
        if self.unknown_class.is_some_and(|id| id.index() >= class_bound) {
            self.unknown_class = None;
        }
    }

    /// Adopt the external entities interned during the reference phase.
    ///
    /// External classes get a package derived from their qualified name,
    /// created on demand and flagged external unless analyzed code lives there.
    pub(crate) fn adopt_externals(&mut self, drained: DrainedExternals) {
        for external in drained.classes {
            let package_name = if external.kind == ClassKind::Unknown {
                String::new()
            } else {
                package_of(&external.qualified_name).to_string()
            };
            let package = self.ensure_package(&package_name, Origin::External);
            let name = simple_name(&external.qualified_name).to_string();
            self.push_class(Class {
                id: external.id,
                name,
                qualified_name: external.qualified_name,
                kind: external.kind,
                origin: Origin::External,
                file: None,
                package,
                enclosing: None,
                fields: Vec::new(),
                methods: Vec::new(),
                inner_classes: Vec::new(),
                superclass: None,
                interfaces: Vec::new(),
                type_uses: Default::default(),
                type_use_status: ResolutionStatus::complete(),
                sealed: true,
            });
        }
        for external in drained.methods {
            self.push_method(external.into_method());
        }
        for external in drained.fields {
            self.push_field(external.into_field());
        }
    }
}

/// Package part of an external qualified name (`""` when unqualified).
///
/// Type bindings carry no package, so it ends before the first capitalized
/// segment: `java.util.Map.Entry` lives in `java.util`. Names without such a
/// segment split at the last dot. This misplaces types whose enclosing class
/// is not capitalized, which the naming conventions of the analyzed
/// languages rule out in practice.
pub(crate) fn package_of(qualified_name: &str) -> &str {
    let mut offset: usize = 0;
    for segment in qualified_name.split('.') {
        if segment.starts_with(|c: char| c.is_ascii_uppercase()) {
            return &qualified_name[..offset.saturating_sub(1)];
        }
        offset += segment.len() + 1;
    }
    qualified_name
        .rsplit_once('.')
        .map(|(package, _)| package)
        .unwrap_or("")
}

/// Last segment of a qualified name.
pub(crate) fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('.')
        .map(|(_, name)| name)
        .unwrap_or(qualified_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(program: &Program, name: &str, package: PackageId) -> Class {
        Class {
            id: program.next_class_id(),
            name: simple_name(name).to_string(),
            qualified_name: name.to_string(),
            kind: ClassKind::Class,
            origin: Origin::InProject,
            file: None,
            package,
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            type_uses: Default::default(),
            type_use_status: ResolutionStatus::complete(),
            sealed: false,
        }
    }

    #[test]
    fn name_helpers() {
        assert_eq!(package_of("java.util.List"), "java.util");
        assert_eq!(package_of("Main"), "");
        assert_eq!(package_of("java.util.Map.Entry"), "java.util");
        assert_eq!(package_of("org.acme.widget"), "org.acme");
        assert_eq!(simple_name("java.util.List"), "List");
        assert_eq!(simple_name("Main"), "Main");
    }

    #[test]
    fn rollback_discards_new_entities_and_indexes() {
        let mut program = Program::new("demo");
        let p = program.ensure_package("p", Origin::InProject);
        let a = class(&program, "p.A", p);
        program.push_class(a);

        let checkpoint = program.checkpoint();
        let q = program.ensure_package("q", Origin::InProject);
        let b = class(&program, "q.B", q);
        program.push_class(b);
        let c = class(&program, "p.C", p);
        program.push_class(c);
        assert_eq!(program.class_count(), 3);

        program.rollback(&checkpoint);
        assert_eq!(program.class_count(), 1);
        assert!(program.class_by_name("q.B").is_none());
        assert!(program.class_by_name("p.C").is_none());
        assert!(program.package_by_name("q").is_none());
        let p = program.package(p).unwrap();
        assert_eq!(p.classes.len(), 1);
    }

    #[test]
    fn sealed_class_keeps_external_members_aside() {
        let mut program = Program::new("demo");
        let p = program.ensure_package("p", Origin::InProject);
        let mut a = class(&program, "p.A", p);
        a.sealed = true;
        let a = program.push_class(a);

        let cache = crate::intern::IdentityCache::for_program(&program);
        let ctor = cache.intern_method(a, "A()", None, None);
        let inherited = cache.intern_field(a, "size", None, "int");
        let entry = cache.intern_class("java.util.Map.Entry");
        program.adopt_externals(cache.drain());

        let entry = program.class(entry).unwrap();
        assert_eq!(entry.name, "Entry");
        assert_eq!(program.package(entry.package).unwrap().name, "java.util");

        let class = program.class(a).unwrap();
        assert!(class.methods.is_empty());
        assert!(class.fields.is_empty());
        assert_eq!(program.adopted_methods(a), &[ctor]);
        assert_eq!(program.adopted_fields(a), &[inherited]);
        assert_eq!(program.method_in(a, "A()"), Some(ctor));
        assert!(program.adopted_methods(ClassId::new(99)).is_empty());
    }

    #[test]
    fn resolve_key_inverts_key_of() {
        let mut program = Program::new("demo");
        let p = program.ensure_package("p", Origin::InProject);
        let a = class(&program, "p.A", p);
        let a = program.push_class(a);
        let key = program.key_of(EntityRef::Class(a)).unwrap();
        assert_eq!(program.resolve_key(&key), Some(EntityRef::Class(a)));
        assert_eq!(program.describe(EntityRef::Class(a)), "p.A");
        assert_eq!(
            program.population(EntityKind::Package),
            vec![EntityRef::Package(p)]
        );
    }
}

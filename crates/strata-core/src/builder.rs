//! Model construction: compilation units in, [`Program`] out.
//!
//! Construction runs in two phases.
//!
//! 1. **Declarations** (sequential, per file). A declaration visitor drives
//!    [`ModelBuilder`]: classes are registered on a construction stack so
//!    nested, anonymous and local classes attach to the right enclosing
//!    class; fields, methods, initializers and their locals are created.
//!    A structural violation rolls the program back to the state before the
//!    file and records a [`FileFailure`]; the run continues.
//! 2. **References** (parallelizable, per member). Every method, field and
//!    class becomes a job running the reference collectors against the
//!    read-only program. The identity cache is the only shared mutable
//!    state. Results are folded in after every job finished, then the
//!    interned externals are adopted.

use std::collections::HashMap;

use rayon::prelude::*;
use strata_ast::visitor::{walk_compilation_unit, VisitResult, Visitor};
use strata_ast::{
    CompilationUnit, FieldDecl, Initializer, MethodDecl, TypeBinding, TypeDecl, TypeKind, TypeRef,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collect::{
    AccessCollector, Collected, FieldInitializerCollector, InvocationCollector,
    LocalDeclarationCollector, LocalInfo, Resolver, StatsCollector, TypeUseCollector,
};
use crate::config::AnalysisConfig;
use crate::intern::IdentityCache;
use crate::model::{
    Checkpoint, Class, ClassId, ClassKind, Field, FieldId, FileId, LocalId, Method, MethodId,
    MethodKind, MethodStats, Origin, PackageId, Program, VariableRef,
};
use crate::resolution::ResolutionStatus;

// ============================================================================
// Errors and outcome
// ============================================================================

/// Structural invariant violations raised while declaring a file.
///
/// These indicate a front-end that handed over an inconsistent traversal,
/// not bad data; they are fatal for the offending file only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("member declared outside of any class")]
    NoEnclosingClass,

    #[error("class construction closed with an empty stack")]
    EmptyConstructionStack,

    #[error("class {name} is declared more than once")]
    DuplicateClass { name: String },

    #[error("{kind} {name} is declared more than once in {class}")]
    DuplicateMember {
        class: String,
        kind: &'static str,
        name: String,
    },

    #[error("declaration outside of a compilation unit")]
    NoOpenFile,

    #[error("{open} class declaration(s) left open at end of file")]
    UnclosedClasses { open: usize },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// A compilation unit that was skipped because of a structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub error: BuildError,
}

/// Result of [`build_program`]: the finished model plus skipped files.
#[derive(Debug)]
pub struct BuildOutcome {
    pub program: Program,
    pub failures: Vec<FileFailure>,
}

// ============================================================================
// ModelBuilder
// ============================================================================

/// Creates in-project entities while the declaration phase walks a file.
#[derive(Debug)]
pub struct ModelBuilder {
    program: Program,
    stack: Vec<ClassId>,
    file: Option<FileId>,
    package: Option<PackageId>,
    /// Anonymous and local class counters per enclosing class.
    anonymous: HashMap<ClassId, u32>,
}

impl ModelBuilder {
    pub fn new(project_name: impl Into<String>) -> Self {
        ModelBuilder {
            program: Program::new(project_name),
            stack: Vec::new(),
            file: None,
            package: None,
            anonymous: HashMap::new(),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Open a compilation unit; `None` is the default package.
    pub fn begin_file(&mut self, path: &str, package: Option<&str>, line_count: u32) -> FileId {
        let package = self
            .program
            .ensure_package(package.unwrap_or_default(), Origin::InProject);
        let file = self.program.add_file(path, package, line_count);
        self.file = Some(file);
        self.package = Some(package);
        file
    }

    /// Close the current compilation unit.
    pub fn end_file(&mut self) -> BuildResult<()> {
        if !self.stack.is_empty() {
            return Err(BuildError::UnclosedClasses {
                open: self.stack.len(),
            });
        }
        self.file = None;
        self.package = None;
        Ok(())
    }

    /// Create a fresh in-project class and push it on the construction stack.
    ///
    /// The qualified name comes from the binding when there is one;
    /// otherwise it is synthesized from the package and enclosing classes.
    pub fn register_in_project_class(&mut self, decl: &TypeDecl) -> BuildResult<ClassId> {
        let file = self.file.ok_or(BuildError::NoOpenFile)?;
        let package = self.package.ok_or(BuildError::NoOpenFile)?;
        let enclosing = self.stack.last().copied();
        let nested_in_body = matches!(decl.kind, TypeKind::Anonymous | TypeKind::Local);
        if nested_in_body && enclosing.is_none() {
            return Err(BuildError::NoEnclosingClass);
        }

        let qualified_name = match decl
            .binding
            .as_ref()
            .filter(|b| b.is_named_type() && !b.qualified_name.is_empty())
        {
            Some(binding) => binding.qualified_name.clone(),
            None => self.synthesize_name(decl, enclosing, package),
        };
        if self.program.class_by_name(&qualified_name).is_some() {
            return Err(BuildError::DuplicateClass {
                name: qualified_name,
            });
        }

        let id = self.program.next_class_id();
        self.program.push_class(Class {
            id,
            name: decl.name.clone(),
            qualified_name,
            kind: class_kind(decl.kind),
            origin: Origin::InProject,
            file: Some(file),
            package,
            enclosing,
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            type_uses: Default::default(),
            type_use_status: ResolutionStatus::complete(),
            sealed: false,
        });
        self.stack.push(id);
        Ok(id)
    }

    fn synthesize_name(
        &mut self,
        decl: &TypeDecl,
        enclosing: Option<ClassId>,
        package: PackageId,
    ) -> String {
        let Some(outer) = enclosing else {
            let package = self
                .program
                .package(package)
                .map(|p| p.name.as_str())
                .unwrap_or_default();
            return if package.is_empty() {
                decl.name.clone()
            } else {
                format!("{}.{}", package, decl.name)
            };
        };
        let outer_name = self
            .program
            .class(outer)
            .map(|c| c.qualified_name.clone())
            .unwrap_or_default();
        match decl.kind {
            TypeKind::Anonymous | TypeKind::Local => {
                let counter = self.anonymous.entry(outer).or_insert(0);
                *counter += 1;
                format!("{}${}{}", outer_name, counter, decl.name)
            }
            _ => format!("{}.{}", outer_name, decl.name),
        }
    }

    /// Pop the construction stack and seal the class.
    pub fn close_construction(&mut self) -> BuildResult<ClassId> {
        let id = self.stack.pop().ok_or(BuildError::EmptyConstructionStack)?;
        if let Some(class) = self.program.class_mut(id) {
            class.sealed = true;
        }
        Ok(id)
    }

    /// The class on top of the construction stack.
    pub fn current_class(&self) -> BuildResult<ClassId> {
        self.stack.last().copied().ok_or(BuildError::NoEnclosingClass)
    }

    pub fn declare_field(&mut self, decl: &FieldDecl) -> BuildResult<FieldId> {
        let class = self.current_class()?;
        if self.program.field_in(class, &decl.name).is_some() {
            return Err(self.duplicate(class, "field", &decl.name));
        }
        let id = self.program.next_field_id();
        Ok(self.program.push_field(Field {
            id,
            name: decl.name.clone(),
            origin: Origin::InProject,
            declaring: class,
            type_ref: None,
            type_name: type_name(&decl.ty),
            is_static: decl.is_static,
            accessed_fields: Default::default(),
            status: ResolutionStatus::complete(),
        }))
    }

    pub fn declare_method(
        &mut self,
        decl: &MethodDecl,
        stats: MethodStats,
    ) -> BuildResult<MethodId> {
        let class = self.current_class()?;
        let signature = decl
            .binding
            .as_ref()
            .map(|b| b.signature())
            .unwrap_or_else(|| synthesized_signature(decl));
        let (kind, return_type_name) = match decl.kind {
            strata_ast::MethodKind::Constructor => (MethodKind::Constructor, None),
            strata_ast::MethodKind::Method => (MethodKind::Method, Some(return_type_name(decl))),
        };
        self.push_callable(
            class,
            decl.name.clone(),
            signature,
            kind,
            decl.is_static,
            return_type_name,
            stats,
        )
    }

    /// Initializers are named `<init>#n` and `<clinit>#n`, numbered per class.
    pub fn declare_initializer(
        &mut self,
        init: &Initializer,
        stats: MethodStats,
    ) -> BuildResult<MethodId> {
        let class = self.current_class()?;
        let (kind, name) = if init.is_static {
            (MethodKind::StaticInitializer, "<clinit>")
        } else {
            (MethodKind::Initializer, "<init>")
        };
        let ordinal = self
            .program
            .class(class)
            .map(|c| {
                c.methods
                    .iter()
                    .filter_map(|m| self.program.method(*m))
                    .filter(|m| m.kind == kind)
                    .count()
            })
            .unwrap_or_default()
            + 1;
        let signature = format!("{}#{}", name, ordinal);
        self.push_callable(
            class,
            name.to_string(),
            signature,
            kind,
            init.is_static,
            None,
            stats,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_callable(
        &mut self,
        class: ClassId,
        name: String,
        signature: String,
        kind: MethodKind,
        is_static: bool,
        return_type_name: Option<String>,
        stats: MethodStats,
    ) -> BuildResult<MethodId> {
        if self.program.method_in(class, &signature).is_some() {
            return Err(self.duplicate(class, "method", &signature));
        }
        let id = self.program.next_method_id();
        Ok(self.program.push_method(Method {
            id,
            name,
            signature,
            kind,
            origin: Origin::InProject,
            declaring: class,
            is_static,
            return_type: None,
            return_type_name,
            locals: Vec::new(),
            invoked: Default::default(),
            accessed: Default::default(),
            invocation_status: ResolutionStatus::complete(),
            access_status: ResolutionStatus::complete(),
            stats,
        }))
    }

    pub fn declare_local(&mut self, method: MethodId, local: &LocalInfo) -> LocalId {
        self.program.push_local(
            method,
            &local.key,
            &local.name,
            &local.type_name,
            local.is_parameter,
        )
    }

    fn duplicate(&self, class: ClassId, kind: &'static str, name: &str) -> BuildError {
        BuildError::DuplicateMember {
            class: self
                .program
                .class(class)
                .map(|c| c.qualified_name.clone())
                .unwrap_or_else(|| class.to_string()),
            kind,
            name: name.to_string(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.program.checkpoint()
    }

    /// Undo everything declared since `checkpoint` and reset the file state.
    pub fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.program.rollback(checkpoint);
        self.stack.clear();
        self.file = None;
        self.package = None;
        let bound = self.program.class_count();
        self.anonymous.retain(|id, _| id.index() < bound);
    }

    pub fn into_program(self) -> Program {
        self.program
    }
}

fn class_kind(kind: TypeKind) -> ClassKind {
    match kind {
        TypeKind::Class => ClassKind::Class,
        TypeKind::Interface => ClassKind::Interface,
        TypeKind::Enum => ClassKind::Enum,
        TypeKind::Annotation => ClassKind::Annotation,
        TypeKind::Anonymous => ClassKind::Anonymous,
        TypeKind::Local => ClassKind::Local,
    }
}

fn type_name(ty: &TypeRef) -> String {
    ty.binding
        .as_ref()
        .map(|b| b.qualified_name.clone())
        .unwrap_or_else(|| ty.name.clone())
}

fn synthesized_signature(decl: &MethodDecl) -> String {
    let params: Vec<String> = decl.params.iter().map(|p| type_name(&p.ty)).collect();
    format!("{}({})", decl.name, params.join(","))
}

fn return_type_name(decl: &MethodDecl) -> String {
    match (&decl.return_type, &decl.binding) {
        (Some(ty), _) => type_name(ty),
        (None, Some(binding)) => binding.return_type.qualified_name.clone(),
        (None, None) => "void".to_string(),
    }
}

// ============================================================================
// Declaration phase
// ============================================================================

enum MethodSource<'ast> {
    Declared(&'ast MethodDecl),
    Initializer(&'ast Initializer),
}

/// Work for the reference phase, borrowing the declaration it came from.
enum MemberJob<'ast> {
    Method {
        id: MethodId,
        source: MethodSource<'ast>,
        locals: Vec<(LocalId, Option<TypeBinding>)>,
        local_status: ResolutionStatus,
    },
    Field {
        id: FieldId,
        decl: &'ast FieldDecl,
    },
    Class {
        id: ClassId,
        decl: &'ast TypeDecl,
    },
}

struct DeclarationVisitor<'ast, 'b> {
    builder: &'b mut ModelBuilder,
    jobs: &'b mut Vec<MemberJob<'ast>>,
    error: Option<BuildError>,
}

impl DeclarationVisitor<'_, '_> {
    fn fail(&mut self, error: BuildError) -> VisitResult {
        self.error.get_or_insert(error);
        VisitResult::Stop
    }

    fn declare_locals(
        &mut self,
        method: MethodId,
        collected: Collected<LocalInfo>,
    ) -> (Vec<(LocalId, Option<TypeBinding>)>, ResolutionStatus) {
        let locals = collected
            .targets
            .into_iter()
            .map(|info| (self.builder.declare_local(method, &info), info.type_binding))
            .collect();
        (locals, collected.status)
    }
}

impl<'ast> Visitor<'ast> for DeclarationVisitor<'ast, '_> {
    fn visit_type_decl(&mut self, node: &'ast TypeDecl) -> VisitResult {
        match self.builder.register_in_project_class(node) {
            Ok(id) => {
                self.jobs.push(MemberJob::Class { id, decl: node });
                VisitResult::Continue
            }
            Err(error) => self.fail(error),
        }
    }

    fn leave_type_decl(&mut self, _node: &'ast TypeDecl) {
        if let Err(error) = self.builder.close_construction() {
            self.error.get_or_insert(error);
        }
    }

    fn visit_field_decl(&mut self, node: &'ast FieldDecl) -> VisitResult {
        match self.builder.declare_field(node) {
            Ok(id) => {
                self.jobs.push(MemberJob::Field { id, decl: node });
                VisitResult::Continue
            }
            Err(error) => self.fail(error),
        }
    }

    fn visit_method_decl(&mut self, node: &'ast MethodDecl) -> VisitResult {
        let mut stats = StatsCollector::new();
        stats.collect_method(node);
        let id = match self.builder.declare_method(node, stats.result()) {
            Ok(id) => id,
            Err(error) => return self.fail(error),
        };
        let mut locals = LocalDeclarationCollector::new();
        locals.collect_method(node);
        let (locals, local_status) = self.declare_locals(id, locals.result());
        self.jobs.push(MemberJob::Method {
            id,
            source: MethodSource::Declared(node),
            locals,
            local_status,
        });
        // Continue so anonymous and local classes in the body get declared.
        VisitResult::Continue
    }

    fn visit_initializer(&mut self, node: &'ast Initializer) -> VisitResult {
        let mut stats = StatsCollector::new();
        stats.collect_initializer(node);
        let id = match self.builder.declare_initializer(node, stats.result()) {
            Ok(id) => id,
            Err(error) => return self.fail(error),
        };
        let mut locals = LocalDeclarationCollector::new();
        locals.collect_initializer(node);
        let (locals, local_status) = self.declare_locals(id, locals.result());
        self.jobs.push(MemberJob::Method {
            id,
            source: MethodSource::Initializer(node),
            locals,
            local_status,
        });
        VisitResult::Continue
    }
}

fn declare_unit<'ast>(
    builder: &mut ModelBuilder,
    unit: &'ast CompilationUnit,
    jobs: &mut Vec<MemberJob<'ast>>,
) -> BuildResult<()> {
    builder.begin_file(&unit.path, unit.package.as_deref(), unit.line_count);
    let mut visitor = DeclarationVisitor {
        builder,
        jobs,
        error: None,
    };
    walk_compilation_unit(&mut visitor, unit);
    if let Some(error) = visitor.error {
        return Err(error);
    }
    builder.end_file()
}

// ============================================================================
// Reference phase
// ============================================================================

enum JobOutput {
    Method {
        id: MethodId,
        invoked: Collected<MethodId>,
        accessed: Collected<VariableRef>,
        local_status: ResolutionStatus,
        return_type: Option<ClassId>,
        locals: Vec<(LocalId, Option<ClassId>)>,
    },
    Field {
        id: FieldId,
        type_ref: Option<ClassId>,
        accessed: Collected<FieldId>,
    },
    Class {
        id: ClassId,
        superclass: Option<ClassId>,
        interfaces: Vec<ClassId>,
        type_uses: Collected<ClassId>,
    },
}

fn run_job(resolver: &Resolver<'_>, job: &MemberJob<'_>, dependence_variables: bool) -> JobOutput {
    match job {
        MemberJob::Method {
            id,
            source,
            locals,
            local_status,
        } => {
            let mut invocations = InvocationCollector::new(resolver);
            let mut accesses = AccessCollector::new(resolver, *id, dependence_variables);
            let return_type = match source {
                MethodSource::Declared(decl) => {
                    invocations.collect_method(decl);
                    accesses.collect_method(decl);
                    declared_return_type(resolver, decl)
                }
                MethodSource::Initializer(init) => {
                    invocations.collect_initializer(init);
                    accesses.collect_initializer(init);
                    None
                }
            };
            let locals = locals
                .iter()
                .map(|(local, binding)| (*local, resolver.resolve_type(binding.as_ref()).class))
                .collect();
            JobOutput::Method {
                id: *id,
                invoked: invocations.result(),
                accessed: accesses.result(),
                local_status: *local_status,
                return_type,
                locals,
            }
        }
        MemberJob::Field { id, decl } => {
            let mut collector = FieldInitializerCollector::new(resolver);
            collector.collect(decl);
            JobOutput::Field {
                id: *id,
                type_ref: resolver.resolve_type(decl.ty.binding.as_ref()).class,
                accessed: collector.result(),
            }
        }
        MemberJob::Class { id, decl } => {
            let superclass = decl
                .superclass
                .as_ref()
                .and_then(|ty| resolver.resolve_type(ty.binding.as_ref()).class);
            let interfaces = decl
                .interfaces
                .iter()
                .filter_map(|ty| resolver.resolve_type(ty.binding.as_ref()).class)
                .collect();
            let mut collector = TypeUseCollector::new(resolver, *id);
            collector.collect(decl);
            JobOutput::Class {
                id: *id,
                superclass,
                interfaces,
                type_uses: collector.result(),
            }
        }
    }
}

fn declared_return_type(resolver: &Resolver<'_>, decl: &MethodDecl) -> Option<ClassId> {
    if decl.kind == strata_ast::MethodKind::Constructor {
        return None;
    }
    match (&decl.return_type, &decl.binding) {
        (Some(ty), _) => resolver.resolve_type(ty.binding.as_ref()).class,
        (None, Some(binding)) => resolver.resolve_type(Some(&binding.return_type)).class,
        (None, None) => None,
    }
}

fn run_jobs(
    resolver: &Resolver<'_>,
    jobs: &[MemberJob<'_>],
    config: &AnalysisConfig,
) -> Vec<JobOutput> {
    let dependence = config.dependence_variables;
    if !config.parallel {
        return jobs.iter().map(|job| run_job(resolver, job, dependence)).collect();
    }
    let run = || -> Vec<JobOutput> {
        jobs.par_iter()
            .map(|job| run_job(resolver, job, dependence))
            .collect()
    };
    match config.threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run),
            Err(err) => {
                warn!(threads, error = %err, "cannot build worker pool, using the global pool");
                run()
            }
        },
        None => run(),
    }
}

fn apply(program: &mut Program, output: JobOutput) {
    match output {
        JobOutput::Method {
            id,
            invoked,
            accessed,
            local_status,
            return_type,
            locals,
        } => {
            if let Some(method) = program.method_mut(id) {
                method.invoked = invoked.targets;
                method.invocation_status = invoked.status;
                method.accessed = accessed.targets;
                method.access_status = accessed.status.merge(local_status);
                method.return_type = return_type;
            }
            for (local, type_ref) in locals {
                if let Some(local) = program.local_mut(local) {
                    local.type_ref = type_ref;
                }
            }
        }
        JobOutput::Field {
            id,
            type_ref,
            accessed,
        } => {
            if let Some(field) = program.field_mut(id) {
                field.type_ref = type_ref;
                field.accessed_fields = accessed.targets;
                field.status = accessed.status;
            }
        }
        JobOutput::Class {
            id,
            superclass,
            interfaces,
            type_uses,
        } => {
            if let Some(class) = program.class_mut(id) {
                class.superclass = superclass;
                class.interfaces = interfaces;
                class.type_uses = type_uses.targets;
                class.type_use_status = type_uses.status;
            }
        }
    }
}

/// Build the program model for a set of compilation units.
///
/// Never fails as a whole: files with structural violations are skipped
/// and reported in [`BuildOutcome::failures`].
pub fn build_program(units: &[CompilationUnit], config: &AnalysisConfig) -> BuildOutcome {
    let mut builder = ModelBuilder::new(config.project_name.clone());
    let mut jobs: Vec<MemberJob<'_>> = Vec::new();
    let mut failures = Vec::new();

    for unit in units {
        debug!(path = %unit.path, "declaring compilation unit");
        let checkpoint = builder.checkpoint();
        let mark = jobs.len();
        if let Err(error) = declare_unit(&mut builder, unit, &mut jobs) {
            warn!(path = %unit.path, %error, "skipping file: structural violation");
            builder.rollback(&checkpoint);
            jobs.truncate(mark);
            failures.push(FileFailure {
                path: unit.path.clone(),
                error,
            });
        }
    }

    let mut program = builder.into_program();
    let cache = IdentityCache::for_program(&program);
    debug!(
        jobs = jobs.len(),
        parallel = config.parallel,
        "running reference collectors"
    );
    let outputs = {
        let resolver = Resolver::new(&program, &cache);
        run_jobs(&resolver, &jobs, config)
    };
    for output in outputs {
        apply(&mut program, output);
    }
    let externals = cache.drain();
    let external_classes = externals.classes.len();
    program.adopt_externals(externals);

    info!(
        files = program.files().count(),
        classes = program.class_count(),
        methods = program.method_count(),
        fields = program.field_count(),
        external_classes,
        failures = failures.len(),
        "model built"
    );
    BuildOutcome { program, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::test_support::*;
    use strata_ast::{Block, Expr, Member, MethodBinding, Stmt, VariableBinding, VariableKind};

    fn qualified_names(program: &Program) -> Vec<String> {
        program
            .classes()
            .filter(|c| c.is_in_project())
            .map(|c| c.qualified_name.clone())
            .collect()
    }

    fn anonymous_runnable() -> Expr {
        Expr::New {
            ty: TypeRef::resolved("Runnable", TypeBinding::class("java.lang.Runnable")),
            args: vec![],
            binding: None,
            body: Some(Box::new(TypeDecl {
                name: String::new(),
                kind: TypeKind::Anonymous,
                binding: None,
                superclass: None,
                interfaces: vec![TypeRef::resolved(
                    "Runnable",
                    TypeBinding::class("java.lang.Runnable"),
                )],
                members: vec![],
            })),
        }
    }

    fn bare_type(name: &str, kind: TypeKind) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            kind,
            binding: None,
            superclass: None,
            interfaces: vec![],
            members: vec![],
        }
    }

    #[test]
    fn test_nested_anonymous_and_local_names() {
        let body = vec![
            Stmt::Expr {
                expr: anonymous_runnable(),
            },
            Stmt::LocalClass {
                decl: bare_type("Helper", TypeKind::Local),
            },
        ];
        let outer = class_decl(
            "p",
            "Outer",
            vec![
                Member::Type(bare_type("Inner", TypeKind::Class)),
                Member::Method(method("p.Outer", "run", vec![], body)),
            ],
        );
        let program = build(&[unit("p", vec![outer])]);
        assert_eq!(
            qualified_names(&program),
            vec!["p.Outer", "p.Outer.Inner", "p.Outer$1", "p.Outer$2Helper"]
        );

        let outer = program.class_by_name("p.Outer").unwrap();
        let anonymous = program.class_by_name("p.Outer$1").unwrap();
        let class = program.class(outer).unwrap();
        assert_eq!(class.inner_classes.len(), 3);
        assert!(class.sealed);
        assert_eq!(program.class(anonymous).unwrap().enclosing, Some(outer));
        assert_eq!(program.file(FileId::new(0)).unwrap().classes, vec![outer]);
        // `new Runnable() {..}` is a type use of the enclosing class.
        let runnable = program.class_by_name("java.lang.Runnable").unwrap();
        assert!(class.type_uses.contains(&runnable));
    }

    #[test]
    fn test_duplicate_class_skips_only_that_file() {
        let units = vec![
            unit("p", vec![class_decl("p", "A", vec![])]),
            unit("p", vec![class_decl("p", "B", vec![]), class_decl("p", "A", vec![])]),
            unit("q", vec![class_decl("q", "C", vec![])]),
        ];
        let outcome = build_program(&units, &AnalysisConfig::default());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(
            outcome.failures[0].error,
            BuildError::DuplicateClass {
                name: "p.A".to_string()
            }
        );
        assert_eq!(qualified_names(&outcome.program), vec!["p.A", "q.C"]);
        assert_eq!(outcome.program.files().count(), 2);
    }

    #[test]
    fn test_duplicate_method_signature_fails_file() {
        let decl = class_decl(
            "p",
            "A",
            vec![
                Member::Method(method("p.A", "run", vec![], vec![])),
                Member::Method(method("p.A", "run", vec![], vec![])),
            ],
        );
        let outcome = build_program(&[unit("p", vec![decl])], &AnalysisConfig::default());
        assert!(matches!(
            outcome.failures[0].error,
            BuildError::DuplicateMember { kind: "method", .. }
        ));
        assert_eq!(outcome.program.class_count(), 0);
    }

    #[test]
    fn test_externals_are_adopted_with_packages() {
        let size = MethodBinding {
            declaring_class: "java.util.List".to_string(),
            name: "size".to_string(),
            parameter_types: vec![],
            return_type: TypeBinding::primitive("int"),
            is_constructor: false,
        };
        let body = vec![call(Some(size.clone())), call(Some(size)), call(None)];
        let decl = class_decl("p", "A", vec![Member::Method(method("p.A", "run", vec![], body))]);
        let program = build(&[unit("p", vec![decl])]);

        let list = program.class_by_name("java.util.List").unwrap();
        let list_class = program.class(list).unwrap();
        assert!(!list_class.is_in_project());
        let package = program.package(list_class.package).unwrap();
        assert_eq!(package.name, "java.util");
        assert!(!package.is_in_project());

        let size = program.method_in(list, "size()").unwrap();
        assert_eq!(list_class.methods, vec![size]);
        let run = program
            .method_in(program.class_by_name("p.A").unwrap(), "run()")
            .unwrap();
        let run = program.method(run).unwrap();
        assert_eq!(run.invoked.iter().copied().collect::<Vec<_>>(), vec![size]);
        assert!(!run.invocation_status.complete);
    }

    #[test]
    fn test_initializers_and_locals() {
        let init = Initializer {
            is_static: true,
            body: Block::new(vec![Stmt::Local(strata_ast::LocalDecl {
                name: "tmp".to_string(),
                ty: TypeRef::resolved("String", TypeBinding::class("java.lang.String")),
                binding: Some(VariableBinding::local("tmp", VariableKind::Local)),
                initializer: None,
            })]),
        };
        let decl = class_decl(
            "p",
            "A",
            vec![
                Member::Initializer(init.clone()),
                Member::Initializer(init),
                Member::Method(method("p.A", "add", vec![int_param("n")], vec![])),
            ],
        );
        let program = build(&[unit("p", vec![decl])]);
        let class = program.class_by_name("p.A").unwrap();
        let second = program.method_in(class, "<clinit>#2").unwrap();
        let second = program.method(second).unwrap();
        assert_eq!(second.kind, MethodKind::StaticInitializer);
        let tmp = program.local(second.locals[0]).unwrap();
        let string = program.class_by_name("java.lang.String").unwrap();
        assert_eq!(tmp.type_ref, Some(string));

        let add = program.method_in(class, "add(int)").unwrap();
        let add = program.method(add).unwrap();
        assert_eq!(add.stats.parameters, 1);
        let n = program.local(add.locals[0]).unwrap();
        assert!(n.is_parameter);
        assert_eq!(n.type_ref, None);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let units: Vec<_> = (0..8)
            .map(|i| {
                let target = format!("p.C{}", (i + 1) % 8);
                let body = vec![call(Some(method_binding(&target, "run", &[])))];
                let name = format!("C{}", i);
                let class = format!("p.{}", name);
                unit(
                    "p",
                    vec![class_decl(
                        "p",
                        &name,
                        vec![Member::Method(method(&class, "run", vec![], body))],
                    )],
                )
            })
            .collect();
        let sequential = build(&units);
        let config = AnalysisConfig {
            parallel: true,
            threads: Some(2),
            ..AnalysisConfig::default()
        };
        let parallel = build_program(&units, &config).program;

        for method in sequential.methods() {
            let other = parallel.method(method.id).unwrap();
            assert_eq!(method.signature, other.signature);
            assert_eq!(method.invoked, other.invoked);
        }
    }

    #[test]
    fn test_builder_structural_errors() {
        let mut builder = ModelBuilder::new("demo");
        let field = FieldDecl {
            name: "x".to_string(),
            ty: TypeRef::unresolved("X"),
            binding: None,
            is_static: false,
            initializer: None,
        };
        assert_eq!(
            builder.register_in_project_class(&bare_type("A", TypeKind::Class)),
            Err(BuildError::NoOpenFile)
        );
        builder.begin_file("A.java", None, 3);
        assert_eq!(builder.declare_field(&field), Err(BuildError::NoEnclosingClass));
        assert_eq!(builder.close_construction(), Err(BuildError::EmptyConstructionStack));
        assert_eq!(
            builder.register_in_project_class(&bare_type("", TypeKind::Anonymous)),
            Err(BuildError::NoEnclosingClass)
        );

        let id = builder
            .register_in_project_class(&bare_type("A", TypeKind::Class))
            .unwrap();
        assert_eq!(builder.program().class(id).unwrap().qualified_name, "A");
        assert_eq!(builder.end_file(), Err(BuildError::UnclosedClasses { open: 1 }));
        assert_eq!(builder.close_construction(), Ok(id));
        assert_eq!(builder.end_file(), Ok(()));
    }
}

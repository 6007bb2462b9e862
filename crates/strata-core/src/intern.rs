//! Identity cache for externally declared classes, methods and fields.
//!
//! The cache guarantees at most one external class per qualified name, one
//! external method per `(declaring class, signature)` and one external field
//! per `(declaring class, name)`. Ids are handed out past the end of the
//! in-project arenas, so once the reference phase finishes the drained
//! entities append to the [`Program`] without renumbering.
//!
//! The cache is the only state shared between reference-phase workers. All
//! operations take one short critical section under a `Mutex`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::model::{
    ClassId, ClassKind, Field, FieldId, Method, MethodId, MethodKind, MethodStats, Origin,
    Program, UNKNOWN_CLASS_NAME,
};
use crate::resolution::ResolutionStatus;

/// An external class created by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalClass {
    pub id: ClassId,
    pub qualified_name: String,
    pub kind: ClassKind,
}

/// An external method created by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalMethod {
    pub id: MethodId,
    pub declaring: ClassId,
    pub signature: String,
    pub return_type: Option<ClassId>,
    /// `None` for constructors; `void` methods carry `Some("void")`.
    pub return_type_name: Option<String>,
}

impl ExternalMethod {
    pub(crate) fn into_method(self) -> Method {
        let name = self
            .signature
            .split_once('(')
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| self.signature.clone());
        let kind = if self.return_type_name.is_none() {
            MethodKind::Constructor
        } else {
            MethodKind::Method
        };
        Method {
            id: self.id,
            name,
            signature: self.signature,
            kind,
            origin: Origin::External,
            declaring: self.declaring,
            is_static: false,
            return_type: self.return_type,
            return_type_name: self.return_type_name,
            locals: Vec::new(),
            invoked: BTreeSet::new(),
            accessed: BTreeSet::new(),
            invocation_status: ResolutionStatus::complete(),
            access_status: ResolutionStatus::complete(),
            stats: MethodStats::default(),
        }
    }
}

/// An external field created by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalField {
    pub id: FieldId,
    pub declaring: ClassId,
    pub name: String,
    pub type_ref: Option<ClassId>,
    pub type_name: String,
}

impl ExternalField {
    pub(crate) fn into_field(self) -> Field {
        Field {
            id: self.id,
            name: self.name,
            origin: Origin::External,
            declaring: self.declaring,
            type_ref: self.type_ref,
            type_name: self.type_name,
            is_static: false,
            accessed_fields: BTreeSet::new(),
            status: ResolutionStatus::complete(),
        }
    }
}

/// Everything a cache created, each list in id order.
#[derive(Debug, Clone, Default)]
pub struct DrainedExternals {
    pub classes: Vec<ExternalClass>,
    pub methods: Vec<ExternalMethod>,
    pub fields: Vec<ExternalField>,
}

impl DrainedExternals {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.methods.is_empty() && self.fields.is_empty()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    next_class: u32,
    next_method: u32,
    next_field: u32,
    classes: HashMap<String, ClassId>,
    methods: HashMap<(ClassId, String), MethodId>,
    fields: HashMap<(ClassId, String), FieldId>,
    created: DrainedExternals,
}

/// Run-scoped interning cache for external declarations.
#[derive(Debug)]
pub struct IdentityCache {
    state: Mutex<CacheState>,
}

impl IdentityCache {
    /// Create a cache whose ids start after the program's current arenas.
    pub fn for_program(program: &Program) -> Self {
        IdentityCache::with_bases(
            program.class_count() as u32,
            program.method_count() as u32,
            program.field_count() as u32,
        )
    }

    /// Create a cache with explicit id bases.
    pub fn with_bases(class_base: u32, method_base: u32, field_base: u32) -> Self {
        IdentityCache {
            state: Mutex::new(CacheState {
                next_class: class_base,
                next_method: method_base,
                next_field: field_base,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Each insert is a single statement, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Canonical external class for `qualified_name`.
    pub fn intern_class(&self, qualified_name: &str) -> ClassId {
        self.intern_class_of_kind(qualified_name, ClassKind::Class)
    }

    /// The synthetic placeholder for array, type-variable and unresolved types.
    pub fn unknown_class(&self) -> ClassId {
        self.intern_class_of_kind(UNKNOWN_CLASS_NAME, ClassKind::Unknown)
    }

    fn intern_class_of_kind(&self, qualified_name: &str, kind: ClassKind) -> ClassId {
        let mut state = self.lock();
        if let Some(id) = state.classes.get(qualified_name) {
            return *id;
        }
        let id = ClassId::new(state.next_class);
        state.next_class += 1;
        state.classes.insert(qualified_name.to_string(), id);
        state.created.classes.push(ExternalClass {
            id,
            qualified_name: qualified_name.to_string(),
            kind,
        });
        trace!(class = %qualified_name, %id, "interned external class");
        id
    }

    /// Canonical external field `name` of `declaring`.
    ///
    /// The type is recorded by the first call; later calls with the same key
    /// return the existing field unchanged.
    pub fn intern_field(
        &self,
        declaring: ClassId,
        name: &str,
        type_ref: Option<ClassId>,
        type_name: &str,
    ) -> FieldId {
        let mut state = self.lock();
        let key = (declaring, name.to_string());
        if let Some(id) = state.fields.get(&key) {
            return *id;
        }
        let id = FieldId::new(state.next_field);
        state.next_field += 1;
        state.fields.insert(key, id);
        state.created.fields.push(ExternalField {
            id,
            declaring,
            name: name.to_string(),
            type_ref,
            type_name: type_name.to_string(),
        });
        trace!(%declaring, field = %name, %id, "interned external field");
        id
    }

    /// Canonical external method `signature` of `declaring`.
    pub fn intern_method(
        &self,
        declaring: ClassId,
        signature: &str,
        return_type: Option<ClassId>,
        return_type_name: Option<&str>,
    ) -> MethodId {
        let mut state = self.lock();
        let key = (declaring, signature.to_string());
        if let Some(id) = state.methods.get(&key) {
            return *id;
        }
        let id = MethodId::new(state.next_method);
        state.next_method += 1;
        state.methods.insert(key, id);
        state.created.methods.push(ExternalMethod {
            id,
            declaring,
            signature: signature.to_string(),
            return_type,
            return_type_name: return_type_name.map(str::to_string),
        });
        trace!(%declaring, method = %signature, %id, "interned external method");
        id
    }

    /// Number of external classes interned so far.
    pub fn class_count(&self) -> usize {
        self.lock().classes.len()
    }

    /// Hand over the created entities, leaving the cache empty of new work.
    ///
    /// The lookup maps are kept, so interning after a drain still returns
    /// the ids already handed out.
    pub fn drain(&self) -> DrainedExternals {
        std::mem::take(&mut self.lock().created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn intern_class_is_idempotent() {
        let cache = IdentityCache::with_bases(0, 0, 0);
        let first = cache.intern_class("java.util.List");
        let second = cache.intern_class("java.util.List");
        let other = cache.intern_class("java.util.Map");
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(cache.class_count(), 2);
    }

    #[test]
    fn ids_start_at_bases() {
        let cache = IdentityCache::with_bases(5, 7, 9);
        let class = cache.intern_class("x.Y");
        assert_eq!(class, ClassId::new(5));
        assert_eq!(
            cache.intern_method(class, "f()", None, Some("void")),
            MethodId::new(7)
        );
        assert_eq!(cache.intern_field(class, "g", None, "int"), FieldId::new(9));
    }

    #[test]
    fn members_are_keyed_by_declaring_class() {
        let cache = IdentityCache::with_bases(0, 0, 0);
        let a = cache.intern_class("x.A");
        let b = cache.intern_class("x.B");
        let fa = cache.intern_field(a, "size", None, "int");
        let fb = cache.intern_field(b, "size", None, "int");
        assert_ne!(fa, fb);
        assert_eq!(cache.intern_field(a, "size", None, "long"), fa);

        let ma = cache.intern_method(a, "get(int)", None, Some("java.lang.Object"));
        assert_eq!(cache.intern_method(a, "get(int)", None, Some("void")), ma);
        assert_ne!(cache.intern_method(a, "get(long)", None, Some("void")), ma);
    }

    #[test]
    fn unknown_class_is_a_single_placeholder() {
        let cache = IdentityCache::with_bases(0, 0, 0);
        let first = cache.unknown_class();
        assert_eq!(cache.unknown_class(), first);
        let drained = cache.drain();
        assert_eq!(drained.classes.len(), 1);
        assert_eq!(drained.classes[0].kind, ClassKind::Unknown);
        assert_eq!(drained.classes[0].qualified_name, UNKNOWN_CLASS_NAME);
    }

    #[test]
    fn drain_yields_in_id_order_and_keeps_identity() {
        let cache = IdentityCache::with_bases(0, 0, 0);
        let a = cache.intern_class("x.A");
        let b = cache.intern_class("x.B");
        let drained = cache.drain();
        let ids: Vec<_> = drained.classes.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(cache.drain().is_empty());
        assert_eq!(cache.intern_class("x.A"), a);
    }

    #[test]
    fn concurrent_interning_yields_one_id_per_name() {
        let cache = Arc::new(IdentityCache::with_bases(0, 0, 0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| cache.intern_class(&format!("x.C{}", i % 10)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<Vec<ClassId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for ids in &results[1..] {
            assert_eq!(ids, &results[0]);
        }
        assert_eq!(cache.drain().classes.len(), 10);
    }

    #[test]
    fn external_method_without_return_type_is_constructor() {
        let ctor = ExternalMethod {
            id: MethodId::new(0),
            declaring: ClassId::new(0),
            signature: "ArrayList(int)".to_string(),
            return_type: None,
            return_type_name: None,
        }
        .into_method();
        assert_eq!(ctor.kind, MethodKind::Constructor);
        assert_eq!(ctor.name, "ArrayList");
        assert_eq!(ctor.origin, Origin::External);
    }
}

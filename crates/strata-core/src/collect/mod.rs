//! Reference collectors.
//!
//! Each collector walks one declaration (a method body, a field initializer,
//! or a class with its members) and reports a set of targets together with a
//! [`ResolutionStatus`]. Collectors only read the [`Program`]; external
//! declarations are canonicalized through the [`IdentityCache`] via the
//! shared [`Resolver`]. Results are attached to the owning entity by the
//! builder after the walk.
//!
//! Every collector stops at nested type declarations (anonymous and local
//! classes): those are separate classes with their own collector runs.
//!
//! - [`InvocationCollector`]: methods called from a body
//! - [`AccessCollector`]: fields, parameters and locals read or written
//! - [`FieldInitializerCollector`]: fields accessed by a field initializer
//! - [`TypeUseCollector`]: classes mentioned by a class
//! - [`LocalDeclarationCollector`]: parameters and locals a method declares
//! - [`StatsCollector`]: statement, decision-point and parameter counts

mod access;
mod field_init;
mod invocation;
mod locals;
mod stats;
mod type_use;

pub use access::AccessCollector;
pub use field_init::FieldInitializerCollector;
pub use invocation::InvocationCollector;
pub use locals::{LocalDeclarationCollector, LocalInfo};
pub use stats::StatsCollector;
pub use type_use::TypeUseCollector;

use std::collections::BTreeSet;

use strata_ast::{MethodBinding, TypeBinding, TypeBindingKind, VariableBinding};

use crate::intern::IdentityCache;
use crate::model::{ClassId, FieldId, LocalId, MethodId, Program};
use crate::resolution::ResolutionStatus;

/// Targets found by one collector run plus its completeness flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected<T: Ord> {
    pub targets: BTreeSet<T>,
    pub status: ResolutionStatus,
}

impl<T: Ord> Default for Collected<T> {
    fn default() -> Self {
        Collected {
            targets: BTreeSet::new(),
            status: ResolutionStatus::complete(),
        }
    }
}

impl<T: Ord> Collected<T> {
    pub(crate) fn insert(&mut self, target: T) {
        self.targets.insert(target);
    }

    pub(crate) fn unresolved(&mut self) {
        self.status.record_unresolved();
    }

    /// Whether every binding the collector met resolved.
    pub fn is_complete(&self) -> bool {
        self.status.complete
    }
}

/// Outcome of resolving a type mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeResolution {
    /// Referenced class; `None` for primitives.
    pub class: Option<ClassId>,
    pub complete: bool,
}

/// Maps front-end bindings to entity handles.
///
/// In-project declarations are looked up in the program; everything else is
/// interned. Never fails: unresolvable types map to the unknown placeholder.
pub struct Resolver<'p> {
    program: &'p Program,
    cache: &'p IdentityCache,
}

impl<'p> Resolver<'p> {
    pub fn new(program: &'p Program, cache: &'p IdentityCache) -> Self {
        Resolver { program, cache }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// In-project class `qualified_name`, or its interned external placeholder.
    pub fn class_named(&self, qualified_name: &str) -> ClassId {
        self.program
            .class_by_name(qualified_name)
            .unwrap_or_else(|| self.cache.intern_class(qualified_name))
    }

    /// The unknown placeholder, reusing one a previous run already adopted.
    fn unknown(&self) -> ClassId {
        self.program
            .unknown_class()
            .unwrap_or_else(|| self.cache.unknown_class())
    }

    /// Resolve a type binding.
    ///
    /// Primitives yield no reference. Arrays and type variables yield the
    /// unknown placeholder and still count as resolved. A missing binding
    /// yields the placeholder and counts as unresolved.
    pub fn resolve_type(&self, binding: Option<&TypeBinding>) -> TypeResolution {
        let Some(binding) = binding else {
            return TypeResolution {
                class: Some(self.unknown()),
                complete: false,
            };
        };
        let class = match binding.kind {
            TypeBindingKind::Primitive => None,
            TypeBindingKind::Array | TypeBindingKind::TypeVariable => Some(self.unknown()),
            TypeBindingKind::Class
            | TypeBindingKind::Interface
            | TypeBindingKind::Enum
            | TypeBindingKind::Annotation => Some(self.class_named(&binding.qualified_name)),
        };
        TypeResolution {
            class,
            complete: true,
        }
    }

    /// Resolve a method or constructor binding.
    ///
    /// Signatures not declared on an in-project class (implicit default
    /// constructors, inherited library methods) are interned as external
    /// methods of that class.
    pub fn resolve_method(&self, binding: &MethodBinding) -> MethodId {
        let declaring = self.class_named(&binding.declaring_class);
        let signature = binding.signature();
        if let Some(id) = self.program.method_in(declaring, &signature) {
            return id;
        }
        let (return_type, return_type_name) = if binding.is_constructor {
            (None, None)
        } else {
            (
                self.resolve_type(Some(&binding.return_type)).class,
                Some(binding.return_type.qualified_name.as_str()),
            )
        };
        self.cache
            .intern_method(declaring, &signature, return_type, return_type_name)
    }

    /// Resolve a field or enum-constant binding.
    ///
    /// Returns `None` for pseudo-fields without a declaring class, such as
    /// an array's `length`.
    pub fn resolve_field(&self, binding: &VariableBinding) -> Option<FieldId> {
        let declaring = self.class_named(binding.declaring_class.as_deref()?);
        if let Some(id) = self.program.field_in(declaring, &binding.name) {
            return Some(id);
        }
        let type_binding = binding.type_binding.as_ref();
        let type_ref = type_binding.and_then(|t| self.resolve_type(Some(t)).class);
        let type_name = type_binding
            .map(|t| t.qualified_name.as_str())
            .unwrap_or_default();
        Some(
            self.cache
                .intern_field(declaring, &binding.name, type_ref, type_name),
        )
    }

    /// Resolve a parameter or local binding within `method`.
    pub fn resolve_local(&self, method: MethodId, binding: &VariableBinding) -> Option<LocalId> {
        self.program.local_in(method, binding.local_key())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Small AST builders shared by the collector tests.

    use strata_ast::{
        Block, CompilationUnit, Expr, Member, MethodBinding, MethodDecl, MethodKind, Param, Stmt,
        TypeBinding, TypeDecl, TypeKind, TypeRef, VariableBinding, VariableKind,
    };

    use crate::builder::build_program;
    use crate::config::AnalysisConfig;
    use crate::model::Program;

    pub fn class_decl(package: &str, name: &str, members: Vec<Member>) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            kind: TypeKind::Class,
            binding: Some(TypeBinding::class(format!("{}.{}", package, name))),
            superclass: None,
            interfaces: vec![],
            members,
        }
    }

    pub fn unit(package: &str, types: Vec<TypeDecl>) -> CompilationUnit {
        let first = types.first().map(|t| t.name.clone()).unwrap_or_default();
        CompilationUnit {
            path: format!("{}/{}.java", package.replace('.', "/"), first),
            package: Some(package.to_string()),
            line_count: 10,
            types,
        }
    }

    pub fn build(units: &[CompilationUnit]) -> Program {
        let outcome = build_program(units, &AnalysisConfig::default());
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        outcome.program
    }

    pub fn void() -> TypeBinding {
        TypeBinding::primitive("void")
    }

    pub fn method_binding(class: &str, name: &str, params: &[TypeBinding]) -> MethodBinding {
        MethodBinding {
            declaring_class: class.to_string(),
            name: name.to_string(),
            parameter_types: params.to_vec(),
            return_type: void(),
            is_constructor: false,
        }
    }

    pub fn call(binding: Option<MethodBinding>) -> Stmt {
        let name = binding
            .as_ref()
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "missing".to_string());
        Stmt::Expr {
            expr: Expr::call(name, binding, vec![]),
        }
    }

    pub fn field_name(class: &str, name: &str) -> Expr {
        Expr::name(name, Some(VariableBinding::field(class, name)))
    }

    pub fn local_name(name: &str, kind: VariableKind) -> Expr {
        Expr::name(name, Some(VariableBinding::local(name, kind)))
    }

    pub fn int_param(name: &str) -> Param {
        Param {
            name: name.to_string(),
            ty: TypeRef::resolved("int", TypeBinding::primitive("int")),
            binding: Some(VariableBinding::local(name, VariableKind::Parameter)),
        }
    }

    pub fn method(class: &str, name: &str, params: Vec<Param>, body: Vec<Stmt>) -> MethodDecl {
        let types: Vec<TypeBinding> = params
            .iter()
            .filter_map(|p| p.ty.binding.clone())
            .collect();
        MethodDecl {
            name: name.to_string(),
            kind: MethodKind::Method,
            params,
            return_type: Some(TypeRef::resolved("void", void())),
            binding: Some(method_binding(class, name, &types)),
            body: Some(Block::new(body)),
            is_static: false,
        }
    }
}

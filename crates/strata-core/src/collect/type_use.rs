//! TypeUseCollector: named types mentioned by one class.
//!
//! Covers supertypes, field types, method signatures, local variable types,
//! casts, `instanceof`, `new`, class literals and static qualifiers. Nested
//! type declarations are separate classes and are skipped; the `new Foo`
//! of an anonymous class still counts for the enclosing class.

use strata_ast::visitor::{walk_type_decl, VisitResult, Visitor};
use strata_ast::{TypeDecl, TypeRef};

use super::{Collected, Resolver};
use crate::model::ClassId;

/// Collects the classes a class refers to, excluding itself.
pub struct TypeUseCollector<'r, 'p> {
    resolver: &'r Resolver<'p>,
    own: ClassId,
    entered: bool,
    collected: Collected<ClassId>,
}

impl<'r, 'p> TypeUseCollector<'r, 'p> {
    pub fn new(resolver: &'r Resolver<'p>, own: ClassId) -> Self {
        TypeUseCollector {
            resolver,
            own,
            entered: false,
            collected: Collected::default(),
        }
    }

    pub fn collect(&mut self, decl: &TypeDecl) {
        self.entered = false;
        walk_type_decl(self, decl);
    }

    pub fn result(self) -> Collected<ClassId> {
        self.collected
    }
}

impl<'ast> Visitor<'ast> for TypeUseCollector<'_, '_> {
    fn visit_type_decl(&mut self, _node: &'ast TypeDecl) -> VisitResult {
        if self.entered {
            return VisitResult::SkipChildren;
        }
        self.entered = true;
        VisitResult::Continue
    }

    fn visit_type_ref(&mut self, node: &'ast TypeRef) -> VisitResult {
        let resolution = self.resolver.resolve_type(node.binding.as_ref());
        if !resolution.complete {
            self.collected.unresolved();
        }
        if let Some(class) = resolution.class {
            if class != self.own {
                self.collected.insert(class);
            }
        }
        VisitResult::Continue
    }
}

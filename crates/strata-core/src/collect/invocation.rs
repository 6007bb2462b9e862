//! InvocationCollector: methods called from a method or initializer body.
//!
//! # What is Collected?
//!
//! - Ordinary calls: `foo()`, `obj.foo()`, `Type.foo()`
//! - Super calls: `super.foo()`
//! - Explicit constructor calls: `this(..)`, `super(..)`
//! - Instance creation: `new Foo(..)`, including `new Foo() { .. }`
//!
//! Calls inside anonymous or local class bodies belong to those classes and
//! are not collected. Calls without a binding clear the completeness flag;
//! the walk continues past them.

use strata_ast::visitor::{walk_block, VisitResult, Visitor};
use strata_ast::{Block, Expr, Initializer, MethodBinding, MethodDecl, TypeDecl};

use super::{Collected, Resolver};
use crate::model::MethodId;

/// Collects the methods invoked by one body.
pub struct InvocationCollector<'r, 'p> {
    resolver: &'r Resolver<'p>,
    collected: Collected<MethodId>,
}

impl<'r, 'p> InvocationCollector<'r, 'p> {
    pub fn new(resolver: &'r Resolver<'p>) -> Self {
        InvocationCollector {
            resolver,
            collected: Collected::default(),
        }
    }

    /// Walk a method body; abstract methods yield an empty, complete result.
    pub fn collect_method(&mut self, decl: &MethodDecl) {
        if let Some(body) = &decl.body {
            self.collect_block(body);
        }
    }

    pub fn collect_initializer(&mut self, init: &Initializer) {
        self.collect_block(&init.body);
    }

    pub fn collect_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    pub fn result(self) -> Collected<MethodId> {
        self.collected
    }

    fn record(&mut self, binding: Option<&MethodBinding>) {
        match binding {
            Some(binding) => {
                let target = self.resolver.resolve_method(binding);
                self.collected.insert(target);
            }
            None => self.collected.unresolved(),
        }
    }
}

impl<'ast> Visitor<'ast> for InvocationCollector<'_, '_> {
    fn visit_type_decl(&mut self, _node: &'ast TypeDecl) -> VisitResult {
        VisitResult::SkipChildren
    }

    fn visit_expr(&mut self, node: &'ast Expr) -> VisitResult {
        match node {
            Expr::Call { binding, .. }
            | Expr::ConstructorCall { binding, .. }
            | Expr::New { binding, .. } => self.record(binding.as_ref()),
            _ => {}
        }
        VisitResult::Continue
    }
}

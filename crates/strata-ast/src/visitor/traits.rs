// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Visitor trait definitions for AST traversal.

use crate::nodes::{
    Block, CatchClause, CompilationUnit, Expr, FieldDecl, Initializer, LocalDecl, MethodDecl,
    Param, Stmt, SwitchCase, TypeDecl, TypeRef,
};

/// Result of visiting a node - controls traversal behavior.
///
/// When a visitor method returns a `VisitResult`, it controls how the walker
/// proceeds with traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    /// Continue traversal into children.
    ///
    /// After visiting children, `leave_*` will be called for this node.
    #[default]
    Continue,

    /// Skip children, continue with siblings.
    ///
    /// The walker will not descend into this node's children, but `leave_*`
    /// will still be called for this node.
    SkipChildren,

    /// Stop traversal entirely.
    ///
    /// No further `visit_*` or `leave_*` methods will be called.
    Stop,
}

/// Macro to generate visitor trait method signatures.
///
/// This macro generates pairs of `visit_*` and `leave_*` methods with default
/// implementations that return `VisitResult::Continue` and do nothing, respectively.
/// Nodes are borrowed for the whole `'ast` lifetime so collectors may keep
/// references to the declarations they encounter.
macro_rules! visitor_methods {
    (
        $(
            $(#[$meta:meta])*
            $base_name:ident : $node_type:ty
        ),* $(,)?
    ) => {
        paste::paste! {
            $(
                $(#[$meta])*
                #[doc = concat!("Visit a [`", stringify!($node_type), "`] node.")]
                #[doc = ""]
                #[doc = "Called before descending into children. Return `VisitResult` to control traversal."]
                #[allow(unused_variables)]
                fn [<visit_ $base_name>](&mut self, node: &'ast $node_type) -> VisitResult {
                    VisitResult::Continue
                }

                $(#[$meta])*
                #[doc = concat!("Leave a [`", stringify!($node_type), "`] node.")]
                #[doc = ""]
                #[doc = "Called after all children have been visited. Called even if `SkipChildren` was returned."]
                #[allow(unused_variables)]
                fn [<leave_ $base_name>](&mut self, node: &'ast $node_type) {}
            )*
        }
    };
}

/// Immutable visitor for AST traversal.
///
/// # Traversal Order
///
/// - `visit_*` is called in **pre-order** (before children)
/// - `leave_*` is called in **post-order** (after children)
/// - Children are visited in source order
///
/// # Example
///
/// ```
/// use strata_ast::visitor::{VisitResult, Visitor};
/// use strata_ast::Expr;
///
/// struct CallCounter {
///     calls: usize,
/// }
///
/// impl<'ast> Visitor<'ast> for CallCounter {
///     fn visit_expr(&mut self, node: &'ast Expr) -> VisitResult {
///         if matches!(node, Expr::Call { .. }) {
///             self.calls += 1;
///         }
///         VisitResult::Continue
///     }
/// }
/// ```
pub trait Visitor<'ast> {
    visitor_methods! {
        compilation_unit: CompilationUnit,
        type_decl: TypeDecl,
        field_decl: FieldDecl,
        method_decl: MethodDecl,
        initializer: Initializer,
        param: Param,
        block: Block,
        stmt: Stmt,
        local_decl: LocalDecl,
        switch_case: SwitchCase,
        catch_clause: CatchClause,
        expr: Expr,
        type_ref: TypeRef,
    }
}

// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Walk functions for AST traversal.
//!
//! - **Pre-order**: `visit_*` is called before descending into children
//! - **Post-order**: `leave_*` is called after all children have been visited
//! - **Source order**: Children are visited in the order they appear in source
//!
//! # Control Flow
//!
//! - `VisitResult::Continue` - traverse into children
//! - `VisitResult::SkipChildren` - skip children but still call `leave_*`
//! - `VisitResult::Stop` - halt traversal immediately (no `leave_*` called)

use super::traits::{VisitResult, Visitor};
use crate::nodes::{
    Block, CatchClause, CompilationUnit, Expr, FieldDecl, Initializer, LocalDecl, Member,
    MethodDecl, Param, Stmt, SwitchCase, TypeDecl, TypeRef,
};

/// Propagate `Stop` out of the enclosing walk function.
macro_rules! descend {
    ($e:expr) => {
        if $e == VisitResult::Stop {
            return VisitResult::Stop;
        }
    };
}

/// Walk a [`CompilationUnit`].
pub fn walk_compilation_unit<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    node: &'ast CompilationUnit,
) -> VisitResult {
    match visitor.visit_compilation_unit(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            for decl in &node.types {
                descend!(walk_type_decl(visitor, decl));
            }
        }
    }
    visitor.leave_compilation_unit(node);
    VisitResult::Continue
}

/// Walk a [`TypeDecl`]: supertypes first, then members in order.
pub fn walk_type_decl<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast TypeDecl) -> VisitResult {
    match visitor.visit_type_decl(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            if let Some(superclass) = &node.superclass {
                descend!(walk_type_ref(visitor, superclass));
            }
            for iface in &node.interfaces {
                descend!(walk_type_ref(visitor, iface));
            }
            for member in &node.members {
                descend!(walk_member(visitor, member));
            }
        }
    }
    visitor.leave_type_decl(node);
    VisitResult::Continue
}

/// Walk a [`Member`] by dispatching on its variant.
pub fn walk_member<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast Member) -> VisitResult {
    match node {
        Member::Field(field) => walk_field_decl(visitor, field),
        Member::Method(method) => walk_method_decl(visitor, method),
        Member::Initializer(init) => walk_initializer(visitor, init),
        Member::Type(decl) => walk_type_decl(visitor, decl),
    }
}

/// Walk a [`FieldDecl`].
pub fn walk_field_decl<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast FieldDecl) -> VisitResult {
    match visitor.visit_field_decl(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            descend!(walk_type_ref(visitor, &node.ty));
            if let Some(init) = &node.initializer {
                descend!(walk_expr(visitor, init));
            }
        }
    }
    visitor.leave_field_decl(node);
    VisitResult::Continue
}

/// Walk a [`MethodDecl`]: return type, parameters, body.
pub fn walk_method_decl<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    node: &'ast MethodDecl,
) -> VisitResult {
    match visitor.visit_method_decl(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            if let Some(ret) = &node.return_type {
                descend!(walk_type_ref(visitor, ret));
            }
            for param in &node.params {
                descend!(walk_param(visitor, param));
            }
            if let Some(body) = &node.body {
                descend!(walk_block(visitor, body));
            }
        }
    }
    visitor.leave_method_decl(node);
    VisitResult::Continue
}

/// Walk an [`Initializer`].
pub fn walk_initializer<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    node: &'ast Initializer,
) -> VisitResult {
    match visitor.visit_initializer(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            descend!(walk_block(visitor, &node.body));
        }
    }
    visitor.leave_initializer(node);
    VisitResult::Continue
}

/// Walk a [`Param`].
pub fn walk_param<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast Param) -> VisitResult {
    match visitor.visit_param(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            descend!(walk_type_ref(visitor, &node.ty));
        }
    }
    visitor.leave_param(node);
    VisitResult::Continue
}

/// Walk a [`Block`].
pub fn walk_block<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast Block) -> VisitResult {
    match visitor.visit_block(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            for stmt in &node.statements {
                descend!(walk_stmt(visitor, stmt));
            }
        }
    }
    visitor.leave_block(node);
    VisitResult::Continue
}

/// Walk a [`LocalDecl`].
pub fn walk_local_decl<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast LocalDecl) -> VisitResult {
    match visitor.visit_local_decl(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            descend!(walk_type_ref(visitor, &node.ty));
            if let Some(init) = &node.initializer {
                descend!(walk_expr(visitor, init));
            }
        }
    }
    visitor.leave_local_decl(node);
    VisitResult::Continue
}

/// Walk a [`SwitchCase`].
pub fn walk_switch_case<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    node: &'ast SwitchCase,
) -> VisitResult {
    match visitor.visit_switch_case(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            for label in &node.labels {
                descend!(walk_expr(visitor, label));
            }
            for stmt in &node.body {
                descend!(walk_stmt(visitor, stmt));
            }
        }
    }
    visitor.leave_switch_case(node);
    VisitResult::Continue
}

/// Walk a [`CatchClause`].
pub fn walk_catch_clause<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    node: &'ast CatchClause,
) -> VisitResult {
    match visitor.visit_catch_clause(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            descend!(walk_param(visitor, &node.param));
            descend!(walk_block(visitor, &node.body));
        }
    }
    visitor.leave_catch_clause(node);
    VisitResult::Continue
}

/// Walk a [`Stmt`].
pub fn walk_stmt<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast Stmt) -> VisitResult {
    match visitor.visit_stmt(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => match node {
            Stmt::Local(decl) => {
                descend!(walk_local_decl(visitor, decl));
            }
            Stmt::Expr { expr } | Stmt::Throw { expr } => {
                descend!(walk_expr(visitor, expr));
            }
            Stmt::Return { value } => {
                if let Some(value) = value {
                    descend!(walk_expr(visitor, value));
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                descend!(walk_expr(visitor, cond));
                descend!(walk_block(visitor, then_branch));
                if let Some(else_branch) = else_branch {
                    descend!(walk_block(visitor, else_branch));
                }
            }
            Stmt::While { cond, body } => {
                descend!(walk_expr(visitor, cond));
                descend!(walk_block(visitor, body));
            }
            Stmt::DoWhile { body, cond } => {
                descend!(walk_block(visitor, body));
                descend!(walk_expr(visitor, cond));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                for stmt in init {
                    descend!(walk_stmt(visitor, stmt));
                }
                if let Some(cond) = cond {
                    descend!(walk_expr(visitor, cond));
                }
                for expr in update {
                    descend!(walk_expr(visitor, expr));
                }
                descend!(walk_block(visitor, body));
            }
            Stmt::ForEach {
                var,
                iterable,
                body,
            } => {
                descend!(walk_local_decl(visitor, var));
                descend!(walk_expr(visitor, iterable));
                descend!(walk_block(visitor, body));
            }
            Stmt::Switch { selector, cases } => {
                descend!(walk_expr(visitor, selector));
                for case in cases {
                    descend!(walk_switch_case(visitor, case));
                }
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                descend!(walk_block(visitor, body));
                for catch in catches {
                    descend!(walk_catch_clause(visitor, catch));
                }
                if let Some(finally) = finally {
                    descend!(walk_block(visitor, finally));
                }
            }
            Stmt::Block { block } => {
                descend!(walk_block(visitor, block));
            }
            Stmt::Synchronized { lock, body } => {
                descend!(walk_expr(visitor, lock));
                descend!(walk_block(visitor, body));
            }
            Stmt::LocalClass { decl } => {
                descend!(walk_type_decl(visitor, decl));
            }
            Stmt::Break | Stmt::Continue => {}
        },
    }
    visitor.leave_stmt(node);
    VisitResult::Continue
}

/// Walk an [`Expr`].
pub fn walk_expr<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast Expr) -> VisitResult {
    match visitor.visit_expr(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => match node {
            Expr::Literal { .. } | Expr::Name { .. } | Expr::This => {}
            Expr::FieldAccess { target, .. } => {
                if let Some(target) = target {
                    descend!(walk_expr(visitor, target));
                }
            }
            Expr::Call { target, args, .. } => {
                if let Some(target) = target {
                    descend!(walk_expr(visitor, target));
                }
                for arg in args {
                    descend!(walk_expr(visitor, arg));
                }
            }
            Expr::ConstructorCall { args, .. } => {
                for arg in args {
                    descend!(walk_expr(visitor, arg));
                }
            }
            Expr::New { ty, args, body, .. } => {
                descend!(walk_type_ref(visitor, ty));
                for arg in args {
                    descend!(walk_expr(visitor, arg));
                }
                if let Some(body) = body {
                    descend!(walk_type_decl(visitor, body));
                }
            }
            Expr::Assign { target, value, .. } => {
                descend!(walk_expr(visitor, target));
                descend!(walk_expr(visitor, value));
            }
            Expr::Binary { lhs, rhs, .. } => {
                descend!(walk_expr(visitor, lhs));
                descend!(walk_expr(visitor, rhs));
            }
            Expr::Unary { operand, .. } => {
                descend!(walk_expr(visitor, operand));
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                descend!(walk_expr(visitor, cond));
                descend!(walk_expr(visitor, then_expr));
                descend!(walk_expr(visitor, else_expr));
            }
            Expr::Cast { ty, expr } => {
                descend!(walk_type_ref(visitor, ty));
                descend!(walk_expr(visitor, expr));
            }
            Expr::InstanceOf { expr, ty } => {
                descend!(walk_expr(visitor, expr));
                descend!(walk_type_ref(visitor, ty));
            }
            Expr::ArrayAccess { array, index } => {
                descend!(walk_expr(visitor, array));
                descend!(walk_expr(visitor, index));
            }
            Expr::ArrayNew {
                element,
                dims,
                init,
            } => {
                descend!(walk_type_ref(visitor, element));
                for expr in dims.iter().chain(init.iter()) {
                    descend!(walk_expr(visitor, expr));
                }
            }
            Expr::ClassLiteral { ty } | Expr::TypeName { ty } => {
                descend!(walk_type_ref(visitor, ty));
            }
            Expr::Lambda { params, body } => {
                for param in params {
                    descend!(walk_param(visitor, param));
                }
                descend!(walk_block(visitor, body));
            }
        },
    }
    visitor.leave_expr(node);
    VisitResult::Continue
}

/// Walk a [`TypeRef`] (a leaf).
pub fn walk_type_ref<'ast, V: Visitor<'ast>>(visitor: &mut V, node: &'ast TypeRef) -> VisitResult {
    if visitor.visit_type_ref(node) == VisitResult::Stop {
        return VisitResult::Stop;
    }
    visitor.leave_type_ref(node);
    VisitResult::Continue
}

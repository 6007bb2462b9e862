// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Visitor infrastructure for traversing the compilation-unit AST.
//!
//! - [`Visitor`]: read-only traversal with `visit_*`/`leave_*` hooks
//! - `walk_*` functions: traversal drivers that call the hooks in source order
//!
//! # Example
//!
//! ```
//! use strata_ast::visitor::{walk_compilation_unit, VisitResult, Visitor};
//! use strata_ast::{CompilationUnit, TypeDecl};
//!
//! struct TypeNames(Vec<String>);
//!
//! impl<'ast> Visitor<'ast> for TypeNames {
//!     fn visit_type_decl(&mut self, node: &'ast TypeDecl) -> VisitResult {
//!         self.0.push(node.name.clone());
//!         VisitResult::Continue
//!     }
//! }
//!
//! let unit = CompilationUnit {
//!     path: "A.java".to_string(),
//!     package: None,
//!     line_count: 0,
//!     types: vec![],
//! };
//! let mut names = TypeNames(Vec::new());
//! walk_compilation_unit(&mut names, &unit);
//! assert!(names.0.is_empty());
//! ```

mod dispatch;
mod traits;

pub use dispatch::{
    walk_block, walk_catch_clause, walk_compilation_unit, walk_expr, walk_field_decl,
    walk_initializer, walk_local_decl, walk_member, walk_method_decl, walk_param, walk_stmt,
    walk_switch_case, walk_type_decl, walk_type_ref,
};
pub use traits::{VisitResult, Visitor};

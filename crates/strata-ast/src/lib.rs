// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Front-end facing AST for strata.
//!
//! A compiler front-end hands strata a set of [`CompilationUnit`]s: parsed
//! source files whose names have been resolved into bindings. This crate
//! defines those nodes, their JSON encoding, and a [`visitor`] for walking them.

pub mod error;
pub mod nodes;
pub mod visitor;

pub use error::{AstError, AstResult};
pub use nodes::*;

use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum UnitDocument {
    Many(Vec<CompilationUnit>),
    One(Box<CompilationUnit>),
}

/// Decode a JSON document holding either one compilation unit or an array of them.
///
/// `origin` names the document in error messages (usually its file path).
pub fn load_units(json: &str, origin: Option<&str>) -> AstResult<Vec<CompilationUnit>> {
    let document: UnitDocument =
        serde_json::from_str(json).map_err(|source| AstError::Decode {
            origin: origin.map(str::to_string),
            source,
        })?;
    let units = match document {
        UnitDocument::Many(units) => units,
        UnitDocument::One(unit) => vec![*unit],
    };
    if units.is_empty() {
        return Err(AstError::Empty);
    }
    Ok(units)
}

// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Errors raised while loading compilation units.

use thiserror::Error;

/// Failure to decode a compilation-unit document.
#[derive(Debug, Error)]
pub enum AstError {
    /// The document is not valid JSON or does not match the unit schema.
    #[error("invalid compilation unit document{}: {source}", origin.as_ref().map(|o| format!(" ({})", o)).unwrap_or_default())]
    Decode {
        origin: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    /// The document decoded but holds no compilation units.
    #[error("document contains no compilation units")]
    Empty,
}

pub type AstResult<T> = Result<T, AstError>;

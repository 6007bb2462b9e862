//! Strata: object-oriented source models and software metrics.
//!
//! Builds an entity graph from resolved compilation units, measures it with
//! a registry of metrics and persists the results as a metrics document.
//!
//! ## Modules
//!
//! - `cli` - CLI command implementations
//! - the core modules, re-exported from `strata-core`

// Core infrastructure - re-exported from strata-core
pub use strata_core::builder;
pub use strata_core::collect;
pub use strata_core::config;
pub use strata_core::error;
pub use strata_core::intern;
pub use strata_core::metrics;
pub use strata_core::model;
pub use strata_core::output;
pub use strata_core::persist;
pub use strata_core::resolution;

// Front-end AST
pub use strata_ast as ast;

// Front door
pub mod cli;

// Re-export core types for convenience
pub use strata_core::error::{OutputErrorCode, StrataError};
pub use strata_core::output::{ErrorInfo, ErrorResponse, SCHEMA_VERSION};

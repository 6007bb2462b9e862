//! Core of strata: an object-oriented source model and metrics over it.
//!
//! This crate provides:
//! - The entity graph (`model`) and its two-phase construction (`builder`)
//! - The run-scoped identity cache for external entities (`intern`)
//! - Reference collectors over method bodies and declarations (`collect`)
//! - Resolution completeness tracking (`resolution`)
//! - The metric registry, engine and standard metric set (`metrics`)
//! - Metrics documents and their reload (`persist`)
//! - Configuration, error types and JSON output types for the CLI

pub mod builder;
pub mod collect;
pub mod config;
pub mod error;
pub mod intern;
pub mod metrics;
pub mod model;
pub mod output;
pub mod persist;
pub mod resolution;

//! Shared test support utilities.
//!
//! This module provides helpers for integration tests: compilation-unit
//! builders and the two-class scenario project used across test files.

pub mod units;

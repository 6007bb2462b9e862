//! Metric registry, evaluation engine and the standard metric set.
//!
//! A [`Metric`] is a flat table of per-kind value functions plus two
//! rendering facets. For each entity kind it declares, it answers three
//! query modes:
//!
//! - [`QueryMode::Value`]: the entity's own measurement
//! - [`QueryMode::Total`]: the sum of values over the in-project population
//!   of the same kind
//! - [`QueryMode::Maximum`]: the maximum over that population
//!
//! A kind without a slot is unsupported, and every query for it returns
//! [`MetricError::Unsupported`]. The [`MetricEngine`] evaluates queries
//! against a finished [`Program`](crate::model::Program) and caches results.

mod engine;
mod registry;
pub mod standard;

pub use engine::{Aggregate, MetricEngine};
pub use registry::{Metric, MetricContext, MetricFailure, MetricRegistry, ValueFn};

pub use crate::model::{EntityKey, EntityKind, EntityRef};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three ways a metric can be queried for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Value,
    Total,
    Maximum,
}

impl QueryMode {
    pub const ALL: [QueryMode; 3] = [QueryMode::Value, QueryMode::Total, QueryMode::Maximum];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Value => "value",
            QueryMode::Total => "total",
            QueryMode::Maximum => "maximum",
        }
    }

    /// Parse `value`, `total`, `maximum` (or `max`).
    pub fn parse(text: &str) -> Option<QueryMode> {
        match text {
            "value" => Some(QueryMode::Value),
            "total" => Some(QueryMode::Total),
            "maximum" | "max" => Some(QueryMode::Maximum),
            _ => None,
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by metric queries.
///
/// `metric` fields carry the metric's description, `entity` fields the
/// entity's qualified name.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("{metric}: {mode} is not supported for {kind} {entity}")]
    Unsupported {
        metric: String,
        entity: String,
        kind: EntityKind,
        mode: QueryMode,
    },

    #[error("{metric} failed for {entity}: {reason}")]
    Failed {
        metric: String,
        entity: String,
        reason: String,
    },

    #[error("{metric} cannot be aggregated over {kind} entities: {reason}")]
    AggregateUnavailable {
        metric: String,
        kind: EntityKind,
        reason: String,
    },

    #[error("unknown metric '{id}'")]
    UnknownMetric { id: String },

    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("metric '{id}' is already registered")]
    DuplicateMetric { id: String },

    #[error("{metric} was not recorded for {entity}")]
    NotRecorded { metric: String, entity: String },
}

impl MetricError {
    /// Stable snake-case name of the variant, used in JSON error details.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MetricError::Unsupported { .. } => "unsupported",
            MetricError::Failed { .. } => "failed",
            MetricError::AggregateUnavailable { .. } => "aggregate_unavailable",
            MetricError::UnknownMetric { .. } => "unknown_metric",
            MetricError::UnknownEntity { .. } => "unknown_entity",
            MetricError::DuplicateMetric { .. } => "duplicate_metric",
            MetricError::NotRecorded { .. } => "not_recorded",
        }
    }
}

pub type MetricResult<T> = Result<T, MetricError>;

/// Anything that answers metric queries by stable entity key.
///
/// Implemented by the live [`MetricEngine`] and by reloaded metrics
/// documents, so both can be compared value for value.
pub trait MetricSource {
    fn value_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64>;

    /// Total over the population of `entity`'s kind.
    fn total_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64>;

    /// Maximum over the population of `entity`'s kind.
    fn maximum_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64>;

    fn query_of(&self, metric: &str, entity: &EntityKey, mode: QueryMode) -> MetricResult<f64> {
        match mode {
            QueryMode::Value => self.value_of(metric, entity),
            QueryMode::Total => self.total_of(metric, entity),
            QueryMode::Maximum => self.maximum_of(metric, entity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_mode_parse() {
        for mode in QueryMode::ALL {
            assert_eq!(QueryMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(QueryMode::parse("max"), Some(QueryMode::Maximum));
        assert_eq!(QueryMode::parse("mean"), None);
    }

    #[test]
    fn test_unsupported_message_names_metric_and_entity() {
        let err = MetricError::Unsupported {
            metric: "Coupling between objects".to_string(),
            entity: "p.A.run()".to_string(),
            kind: EntityKind::Method,
            mode: QueryMode::Value,
        };
        assert_eq!(
            err.to_string(),
            "Coupling between objects: value is not supported for method p.A.run()"
        );
        assert_eq!(err.kind_name(), "unsupported");
    }
}

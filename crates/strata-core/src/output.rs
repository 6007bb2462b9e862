//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Structured JSON:** every CLI response is a single JSON document
//! 2. **Status first:** every response has `status` as first field
//! 3. **Deterministic:** same input -> same output (field order, array ordering)
//! 4. **Versioned:** schema version in every response

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::builder::FileFailure;
use crate::error::{OutputErrorCode, StrataError};
use crate::metrics::{EntityKind, Metric, QueryMode};
use crate::model::{Origin, Program};
use crate::persist::{AggregateEntry, MetricsDocument};
use crate::resolution::ResolutionReport;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the process exit code).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a StrataError.
    pub fn from_error(err: &StrataError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let details = match err {
            StrataError::InvalidArguments { details, .. } => details.clone(),
            StrataError::MetricError { details, .. } => details.clone(),
            StrataError::InputNotFound { path } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };
        ErrorInfo {
            code,
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a StrataError.
    pub fn from_error(err: &StrataError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// analyze
// ============================================================================

/// Entity counts of a finished model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCounts {
    pub packages: usize,
    pub classes: usize,
    pub methods: usize,
    pub fields: usize,
    pub locals: usize,
    /// External classes created by reference resolution (subset of `classes`).
    pub external_classes: usize,
}

impl ModelCounts {
    pub fn of(program: &Program) -> Self {
        ModelCounts {
            packages: program.packages().count(),
            classes: program.class_count(),
            methods: program.method_count(),
            fields: program.field_count(),
            locals: program.local_count(),
            external_classes: program
                .classes()
                .filter(|c| c.origin == Origin::External)
                .count(),
        }
    }
}

/// A compilation unit skipped during model construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub path: String,
    pub message: String,
}

impl From<&FileFailure> for FailureInfo {
    fn from(failure: &FileFailure) -> Self {
        FailureInfo {
            path: failure.path.clone(),
            message: failure.error.to_string(),
        }
    }
}

/// Resolution completeness totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub members: usize,
    pub complete_members: usize,
    pub total_unresolved: u64,
}

impl From<&ResolutionReport> for ResolutionSummary {
    fn from(report: &ResolutionReport) -> Self {
        ResolutionSummary {
            members: report.members,
            complete_members: report.complete_members,
            total_unresolved: report.total_unresolved,
        }
    }
}

/// Response for the analyze command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub project: String,
    pub files_analyzed: usize,
    pub counts: ModelCounts,
    /// Skipped compilation units (may be empty).
    pub failures: Vec<FailureInfo>,
    pub resolution: ResolutionSummary,
    pub input_digest: String,
    /// Where the metrics document was written, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The metrics document itself, when not written to a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<MetricsDocument>,
}

impl AnalyzeResponse {
    pub fn new(
        program: &Program,
        files_analyzed: usize,
        failures: &[FileFailure],
        input_digest: impl Into<String>,
    ) -> Self {
        AnalyzeResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            project: program.name().to_string(),
            files_analyzed,
            counts: ModelCounts::of(program),
            failures: failures.iter().map(FailureInfo::from).collect(),
            resolution: ResolutionSummary::from(&ResolutionReport::from_program(program)),
            input_digest: input_digest.into(),
            output: None,
            document: None,
        }
    }
}

// ============================================================================
// metrics
// ============================================================================

/// Query modes a metric answers for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSupport {
    pub kind: EntityKind,
    pub modes: Vec<QueryMode>,
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub id: String,
    pub description: String,
    pub kinds: Vec<KindSupport>,
    /// Suitable for rendering as a size (height).
    pub height: bool,
    /// Suitable for rendering as a spread (width).
    pub width: bool,
}

impl MetricInfo {
    pub fn from_metric(metric: &Metric) -> Self {
        let kinds = metric
            .applicable_kinds()
            .into_iter()
            .map(|kind| KindSupport {
                kind,
                modes: QueryMode::ALL
                    .into_iter()
                    .filter(|mode| metric.supports(kind, *mode))
                    .collect(),
            })
            .collect();
        MetricInfo {
            id: metric.id().to_string(),
            description: metric.description().to_string(),
            kinds,
            height: metric.suitable_for_height(),
            width: metric.suitable_for_width(),
        }
    }
}

/// Response for the metrics command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsListResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Metrics in registration order.
    pub metrics: Vec<MetricInfo>,
}

impl MetricsListResponse {
    pub fn new(metrics: Vec<MetricInfo>) -> Self {
        MetricsListResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            metrics,
        }
    }
}

// ============================================================================
// show
// ============================================================================

/// A recorded value of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    /// Entity key in its textual form (`class:p.A`, `method:p.A#run()`).
    pub entity: String,
    pub value: f64,
}

/// Response for the show command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub metric: String,
    /// Values ordered by entity key.
    pub values: Vec<EntityValue>,
    /// Aggregates of the metric, restricted to the entity's kind when one
    /// entity was requested.
    pub aggregates: Vec<AggregateEntry>,
}

impl ShowResponse {
    pub fn new(
        metric: impl Into<String>,
        values: Vec<EntityValue>,
        aggregates: Vec<AggregateEntry>,
    ) -> Self {
        ShowResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            metric: metric.into(),
            values,
            aggregates,
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

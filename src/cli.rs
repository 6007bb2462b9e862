//! CLI command implementations.
//!
//! Provides the operations behind the `strata` binary:
//! - `analyze` - Build the model from unit documents and capture metrics
//! - `metrics` - List the registered metrics
//! - `show` - Query a previously written metrics document
//!
//! Every function returns a response struct from [`strata_core::output`];
//! the caller (typically `main.rs`) emits it as JSON.
//!
//! ## Error Handling
//!
//! All functions return `Result<T, StrataError>`. The `StrataError` type
//! provides stable error codes for JSON output.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use strata_ast::{load_units, CompilationUnit};
use strata_core::builder::build_program;
use strata_core::config::{CliOverrides, ResolvedConfig};
use strata_core::error::StrataError;
use strata_core::metrics::{EntityKey, MetricEngine, MetricError, MetricRegistry, MetricSource};
use strata_core::output::{
    AnalyzeResponse, EntityValue, MetricInfo, MetricsListResponse, ShowResponse,
};
use strata_core::persist::{self, LoadedMetrics};

/// Extension of compilation-unit documents picked up from directories.
pub const UNIT_EXTENSION: &str = "json";

// ============================================================================
// Inputs
// ============================================================================

/// Expand input paths into unit document files.
///
/// Relative paths are taken from `workspace`. Files are used as given;
/// directories are walked recursively for `*.json`, in file-name order.
pub fn collect_unit_files(
    workspace: &Path,
    inputs: &[PathBuf],
) -> Result<Vec<PathBuf>, StrataError> {
    if inputs.is_empty() {
        return Err(StrataError::invalid_args("at least one input is required"));
    }
    let mut files = Vec::new();
    for input in inputs {
        let path = workspace.join(input);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            let walker = WalkDir::new(&path).sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|e| StrataError::internal(e.to_string()))?;
                let is_unit = entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == UNIT_EXTENSION);
                if is_unit {
                    files.push(entry.into_path());
                }
            }
        } else {
            return Err(StrataError::input_not_found(input.display().to_string()));
        }
    }
    debug!(files = files.len(), "collected unit documents");
    Ok(files)
}

/// Decoded compilation units plus the digest of the raw documents.
#[derive(Debug)]
pub struct LoadedInputs {
    pub units: Vec<CompilationUnit>,
    pub digest: String,
}

/// Read and decode unit documents, in order.
pub fn load_inputs(files: &[PathBuf]) -> Result<LoadedInputs, StrataError> {
    let mut raw = Vec::with_capacity(files.len());
    let mut units = Vec::new();
    for file in files {
        let text = fs::read_to_string(file)
            .map_err(|_| StrataError::input_not_found(file.display().to_string()))?;
        units.extend(load_units(&text, Some(&file.display().to_string()))?);
        raw.push(text);
    }
    let slices: Vec<&[u8]> = raw.iter().map(|text| text.as_bytes()).collect();
    Ok(LoadedInputs {
        units,
        digest: persist::input_digest(&slices),
    })
}

// ============================================================================
// Commands
// ============================================================================

/// Build the model, evaluate every metric and capture the document.
///
/// With `out`, the document is written there and the response names the
/// path; otherwise the document is embedded in the response.
pub fn run_analyze(
    workspace: &Path,
    inputs: &[PathBuf],
    out: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<AnalyzeResponse, StrataError> {
    let resolved = ResolvedConfig::resolve(workspace, overrides)?;
    let config = resolved.analysis_config();
    debug!(?resolved, "configuration resolved");

    let files = collect_unit_files(workspace, inputs)?;
    let loaded = load_inputs(&files)?;
    let outcome = build_program(&loaded.units, &config);

    let registry = MetricRegistry::standard();
    let engine = MetricEngine::new(&outcome.program, &registry, config.strict_metrics);
    let document = persist::capture(&engine, Some(loaded.digest.clone()));

    let mut response = AnalyzeResponse::new(
        &outcome.program,
        loaded.units.len(),
        &outcome.failures,
        loaded.digest,
    );
    match out {
        Some(out) => {
            let path = workspace.join(out);
            persist::write_document(&path, &document)?;
            info!(path = %path.display(), "metrics document written");
            response.output = Some(path.display().to_string());
        }
        None => response.document = Some(document),
    }
    Ok(response)
}

/// Describe every metric of the standard registry.
pub fn list_metrics() -> MetricsListResponse {
    let registry = MetricRegistry::standard();
    MetricsListResponse::new(registry.iter().map(MetricInfo::from_metric).collect())
}

/// Query a metrics document for one metric.
///
/// With `entity` (textual key such as `class:p.A`), reports that entity's
/// value and the aggregates of its kind. Without, reports every recorded
/// value of the metric and all of its aggregates.
pub fn run_show(
    workspace: &Path,
    document: &Path,
    metric: &str,
    entity: Option<&str>,
) -> Result<ShowResponse, StrataError> {
    let loaded = LoadedMetrics::read(&workspace.join(document))?;
    let aggregates = loaded
        .document()
        .aggregates
        .iter()
        .filter(|entry| entry.metric == metric);

    let Some(entity) = entity else {
        let values: Vec<EntityValue> = loaded
            .entities()
            .into_iter()
            .filter_map(|key| {
                let value = loaded.metrics_of(key)?.get(metric)?;
                Some(EntityValue {
                    entity: key.to_string(),
                    value: *value,
                })
            })
            .collect();
        let aggregates: Vec<_> = aggregates.cloned().collect();
        if values.is_empty() && aggregates.is_empty() {
            return Err(MetricError::UnknownMetric {
                id: metric.to_string(),
            }
            .into());
        }
        return Ok(ShowResponse::new(metric, values, aggregates));
    };

    let key = EntityKey::parse(entity).ok_or_else(|| {
        StrataError::invalid_args(format!(
            "invalid entity key '{}', expected project, package:NAME, class:QNAME, \
             method:QNAME#SIG or field:QNAME#NAME",
            entity
        ))
    })?;
    let value = loaded.value_of(metric, &key)?;
    let aggregates = aggregates
        .filter(|entry| entry.kind == key.kind())
        .cloned()
        .collect();
    Ok(ShowResponse::new(
        metric,
        vec![EntityValue {
            entity: key.to_string(),
            value,
        }],
        aggregates,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_rejects_missing_input() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = collect_unit_files(temp.path(), &[PathBuf::from("nope")]).unwrap_err();
        assert!(matches!(err, StrataError::InputNotFound { .. }));
        assert!(collect_unit_files(temp.path(), &[]).is_err());
    }

    #[test]
    fn test_collect_walks_directories_in_name_order() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("units");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.json"), "[]").unwrap();
        fs::write(dir.join("a.json"), "[]").unwrap();
        fs::write(dir.join("nested").join("c.json"), "[]").unwrap();
        fs::write(dir.join("notes.txt"), "skip").unwrap();

        let files = collect_unit_files(temp.path(), &[PathBuf::from("units")]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn test_list_metrics_covers_registry() {
        let response = list_metrics();
        assert_eq!(response.metrics.len(), MetricRegistry::standard().len());
        assert_eq!(response.metrics[0].id, "NOCL");
    }
}

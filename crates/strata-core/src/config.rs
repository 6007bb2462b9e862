//! Analysis configuration with source tracking.
//!
//! Values are resolved with the precedence (lowest to highest):
//! built-in defaults, the project file `strata.toml`, environment
//! variables, CLI flags. Each resolved value remembers where it came from.
//!
//! ```toml
//! [analysis]
//! project_name = "billing"
//! parallel = true
//! threads = 4
//! dependence_variables = false
//! strict_metrics = false
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the project configuration file at the workspace root.
pub const PROJECT_FILE: &str = "strata.toml";

/// Options that steer model construction and metric evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Name reported for the project entity.
    pub project_name: String,
    /// Run the reference phase on a rayon pool.
    pub parallel: bool,
    /// Worker count for the parallel reference phase; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Emit synthetic formal/actual in/out variables in access sets.
    pub dependence_variables: bool,
    /// Fail coupling metrics on entities whose resolution is incomplete.
    pub strict_metrics: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            project_name: "project".to_string(),
            parallel: false,
            threads: None,
            dependence_variables: false,
            strict_metrics: false,
        }
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Source tracking
// ============================================================================

/// Source of a configuration value (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From `strata.toml` `[analysis]`.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Project file
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    #[serde(default)]
    analysis: AnalysisTable,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnalysisTable {
    project_name: Option<String>,
    parallel: Option<bool>,
    threads: Option<usize>,
    dependence_variables: Option<bool>,
    strict_metrics: Option<bool>,
}

// ============================================================================
// Resolution
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --project-name
    pub project_name: Option<String>,
    /// --parallel
    pub parallel: Option<bool>,
    /// --threads
    pub threads: Option<usize>,
    /// --dependence-vars
    pub dependence_variables: Option<bool>,
    /// --strict
    pub strict_metrics: Option<bool>,
}

/// Fully resolved configuration with value sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub project_name: ConfigValue<String>,
    pub parallel: ConfigValue<bool>,
    pub threads: ConfigValue<Option<usize>>,
    pub dependence_variables: ConfigValue<bool>,
    pub strict_metrics: ConfigValue<bool>,
}

impl ResolvedConfig {
    /// Resolve configuration for a workspace from the process environment.
    pub fn resolve(workspace_root: &Path, overrides: &CliOverrides) -> ConfigResult<Self> {
        Self::resolve_with_env(workspace_root, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env<F>(
        workspace_root: &Path,
        overrides: &CliOverrides,
        env: F,
    ) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ResolvedConfig::defaults(workspace_root);

        let project_path = workspace_root.join(PROJECT_FILE);
        if project_path.exists() {
            config.apply_project_config(&project_path)?;
        }

        config.apply_env_vars(env)?;
        config.apply_cli_overrides(overrides);

        Ok(config)
    }

    fn defaults(workspace_root: &Path) -> Self {
        let base = AnalysisConfig::default();
        let project_name = workspace_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or(base.project_name);
        ResolvedConfig {
            project_name: ConfigValue::new(project_name, ConfigSource::Default),
            parallel: ConfigValue::new(base.parallel, ConfigSource::Default),
            threads: ConfigValue::new(base.threads, ConfigSource::Default),
            dependence_variables: ConfigValue::new(base.dependence_variables, ConfigSource::Default),
            strict_metrics: ConfigValue::new(base.strict_metrics, ConfigSource::Default),
        }
    }

    fn apply_project_config(&mut self, path: &Path) -> ConfigResult<()> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ProjectFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let table = file.analysis;
        let source = ConfigSource::ProjectConfig;

        if let Some(name) = table.project_name {
            self.project_name = ConfigValue::new(name, source);
        }
        if let Some(parallel) = table.parallel {
            self.parallel = ConfigValue::new(parallel, source);
        }
        if let Some(threads) = table.threads {
            self.threads = ConfigValue::new(Some(threads), source);
        }
        if let Some(dependence) = table.dependence_variables {
            self.dependence_variables = ConfigValue::new(dependence, source);
        }
        if let Some(strict) = table.strict_metrics {
            self.strict_metrics = ConfigValue::new(strict, source);
        }
        Ok(())
    }

    fn apply_env_vars<F>(&mut self, env: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = ConfigSource::EnvVar;

        if let Some(name) = env("STRATA_PROJECT") {
            self.project_name = ConfigValue::new(name, source);
        }
        if let Some(value) = env("STRATA_PARALLEL") {
            self.parallel = ConfigValue::new(parse_flag("STRATA_PARALLEL", &value)?, source);
        }
        if let Some(value) = env("STRATA_THREADS") {
            let threads = value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
                name: "STRATA_THREADS".to_string(),
                value: value.clone(),
            })?;
            self.threads = ConfigValue::new(Some(threads), source);
        }
        if let Some(value) = env("STRATA_DEPENDENCE_VARS") {
            self.dependence_variables =
                ConfigValue::new(parse_flag("STRATA_DEPENDENCE_VARS", &value)?, source);
        }
        if let Some(value) = env("STRATA_STRICT") {
            self.strict_metrics = ConfigValue::new(parse_flag("STRATA_STRICT", &value)?, source);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let source = ConfigSource::CliFlag;

        if let Some(ref name) = overrides.project_name {
            self.project_name = ConfigValue::new(name.clone(), source);
        }
        if let Some(parallel) = overrides.parallel {
            self.parallel = ConfigValue::new(parallel, source);
        }
        if let Some(threads) = overrides.threads {
            self.threads = ConfigValue::new(Some(threads), source);
        }
        if let Some(dependence) = overrides.dependence_variables {
            self.dependence_variables = ConfigValue::new(dependence, source);
        }
        if let Some(strict) = overrides.strict_metrics {
            self.strict_metrics = ConfigValue::new(strict, source);
        }
    }

    /// The plain analysis options.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            project_name: self.project_name.value.clone(),
            parallel: self.parallel.value,
            threads: self.threads.value,
            dependence_variables: self.dependence_variables.value,
            strict_metrics: self.strict_metrics.value,
        }
    }
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_use_directory_name() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("billing");
        fs::create_dir(&root).unwrap();

        let config = ResolvedConfig::resolve_with_env(&root, &CliOverrides::default(), no_env)
            .unwrap();
        assert_eq!(config.project_name.value, "billing");
        assert_eq!(config.project_name.source, ConfigSource::Default);
        assert!(!config.parallel.value);
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_FILE),
            "[analysis]\nparallel = true\nthreads = 3\n",
        )
        .unwrap();

        let config =
            ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env).unwrap();
        assert!(config.parallel.value);
        assert_eq!(config.parallel.source, ConfigSource::ProjectConfig);
        assert_eq!(config.threads.value, Some(3));
        assert_eq!(config.strict_metrics.source, ConfigSource::Default);
    }

    #[test]
    fn test_precedence_env_then_cli() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "[analysis]\nstrict_metrics = false\n").unwrap();
        let env: HashMap<&str, &str> = [("STRATA_STRICT", "yes"), ("STRATA_PROJECT", "from-env")]
            .into_iter()
            .collect();
        let overrides = CliOverrides {
            project_name: Some("from-cli".to_string()),
            ..Default::default()
        };

        let config = ResolvedConfig::resolve_with_env(dir.path(), &overrides, |name| {
            env.get(name).map(|v| v.to_string())
        })
        .unwrap();
        assert!(config.strict_metrics.value);
        assert_eq!(config.strict_metrics.source, ConfigSource::EnvVar);
        assert_eq!(config.project_name.value, "from-cli");
        assert_eq!(config.project_name.source, ConfigSource::CliFlag);
    }

    #[test]
    fn test_invalid_env_flag_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), |n| {
            (n == "STRATA_PARALLEL").then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_unknown_project_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "[analysis]\nparalel = true\n").unwrap();
        let result =
            ResolvedConfig::resolve_with_env(dir.path(), &CliOverrides::default(), no_env);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_config_value_merge_prefers_higher_source() {
        let low = ConfigValue::new(1, ConfigSource::ProjectConfig);
        let high = ConfigValue::new(2, ConfigSource::CliFlag);
        assert_eq!(low.clone().merge(high.clone()).value, 2);
        assert_eq!(high.merge(low).value, 2);
    }
}

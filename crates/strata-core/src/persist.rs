//! Metrics documents: capture, JSON round-trip and reload.
//!
//! A [`MetricsDocument`] mirrors the containment tree of a program
//! (project, packages, classes with their nested classes, methods and
//! fields). Every node carries the values of the metrics applicable to its
//! kind, and the document lists the total and maximum of each aggregatable
//! (metric, kind) pair. Values that failed at capture time are omitted.
//!
//! [`LoadedMetrics`] answers queries against a reloaded document through
//! [`MetricSource`], keyed by [`EntityKey`] so that ids never leak into the
//! file.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::metrics::{
    EntityKey, EntityKind, EntityRef, MetricEngine, MetricError, MetricResult, MetricSource,
    QueryMode,
};
use crate::model::{Class, ClassId, ClassKind, MethodKind, Package, Program};

/// Version of the document layout; readers reject any other value.
pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

/// Metric id to value, in id order.
pub type MetricValues = BTreeMap<String, f64>;

// ============================================================================
// Document
// ============================================================================

/// Serialized metrics of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub schema_version: u32,
    /// ISO 8601 UTC time of capture.
    pub generated_at: String,
    /// SHA-256 of the analyzed inputs, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,
    pub project: ProjectNode,
    #[serde(default)]
    pub aggregates: Vec<AggregateEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub name: String,
    pub metrics: MetricValues,
    pub packages: Vec<PackageNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Empty for the default package.
    pub name: String,
    #[serde(default)]
    pub external: bool,
    pub metrics: MetricValues,
    /// Top-level classes; nested classes hang off their enclosing node.
    pub classes: Vec<ClassNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub qualified_name: String,
    pub kind: ClassKind,
    #[serde(default)]
    pub external: bool,
    /// Whether the class and all its members resolved completely.
    pub complete: bool,
    pub metrics: MetricValues,
    #[serde(default)]
    pub methods: Vec<MethodNode>,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
    #[serde(default)]
    pub classes: Vec<ClassNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub name: String,
    pub signature: String,
    pub kind: MethodKind,
    /// Implicit or inherited members referenced on an analyzed class.
    #[serde(default)]
    pub external: bool,
    pub complete: bool,
    pub metrics: MetricValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    #[serde(default)]
    pub external: bool,
    pub complete: bool,
    pub metrics: MetricValues,
}

/// Total and maximum of one metric over the in-project population of a kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub metric: String,
    pub kind: EntityKind,
    pub total: f64,
    pub maximum: f64,
    pub population: usize,
}

impl MetricsDocument {
    /// Number of class nodes at any depth.
    pub fn class_count(&self) -> usize {
        fn count(nodes: &[ClassNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.classes)).sum()
        }
        self.project
            .packages
            .iter()
            .map(|p| count(&p.classes))
            .sum()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while writing or reading a metrics document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed metrics document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metrics document has schema version {found}, expected {expected}")]
    SchemaMismatch { expected: u32, found: u32 },
}

pub type PersistResult<T> = Result<T, PersistError>;

// ============================================================================
// Capture
// ============================================================================

/// Snapshot every recordable value and aggregate of `engine`.
pub fn capture(engine: &MetricEngine<'_>, input_digest: Option<String>) -> MetricsDocument {
    let recorder = Recorder { engine };
    let program = engine.program();

    let packages = ordered_packages(program)
        .into_iter()
        .map(|package| recorder.package(package))
        .collect();

    let project = ProjectNode {
        name: program.name().to_string(),
        metrics: recorder.values(EntityRef::Project),
        packages,
    };

    MetricsDocument {
        schema_version: DOCUMENT_SCHEMA_VERSION,
        generated_at: format_timestamp(SystemTime::now()),
        input_digest,
        project,
        aggregates: recorder.aggregates(),
    }
}

struct Recorder<'e, 'p> {
    engine: &'e MetricEngine<'p>,
}

impl Recorder<'_, '_> {
    fn values(&self, entity: EntityRef) -> MetricValues {
        let mut values = MetricValues::new();
        for metric in self.engine.registry().iter() {
            if !metric.is_applicable_to(entity.kind()) {
                continue;
            }
            match self.engine.value(metric.id(), entity) {
                Ok(value) => {
                    values.insert(metric.id().to_string(), value);
                }
                Err(err) => debug!(metric = metric.id(), error = %err, "value not recorded"),
            }
        }
        values
    }

    fn aggregates(&self) -> Vec<AggregateEntry> {
        let mut entries = Vec::new();
        for metric in self.engine.registry().iter() {
            for kind in metric.applicable_kinds() {
                if !metric.supports(kind, QueryMode::Total) {
                    continue;
                }
                match self.engine.aggregate(metric.id(), kind) {
                    Ok(aggregate) => entries.push(AggregateEntry {
                        metric: metric.id().to_string(),
                        kind,
                        total: aggregate.total,
                        maximum: aggregate.maximum,
                        population: aggregate.population,
                    }),
                    Err(err) => {
                        debug!(metric = metric.id(), %kind, error = %err, "aggregate not recorded")
                    }
                }
            }
        }
        entries
    }

    fn package(&self, package: &Package) -> PackageNode {
        let program = self.engine.program();
        let top_level = package
            .classes
            .iter()
            .copied()
            .filter(|id| program.class(*id).is_some_and(|c| c.enclosing.is_none()))
            .collect::<Vec<_>>();
        PackageNode {
            name: package.name.clone(),
            external: !package.is_in_project(),
            metrics: self.values(EntityRef::Package(package.id)),
            classes: self.classes(&top_level),
        }
    }

    fn classes(&self, ids: &[ClassId]) -> Vec<ClassNode> {
        let program = self.engine.program();
        ordered_classes(program, ids)
            .into_iter()
            .map(|class| self.class(class))
            .collect()
    }

    fn class(&self, class: &Class) -> ClassNode {
        let program = self.engine.program();

        let mut methods: Vec<_> = class
            .methods
            .iter()
            .chain(program.adopted_methods(class.id))
            .filter_map(|id| program.method(*id))
            .collect();
        methods.sort_by(|a, b| {
            member_order(
                (a.is_in_project(), &a.signature),
                (b.is_in_project(), &b.signature),
            )
        });
        let mut fields: Vec<_> = class
            .fields
            .iter()
            .chain(program.adopted_fields(class.id))
            .filter_map(|id| program.field(*id))
            .collect();
        fields.sort_by(|a, b| {
            member_order((a.is_in_project(), &a.name), (b.is_in_project(), &b.name))
        });

        ClassNode {
            name: class.name.clone(),
            qualified_name: class.qualified_name.clone(),
            kind: class.kind,
            external: !class.is_in_project(),
            complete: program.class_resolution(class.id).complete,
            metrics: self.values(EntityRef::Class(class.id)),
            methods: methods
                .into_iter()
                .map(|method| MethodNode {
                    name: method.name.clone(),
                    signature: method.signature.clone(),
                    kind: method.kind,
                    external: !method.is_in_project(),
                    complete: method.resolution().complete,
                    metrics: self.values(EntityRef::Method(method.id)),
                })
                .collect(),
            fields: fields
                .into_iter()
                .map(|field| FieldNode {
                    name: field.name.clone(),
                    external: !field.is_in_project(),
                    complete: field.status.complete,
                    metrics: self.values(EntityRef::Field(field.id)),
                })
                .collect(),
            classes: self.classes(&class.inner_classes),
        }
    }
}

/// In-project packages in declaration order, then external ones by name.
fn ordered_packages(program: &Program) -> Vec<&Package> {
    let (mut packages, mut external): (Vec<&Package>, Vec<&Package>) =
        program.packages().partition(|p| p.is_in_project());
    external.sort_by(|a, b| a.name.cmp(&b.name));
    packages.extend(external);
    packages
}

/// In-project classes in declaration order, then external ones by qualified
/// name. External ids depend on reference-phase scheduling.
fn ordered_classes<'p>(program: &'p Program, ids: &[ClassId]) -> Vec<&'p Class> {
    let (mut classes, mut external): (Vec<&Class>, Vec<&Class>) = ids
        .iter()
        .filter_map(|id| program.class(*id))
        .partition(|c| c.is_in_project());
    external.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    classes.extend(external);
    classes
}

/// In-project members first, keeping declaration order (the sort is
/// stable); external members after them by name.
fn member_order(a: (bool, &String), b: (bool, &String)) -> Ordering {
    match (a.0, b.0) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.1.cmp(b.1),
    }
}

/// Format a timestamp for JSON output (ISO 8601).
fn format_timestamp(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// SHA-256 over the given inputs in order, hex encoded.
///
/// Each input is prefixed with its length so that moving bytes between
/// adjacent inputs changes the digest.
pub fn input_digest(inputs: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update((input.len() as u64).to_le_bytes());
        hasher.update(input);
    }
    hex::encode(hasher.finalize())
}

// ============================================================================
// Serialization
// ============================================================================

pub fn to_json(document: &MetricsDocument) -> PersistResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parse a document, rejecting foreign schema versions before the body.
pub fn from_json(text: &str) -> PersistResult<MetricsDocument> {
    #[derive(Deserialize)]
    struct VersionProbe {
        schema_version: u32,
    }

    let probe: VersionProbe = serde_json::from_str(text)?;
    if probe.schema_version != DOCUMENT_SCHEMA_VERSION {
        return Err(PersistError::SchemaMismatch {
            expected: DOCUMENT_SCHEMA_VERSION,
            found: probe.schema_version,
        });
    }
    Ok(serde_json::from_str(text)?)
}

/// Write `document` to `path` via a temp file and rename.
pub fn write_document(path: &Path, document: &MetricsDocument) -> PersistResult<()> {
    let content = to_json(document)?;
    let io_error = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let temp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    ));
    fs::write(&temp_path, content).map_err(io_error)?;
    fs::rename(&temp_path, path).map_err(io_error)?;
    debug!(path = %path.display(), "metrics document written");
    Ok(())
}

pub fn read_document(path: &Path) -> PersistResult<MetricsDocument> {
    let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_json(&text)
}

// ============================================================================
// Reload
// ============================================================================

/// A reloaded document answering metric queries by entity key.
#[derive(Debug, Clone)]
pub struct LoadedMetrics {
    document: MetricsDocument,
    values: HashMap<EntityKey, MetricValues>,
    aggregates: HashMap<(String, EntityKind), AggregateEntry>,
    metric_ids: BTreeSet<String>,
}

impl LoadedMetrics {
    pub fn new(document: MetricsDocument) -> Self {
        let mut values = HashMap::new();
        values.insert(EntityKey::Project, document.project.metrics.clone());
        for package in &document.project.packages {
            values.insert(
                EntityKey::Package {
                    name: package.name.clone(),
                },
                package.metrics.clone(),
            );
            index_classes(&package.classes, &mut values);
        }

        let aggregates: HashMap<_, _> = document
            .aggregates
            .iter()
            .map(|entry| ((entry.metric.clone(), entry.kind), entry.clone()))
            .collect();

        let metric_ids = values
            .values()
            .flat_map(|metrics| metrics.keys().cloned())
            .chain(document.aggregates.iter().map(|e| e.metric.clone()))
            .collect();

        LoadedMetrics {
            document,
            values,
            aggregates,
            metric_ids,
        }
    }

    pub fn read(path: &Path) -> PersistResult<Self> {
        read_document(path).map(LoadedMetrics::new)
    }

    pub fn document(&self) -> &MetricsDocument {
        &self.document
    }

    /// Keys of every entity node in the document, in key order.
    pub fn entities(&self) -> Vec<&EntityKey> {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        keys
    }

    /// Recorded values of one entity.
    pub fn metrics_of(&self, entity: &EntityKey) -> Option<&MetricValues> {
        self.values.get(entity)
    }

    fn known(&self, entity: &EntityKey) -> MetricResult<&MetricValues> {
        self.values
            .get(entity)
            .ok_or_else(|| MetricError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    fn missing(&self, metric: &str, entity: String) -> MetricError {
        if self.metric_ids.contains(metric) {
            MetricError::NotRecorded {
                metric: metric.to_string(),
                entity,
            }
        } else {
            MetricError::UnknownMetric {
                id: metric.to_string(),
            }
        }
    }

    fn aggregate(&self, metric: &str, entity: &EntityKey) -> MetricResult<&AggregateEntry> {
        self.known(entity)?;
        let kind = entity.kind();
        self.aggregates
            .get(&(metric.to_string(), kind))
            .ok_or_else(|| self.missing(metric, format!("({} population)", kind)))
    }
}

fn index_classes(nodes: &[ClassNode], values: &mut HashMap<EntityKey, MetricValues>) {
    for node in nodes {
        values.insert(
            EntityKey::Class {
                name: node.qualified_name.clone(),
            },
            node.metrics.clone(),
        );
        for method in &node.methods {
            values.insert(
                EntityKey::Method {
                    class: node.qualified_name.clone(),
                    signature: method.signature.clone(),
                },
                method.metrics.clone(),
            );
        }
        for field in &node.fields {
            values.insert(
                EntityKey::Field {
                    class: node.qualified_name.clone(),
                    name: field.name.clone(),
                },
                field.metrics.clone(),
            );
        }
        index_classes(&node.classes, values);
    }
}

impl MetricSource for LoadedMetrics {
    fn value_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64> {
        self.known(entity)?
            .get(metric)
            .copied()
            .ok_or_else(|| self.missing(metric, entity.to_string()))
    }

    fn total_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64> {
        self.aggregate(metric, entity).map(|entry| entry.total)
    }

    fn maximum_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64> {
        self.aggregate(metric, entity).map(|entry| entry.maximum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::test_support::*;
    use crate::metrics::MetricRegistry;
    use strata_ast::{Expr, Member, Stmt, VariableKind};

    fn sample() -> Program {
        let a = class_decl(
            "p",
            "A",
            vec![
                Member::Method(method(
                    "p.A",
                    "run",
                    vec![int_param("n")],
                    vec![
                        call(Some(method_binding("p.B", "go", &[]))),
                        Stmt::Return {
                            value: Some(local_name("n", VariableKind::Parameter)),
                        },
                    ],
                )),
                Member::Method(method(
                    "p.A",
                    "idle",
                    vec![],
                    vec![
                        Stmt::Expr {
                            expr: Expr::call("lost", None, vec![]),
                        },
                        call(Some(method_binding("p.B", "toString", &[]))),
                    ],
                )),
            ],
        );
        let b = class_decl(
            "p",
            "B",
            vec![Member::Method(method("p.B", "go", vec![], vec![]))],
        );
        build(&[unit("p", vec![a]), unit("p", vec![b])])
    }

    #[test]
    fn test_capture_builds_tree() {
        let program = sample();
        let registry = MetricRegistry::standard();
        let engine = MetricEngine::new(&program, &registry, false);
        let document = capture(&engine, Some(input_digest(&[b"unit"])));

        assert_eq!(document.schema_version, DOCUMENT_SCHEMA_VERSION);
        assert_eq!(document.project.name, program.name());
        let package = &document.project.packages[0];
        assert_eq!(package.name, "p");
        assert!(!package.external);
        let names: Vec<_> = package.classes.iter().map(|c| c.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["p.A", "p.B"]);

        let a = &package.classes[0];
        assert_eq!(a.metrics["NOM"], 2.0);
        assert_eq!(a.metrics["CBO"], 1.0);
        assert!(!a.complete);
        let idle = a.methods.iter().find(|m| m.name == "idle").unwrap();
        assert!(!idle.complete);
        assert!(document
            .aggregates
            .iter()
            .any(|e| e.metric == "NOM" && e.kind == EntityKind::Class && e.total == 3.0));
        assert!(!document
            .aggregates
            .iter()
            .any(|e| e.metric == "DIT"));

        // The inherited `toString()` is listed on B after its own methods.
        let b = &package.classes[1];
        let methods: Vec<_> = b
            .methods
            .iter()
            .map(|m| (m.signature.as_str(), m.external))
            .collect();
        assert_eq!(methods, vec![("go()", false), ("toString()", true)]);
        assert_eq!(b.metrics["NOM"], 1.0);
    }

    #[test]
    fn test_reload_reproduces_engine() {
        let program = sample();
        let registry = MetricRegistry::standard();
        let engine = MetricEngine::new(&program, &registry, false);
        let document = capture(&engine, None);
        let text = to_json(&document).unwrap();
        let loaded = LoadedMetrics::new(from_json(&text).unwrap());
        assert_eq!(loaded.document(), &document);

        for key in loaded.entities() {
            for (metric, value) in loaded.metrics_of(key).unwrap() {
                let live = engine.value_of(metric, key).unwrap();
                assert_eq!(live.to_bits(), value.to_bits(), "{} {}", metric, key);
                if let Ok(total) = loaded.total_of(metric, key) {
                    assert_eq!(engine.total_of(metric, key).unwrap(), total);
                    assert_eq!(
                        engine.maximum_of(metric, key).unwrap(),
                        loaded.maximum_of(metric, key).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn test_loaded_errors() {
        let program = sample();
        let registry = MetricRegistry::standard();
        let engine = MetricEngine::new(&program, &registry, false);
        let loaded = LoadedMetrics::new(capture(&engine, None));
        let a = EntityKey::Class {
            name: "p.A".to_string(),
        };

        assert!(matches!(
            loaded.value_of("NOPE", &a),
            Err(MetricError::UnknownMetric { .. })
        ));
        assert!(matches!(
            loaded.value_of("CC", &a),
            Err(MetricError::NotRecorded { .. })
        ));
        assert!(matches!(
            loaded.total_of("DIT", &a),
            Err(MetricError::NotRecorded { .. })
        ));
        let ghost = EntityKey::Class {
            name: "p.Ghost".to_string(),
        };
        assert!(matches!(
            loaded.value_of("NOM", &ghost),
            Err(MetricError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let err = from_json(r#"{"schema_version": 7}"#).unwrap_err();
        assert!(matches!(
            err,
            PersistError::SchemaMismatch {
                expected: DOCUMENT_SCHEMA_VERSION,
                found: 7
            }
        ));
        assert!(matches!(from_json("not json"), Err(PersistError::Json(_))));
    }

    #[test]
    fn test_write_and_read_document() {
        let program = sample();
        let registry = MetricRegistry::standard();
        let engine = MetricEngine::new(&program, &registry, false);
        let document = capture(&engine, None);

        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out").join("metrics.json");
        write_document(&path, &document).unwrap();
        assert_eq!(read_document(&path).unwrap(), document);

        let missing = read_document(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, PersistError::Io { .. }));
    }

    #[test]
    fn test_input_digest_is_length_framed() {
        assert_eq!(input_digest(&[b"ab", b"c"]).len(), 64);
        assert_ne!(input_digest(&[b"ab", b"c"]), input_digest(&[b"a", b"bc"]));
        assert_eq!(input_digest(&[b"x"]), input_digest(&[b"x"]));
    }
}

//! Metric evaluation with write-once caches.
//!
//! Values are cached on success only; a failed value is recomputed on the
//! next query. Total and maximum are computed together in one scan per
//! (metric, kind) and stored in a `OnceLock`, so each population is scanned
//! at most once per engine. A failed scan is cached as well.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::Serialize;
use tracing::debug;

use super::{
    EntityKey, EntityKind, EntityRef, Metric, MetricContext, MetricError, MetricRegistry,
    MetricResult, MetricSource, QueryMode,
};
use crate::model::Program;

/// Total and maximum of one metric over the in-project population of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub total: f64,
    pub maximum: f64,
    pub population: usize,
}

type AggregateCell = Arc<OnceLock<MetricResult<Aggregate>>>;

/// Answers metric queries against one finished program.
pub struct MetricEngine<'p> {
    registry: &'p MetricRegistry,
    context: MetricContext<'p>,
    values: Mutex<HashMap<(String, EntityRef), f64>>,
    aggregates: Mutex<HashMap<(String, EntityKind), AggregateCell>>,
    scans: AtomicU64,
}

impl<'p> MetricEngine<'p> {
    pub fn new(program: &'p Program, registry: &'p MetricRegistry, strict: bool) -> Self {
        MetricEngine {
            registry,
            context: MetricContext { program, strict },
            values: Mutex::new(HashMap::new()),
            aggregates: Mutex::new(HashMap::new()),
            scans: AtomicU64::new(0),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.context.program
    }

    pub fn registry(&self) -> &'p MetricRegistry {
        self.registry
    }

    /// Number of population scans performed so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    pub fn value(&self, metric: &str, entity: EntityRef) -> MetricResult<f64> {
        let metric = self.registry.lookup(metric)?;
        self.check(metric, entity, QueryMode::Value)?;
        self.value_of_metric(metric, entity)
    }

    pub fn total(&self, metric: &str, entity: EntityRef) -> MetricResult<f64> {
        self.query(metric, entity, QueryMode::Total)
    }

    pub fn maximum(&self, metric: &str, entity: EntityRef) -> MetricResult<f64> {
        self.query(metric, entity, QueryMode::Maximum)
    }

    pub fn query(&self, metric: &str, entity: EntityRef, mode: QueryMode) -> MetricResult<f64> {
        match mode {
            QueryMode::Value => self.value(metric, entity),
            QueryMode::Total => self.aggregate_for(metric, entity, mode).map(|a| a.total),
            QueryMode::Maximum => self.aggregate_for(metric, entity, mode).map(|a| a.maximum),
        }
    }

    /// Total and maximum of `metric` over the in-project entities of `kind`.
    ///
    /// An empty population yields a total and maximum of zero.
    pub fn aggregate(&self, metric: &str, kind: EntityKind) -> MetricResult<Aggregate> {
        let metric = self.registry.lookup(metric)?;
        if !metric.supports(kind, QueryMode::Total) {
            return Err(MetricError::Unsupported {
                metric: metric.description().to_string(),
                entity: format!("({} population)", kind),
                kind,
                mode: QueryMode::Total,
            });
        }
        self.cached_aggregate(metric, kind)
    }

    fn aggregate_for(
        &self,
        metric: &str,
        entity: EntityRef,
        mode: QueryMode,
    ) -> MetricResult<Aggregate> {
        let metric = self.registry.lookup(metric)?;
        self.check(metric, entity, mode)?;
        self.cached_aggregate(metric, entity.kind())
    }

    fn check(&self, metric: &Metric, entity: EntityRef, mode: QueryMode) -> MetricResult<()> {
        let program = self.context.program;
        if !program.contains(entity) {
            return Err(MetricError::UnknownEntity {
                entity: format!("{:?}", entity),
            });
        }
        if !metric.supports(entity.kind(), mode) {
            return Err(MetricError::Unsupported {
                metric: metric.description().to_string(),
                entity: program.describe(entity),
                kind: entity.kind(),
                mode,
            });
        }
        Ok(())
    }

    fn value_of_metric(&self, metric: &Metric, entity: EntityRef) -> MetricResult<f64> {
        let key = (metric.id().to_string(), entity);
        if let Some(value) = self.lock_values().get(&key) {
            return Ok(*value);
        }
        // Unlocked while the body runs; racing callers store equal values.
        let computed = match metric.compute(&self.context, entity) {
            Some(result) => result,
            None => {
                return Err(MetricError::Unsupported {
                    metric: metric.description().to_string(),
                    entity: self.context.program.describe(entity),
                    kind: entity.kind(),
                    mode: QueryMode::Value,
                })
            }
        };
        match computed {
            Ok(value) => {
                self.lock_values().insert(key, value);
                Ok(value)
            }
            Err(failure) => Err(MetricError::Failed {
                metric: metric.description().to_string(),
                entity: self.context.program.describe(entity),
                reason: failure.reason,
            }),
        }
    }

    fn cached_aggregate(&self, metric: &Metric, kind: EntityKind) -> MetricResult<Aggregate> {
        let cell = {
            let mut aggregates = self
                .aggregates
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            aggregates
                .entry((metric.id().to_string(), kind))
                .or_default()
                .clone()
        };
        cell.get_or_init(|| self.scan(metric, kind)).clone()
    }

    fn scan(&self, metric: &Metric, kind: EntityKind) -> MetricResult<Aggregate> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        let population = self.context.program.population(kind);
        let mut total = 0.0;
        let mut maximum: Option<f64> = None;
        for entity in &population {
            let value = self
                .value_of_metric(metric, *entity)
                .map_err(|err| MetricError::AggregateUnavailable {
                    metric: metric.description().to_string(),
                    kind,
                    reason: err.to_string(),
                })?;
            total += value;
            maximum = Some(maximum.map_or(value, |m: f64| m.max(value)));
        }
        debug!(
            metric = metric.id(),
            %kind,
            population = population.len(),
            total,
            "aggregate scanned"
        );
        Ok(Aggregate {
            total,
            maximum: maximum.unwrap_or(0.0),
            population: population.len(),
        })
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<(String, EntityRef), f64>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, key: &EntityKey) -> MetricResult<EntityRef> {
        self.context
            .program
            .resolve_key(key)
            .ok_or_else(|| MetricError::UnknownEntity {
                entity: key.to_string(),
            })
    }
}

impl MetricSource for MetricEngine<'_> {
    fn value_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64> {
        self.value(metric, self.resolve(entity)?)
    }

    fn total_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64> {
        self.total(metric, self.resolve(entity)?)
    }

    fn maximum_of(&self, metric: &str, entity: &EntityKey) -> MetricResult<f64> {
        self.maximum(metric, self.resolve(entity)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricFailure;
    use crate::model::ClassId;

    /// Counts classes by name length; fails for names starting with `X`.
    fn name_length(registry: &mut MetricRegistry) {
        let metric = Metric::new("LEN", "Name length").with_value(EntityKind::Class, |ctx, e| {
            let EntityRef::Class(id) = e else {
                return Err(MetricFailure::dangling(e));
            };
            let class = ctx.program.class(id).ok_or_else(|| MetricFailure::dangling(e))?;
            if class.name.starts_with('X') {
                return Err(MetricFailure::new("unmeasurable"));
            }
            Ok(class.name.len() as f64)
        });
        registry.register(metric).unwrap();
    }

    fn program_with(names: &[&str]) -> Program {
        use strata_ast::TypeDecl;
        let mut builder = crate::builder::ModelBuilder::new("demo");
        builder.begin_file("p/All.java", Some("p"), 1);
        for name in names {
            let decl = TypeDecl {
                name: name.to_string(),
                kind: strata_ast::TypeKind::Class,
                binding: None,
                superclass: None,
                interfaces: vec![],
                members: vec![],
            };
            builder.register_in_project_class(&decl).unwrap();
            builder.close_construction().unwrap();
        }
        builder.end_file().unwrap();
        builder.into_program()
    }

    #[test]
    fn test_aggregate_scans_once() {
        let program = program_with(&["A", "Bbb", "Cc"]);
        let mut registry = MetricRegistry::new();
        name_length(&mut registry);
        let engine = MetricEngine::new(&program, &registry, false);
        let a = EntityRef::Class(ClassId::new(0));

        let first = engine.total("LEN", a).unwrap();
        let second = engine.total("LEN", a).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(first, 6.0);
        assert_eq!(engine.maximum("LEN", a).unwrap(), 3.0);
        assert_eq!(engine.scan_count(), 1);
        assert_eq!(engine.aggregate("LEN", EntityKind::Class).unwrap().population, 3);
    }

    #[test]
    fn test_empty_population_is_zero() {
        let program = program_with(&[]);
        let mut registry = MetricRegistry::new();
        name_length(&mut registry);
        let engine = MetricEngine::new(&program, &registry, false);
        let aggregate = engine.aggregate("LEN", EntityKind::Class).unwrap();
        assert_eq!(
            aggregate,
            Aggregate {
                total: 0.0,
                maximum: 0.0,
                population: 0
            }
        );
    }

    #[test]
    fn test_failed_value_is_retried_but_failed_aggregate_is_cached() {
        let program = program_with(&["A", "Xy"]);
        let mut registry = MetricRegistry::new();
        name_length(&mut registry);
        let engine = MetricEngine::new(&program, &registry, false);
        let xy = EntityRef::Class(ClassId::new(1));

        assert!(matches!(engine.value("LEN", xy), Err(MetricError::Failed { .. })));
        assert!(matches!(engine.value("LEN", xy), Err(MetricError::Failed { .. })));

        let err = engine.total("LEN", xy).unwrap_err();
        assert_eq!(err.kind_name(), "aggregate_unavailable");
        assert!(engine.maximum("LEN", xy).is_err());
        assert_eq!(engine.scan_count(), 1);
    }

    #[test]
    fn test_unsupported_and_unknown() {
        let program = program_with(&["A"]);
        let mut registry = MetricRegistry::new();
        name_length(&mut registry);
        let engine = MetricEngine::new(&program, &registry, false);

        let err = engine.value("LEN", EntityRef::Project).unwrap_err();
        assert_eq!(
            err,
            MetricError::Unsupported {
                metric: "Name length".to_string(),
                entity: "project demo".to_string(),
                kind: EntityKind::Project,
                mode: QueryMode::Value,
            }
        );
        assert!(matches!(
            engine.value("NOPE", EntityRef::Project),
            Err(MetricError::UnknownMetric { .. })
        ));
        assert!(matches!(
            engine.value("LEN", EntityRef::Class(ClassId::new(9))),
            Err(MetricError::UnknownEntity { .. })
        ));
        let key = EntityKey::Class {
            name: "p.A".to_string(),
        };
        assert_eq!(engine.value_of("LEN", &key).unwrap(), 1.0);
    }
}

//! Metric definitions and the flat registry table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::{standard, EntityKind, EntityRef, MetricError, MetricResult, QueryMode};
use crate::model::Program;
use crate::resolution::ResolutionStatus;

/// Why a metric body could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct MetricFailure {
    pub reason: String,
}

impl MetricFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        MetricFailure {
            reason: reason.into(),
        }
    }

    pub fn incomplete_resolution(unresolved: u32) -> Self {
        MetricFailure::new(format!(
            "incomplete resolution ({} unresolved reference(s))",
            unresolved
        ))
    }

    pub fn dangling(entity: EntityRef) -> Self {
        MetricFailure::new(format!("no such entity {:?}", entity))
    }
}

/// What a metric body sees while computing one value.
#[derive(Debug, Clone, Copy)]
pub struct MetricContext<'p> {
    pub program: &'p Program,
    /// Coupling-style metrics fail on incomplete resolution when set.
    pub strict: bool,
}

impl MetricContext<'_> {
    /// In strict mode, fail if `status` is incomplete.
    pub fn require_complete(&self, status: ResolutionStatus) -> Result<(), MetricFailure> {
        if self.strict && !status.complete {
            return Err(MetricFailure::incomplete_resolution(status.unresolved));
        }
        Ok(())
    }
}

/// A metric body for one entity kind.
pub type ValueFn =
    Arc<dyn Fn(&MetricContext<'_>, EntityRef) -> Result<f64, MetricFailure> + Send + Sync>;

#[derive(Clone)]
struct KindSlot {
    value: ValueFn,
    /// Whether total and maximum are defined for this kind.
    aggregate: bool,
}

/// A named unit of measurement.
#[derive(Clone)]
pub struct Metric {
    id: String,
    description: String,
    height: bool,
    width: bool,
    slots: BTreeMap<EntityKind, KindSlot>,
}

impl Metric {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Metric {
            id: id.into(),
            description: description.into(),
            height: false,
            width: false,
            slots: BTreeMap::new(),
        }
    }

    /// Set the size-like (height) and spread-like (width) facets.
    pub fn with_facets(mut self, height: bool, width: bool) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    /// Support value, total and maximum for `kind`.
    pub fn with_value<F>(self, kind: EntityKind, f: F) -> Self
    where
        F: Fn(&MetricContext<'_>, EntityRef) -> Result<f64, MetricFailure> + Send + Sync + 'static,
    {
        self.with_slot(kind, Arc::new(f), true)
    }

    /// Support only value queries for `kind`.
    pub fn with_value_only<F>(self, kind: EntityKind, f: F) -> Self
    where
        F: Fn(&MetricContext<'_>, EntityRef) -> Result<f64, MetricFailure> + Send + Sync + 'static,
    {
        self.with_slot(kind, Arc::new(f), false)
    }

    fn with_slot(mut self, kind: EntityKind, value: ValueFn, aggregate: bool) -> Self {
        self.slots.insert(kind, KindSlot { value, aggregate });
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_applicable_to(&self, kind: EntityKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn supports(&self, kind: EntityKind, mode: QueryMode) -> bool {
        match (self.slots.get(&kind), mode) {
            (None, _) => false,
            (Some(_), QueryMode::Value) => true,
            (Some(slot), QueryMode::Total | QueryMode::Maximum) => slot.aggregate,
        }
    }

    /// Kinds with a slot, in [`EntityKind`] order.
    pub fn applicable_kinds(&self) -> Vec<EntityKind> {
        self.slots.keys().copied().collect()
    }

    pub fn suitable_for_height(&self) -> bool {
        self.height
    }

    pub fn suitable_for_width(&self) -> bool {
        self.width
    }

    /// Run the body for `entity`; `None` when its kind has no slot.
    pub(crate) fn compute(
        &self,
        context: &MetricContext<'_>,
        entity: EntityRef,
    ) -> Option<Result<f64, MetricFailure>> {
        self.slots
            .get(&entity.kind())
            .map(|slot| (slot.value)(context, entity))
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("height", &self.height)
            .field("width", &self.width)
            .field("kinds", &self.applicable_kinds())
            .finish()
    }
}

/// Flat table of metrics keyed by id, iterated in registration order.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    metrics: Vec<Metric>,
    index: HashMap<String, usize>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard metric set.
    pub fn standard() -> Self {
        let mut registry = MetricRegistry::new();
        for metric in standard::metrics() {
            let registered = registry.register(metric);
            debug_assert!(registered.is_ok(), "standard metric ids are unique");
        }
        registry
    }

    pub fn register(&mut self, metric: Metric) -> MetricResult<()> {
        if self.index.contains_key(metric.id()) {
            return Err(MetricError::DuplicateMetric {
                id: metric.id().to_string(),
            });
        }
        self.index.insert(metric.id().to_string(), self.metrics.len());
        self.metrics.push(metric);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.index.get(id).map(|i| &self.metrics[*i])
    }

    /// Like [`MetricRegistry::get`] but with a typed error.
    pub fn lookup(&self, id: &str) -> MetricResult<&Metric> {
        self.get(id).ok_or_else(|| MetricError::UnknownMetric { id: id.to_string() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_drive_support() {
        let metric = Metric::new("X", "Example")
            .with_value(EntityKind::Class, |_, _| Ok(1.0))
            .with_value_only(EntityKind::Method, |_, _| Ok(2.0));
        assert!(metric.supports(EntityKind::Class, QueryMode::Total));
        assert!(metric.supports(EntityKind::Method, QueryMode::Value));
        assert!(!metric.supports(EntityKind::Method, QueryMode::Maximum));
        assert!(!metric.is_applicable_to(EntityKind::Field));
        assert_eq!(
            metric.applicable_kinds(),
            vec![EntityKind::Class, EntityKind::Method]
        );
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = MetricRegistry::new();
        registry.register(Metric::new("X", "Example")).unwrap();
        let err = registry.register(Metric::new("X", "Other")).unwrap_err();
        assert_eq!(err, MetricError::DuplicateMetric { id: "X".to_string() });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("X").unwrap().description(), "Example");
        assert!(matches!(
            registry.lookup("Y"),
            Err(MetricError::UnknownMetric { .. })
        ));
    }

    #[test]
    fn test_strict_context_rejects_incomplete() {
        let program = Program::new("demo");
        let mut status = ResolutionStatus::complete();
        status.record_unresolved();
        let lenient = MetricContext {
            program: &program,
            strict: false,
        };
        let strict = MetricContext {
            strict: true,
            ..lenient
        };
        assert!(lenient.require_complete(status).is_ok());
        assert!(strict.require_complete(status).is_err());
        assert!(strict.require_complete(ResolutionStatus::complete()).is_ok());
    }
}

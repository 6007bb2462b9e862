//! The standard metric set.
//!
//! | Id | Kinds | Formula |
//! |---|---|---|
//! | `NOCL` | project, package | in-project classes |
//! | `NOPK` | project | in-project packages |
//! | `NOM` | class | declared methods and constructors |
//! | `NOF` | class | declared fields |
//! | `NOS` | project, package, class, method | statements |
//! | `CBO` | class | distinct other classes referenced |
//! | `RFC` | class | own methods plus methods they invoke |
//! | `LCOM` | class | LCOM4 connected components |
//! | `WMC` | class | sum of `CC` over methods and constructors |
//! | `DIT` | class (value only) | superclass chain length |
//! | `NOC` | class | direct subclasses |
//! | `CC` | method | McCabe: 1 + decision points |
//! | `NOP` | method | parameters |
//! | `FOUT` | method | distinct invoked methods |
//! | `FIA` | field | fields accessed by the initializer |
//! | `NAM` | field | in-project methods accessing the field |
//!
//! `CBO`, `RFC`, `FOUT` and `FIA` honour strict mode.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{EntityKind, EntityRef, Metric, MetricContext, MetricFailure};
use crate::model::{Class, ClassId, ClassKind, Field, Method, Program, VariableRef};

pub const NOCL: &str = "NOCL";
pub const NOPK: &str = "NOPK";
pub const NOM: &str = "NOM";
pub const NOF: &str = "NOF";
pub const NOS: &str = "NOS";
pub const CBO: &str = "CBO";
pub const RFC: &str = "RFC";
pub const LCOM: &str = "LCOM";
pub const WMC: &str = "WMC";
pub const DIT: &str = "DIT";
pub const NOC: &str = "NOC";
pub const CC: &str = "CC";
pub const NOP: &str = "NOP";
pub const FOUT: &str = "FOUT";
pub const FIA: &str = "FIA";
pub const NAM: &str = "NAM";

type Value = Result<f64, MetricFailure>;

pub(crate) fn metrics() -> Vec<Metric> {
    vec![
        Metric::new(NOCL, "Number of classes")
            .with_facets(true, false)
            .with_value(EntityKind::Project, |ctx, _| {
                Ok(in_project_classes(ctx.program).count() as f64)
            })
            .with_value(EntityKind::Package, |ctx, e| {
                let EntityRef::Package(id) = e else {
                    return Err(MetricFailure::dangling(e));
                };
                let package = ctx.program.package(id).ok_or_else(|| MetricFailure::dangling(e))?;
                let count = package
                    .classes
                    .iter()
                    .filter_map(|c| ctx.program.class(*c))
                    .filter(|c| c.is_in_project())
                    .count();
                Ok(count as f64)
            }),
        Metric::new(NOPK, "Number of packages")
            .with_facets(true, false)
            .with_value(EntityKind::Project, |ctx, _| {
                Ok(ctx.program.packages().filter(|p| p.is_in_project()).count() as f64)
            }),
        Metric::new(NOM, "Number of methods")
            .with_facets(true, false)
            .with_value(EntityKind::Class, |ctx, e| {
                let class = class_entity(ctx, e)?;
                Ok(declared_callables(ctx.program, class).count() as f64)
            }),
        Metric::new(NOF, "Number of fields")
            .with_facets(true, false)
            .with_value(EntityKind::Class, |ctx, e| {
                let class = class_entity(ctx, e)?;
                Ok(class.fields.len() as f64)
            }),
        Metric::new(NOS, "Number of statements")
            .with_facets(true, false)
            .with_value(EntityKind::Project, |ctx, _| {
                Ok(in_project_classes(ctx.program)
                    .map(|c| class_statements(ctx.program, c))
                    .sum())
            })
            .with_value(EntityKind::Package, |ctx, e| {
                let EntityRef::Package(id) = e else {
                    return Err(MetricFailure::dangling(e));
                };
                let package = ctx.program.package(id).ok_or_else(|| MetricFailure::dangling(e))?;
                Ok(package
                    .classes
                    .iter()
                    .filter_map(|c| ctx.program.class(*c))
                    .filter(|c| c.is_in_project())
                    .map(|c| class_statements(ctx.program, c))
                    .sum())
            })
            .with_value(EntityKind::Class, |ctx, e| {
                Ok(class_statements(ctx.program, class_entity(ctx, e)?))
            })
            .with_value(EntityKind::Method, |ctx, e| {
                Ok(method_entity(ctx, e)?.stats.statements as f64)
            }),
        Metric::new(CBO, "Coupling between objects")
            .with_facets(false, true)
            .with_value(EntityKind::Class, coupling),
        Metric::new(RFC, "Response for a class")
            .with_facets(false, true)
            .with_value(EntityKind::Class, response),
        Metric::new(LCOM, "Lack of cohesion in methods")
            .with_facets(false, true)
            .with_value(EntityKind::Class, lack_of_cohesion),
        Metric::new(WMC, "Weighted methods per class")
            .with_facets(true, false)
            .with_value(EntityKind::Class, |ctx, e| {
                let class = class_entity(ctx, e)?;
                Ok(declared_callables(ctx.program, class)
                    .map(cyclomatic)
                    .sum())
            }),
        Metric::new(DIT, "Depth of inheritance tree")
            .with_facets(false, true)
            .with_value_only(EntityKind::Class, inheritance_depth),
        Metric::new(NOC, "Number of children")
            .with_facets(false, true)
            .with_value(EntityKind::Class, |ctx, e| {
                let class = class_entity(ctx, e)?;
                Ok(ctx.program.subclasses_of(class.id).len() as f64)
            }),
        Metric::new(CC, "Cyclomatic complexity")
            .with_facets(true, false)
            .with_value(EntityKind::Method, |ctx, e| Ok(cyclomatic(method_entity(ctx, e)?))),
        Metric::new(NOP, "Number of parameters")
            .with_facets(true, false)
            .with_value(EntityKind::Method, |ctx, e| {
                Ok(method_entity(ctx, e)?.stats.parameters as f64)
            }),
        Metric::new(FOUT, "Fan-out")
            .with_facets(false, true)
            .with_value(EntityKind::Method, |ctx, e| {
                let method = method_entity(ctx, e)?;
                ctx.require_complete(method.resolution())?;
                Ok(method.invoked.len() as f64)
            }),
        Metric::new(FIA, "Field initializer accesses")
            .with_facets(false, true)
            .with_value(EntityKind::Field, |ctx, e| {
                let field = field_entity(ctx, e)?;
                ctx.require_complete(field.status)?;
                Ok(field.accessed_fields.len() as f64)
            }),
        Metric::new(NAM, "Number of accessing methods")
            .with_facets(false, true)
            .with_value(EntityKind::Field, |ctx, e| {
                let field = field_entity(ctx, e)?;
                let target = VariableRef::Field(field.id);
                let count = ctx
                    .program
                    .methods()
                    .filter(|m| m.is_in_project() && m.accessed.contains(&target))
                    .count();
                Ok(count as f64)
            }),
    ]
}

// ============================================================================
// Entity access
// ============================================================================

fn class_entity<'p>(ctx: &MetricContext<'p>, entity: EntityRef) -> Result<&'p Class, MetricFailure> {
    match entity {
        EntityRef::Class(id) => ctx.program.class(id),
        _ => None,
    }
    .ok_or_else(|| MetricFailure::dangling(entity))
}

fn method_entity<'p>(ctx: &MetricContext<'p>, entity: EntityRef) -> Result<&'p Method, MetricFailure> {
    match entity {
        EntityRef::Method(id) => ctx.program.method(id),
        _ => None,
    }
    .ok_or_else(|| MetricFailure::dangling(entity))
}

fn field_entity<'p>(ctx: &MetricContext<'p>, entity: EntityRef) -> Result<&'p Field, MetricFailure> {
    match entity {
        EntityRef::Field(id) => ctx.program.field(id),
        _ => None,
    }
    .ok_or_else(|| MetricFailure::dangling(entity))
}

fn in_project_classes(program: &Program) -> impl Iterator<Item = &Class> {
    program.classes().filter(|c| c.is_in_project())
}

fn methods_of<'p>(program: &'p Program, class: &'p Class) -> impl Iterator<Item = &'p Method> {
    class.methods.iter().filter_map(|m| program.method(*m))
}

/// Methods and constructors, initializer blocks excluded.
fn declared_callables<'p>(
    program: &'p Program,
    class: &'p Class,
) -> impl Iterator<Item = &'p Method> {
    methods_of(program, class).filter(|m| m.kind.is_declared_callable())
}

fn class_statements(program: &Program, class: &Class) -> f64 {
    methods_of(program, class)
        .map(|m| m.stats.statements as f64)
        .sum()
}

fn cyclomatic(method: &Method) -> f64 {
    1.0 + method.stats.decision_points as f64
}

// ============================================================================
// Class-level formulas
// ============================================================================

/// Distinct classes referenced through type uses, invocations and field
/// accesses, excluding the class itself and the unknown placeholder.
fn coupling(ctx: &MetricContext<'_>, entity: EntityRef) -> Value {
    let program = ctx.program;
    let class = class_entity(ctx, entity)?;
    ctx.require_complete(program.class_resolution(class.id))?;

    let mut coupled: BTreeSet<ClassId> = class.type_uses.clone();
    for method in methods_of(program, class) {
        coupled.extend(
            method
                .invoked
                .iter()
                .filter_map(|m| program.method(*m))
                .map(|m| m.declaring),
        );
        coupled.extend(
            method
                .accessed
                .iter()
                .filter_map(VariableRef::as_field)
                .filter_map(|f| program.field(f))
                .map(|f| f.declaring),
        );
    }
    for field in class.fields.iter().filter_map(|f| program.field(*f)) {
        coupled.extend(
            field
                .accessed_fields
                .iter()
                .filter_map(|f| program.field(*f))
                .map(|f| f.declaring),
        );
    }
    coupled.remove(&class.id);
    let count = coupled
        .iter()
        .filter_map(|c| program.class(*c))
        .filter(|c| c.kind != ClassKind::Unknown)
        .count();
    Ok(count as f64)
}

fn response(ctx: &MetricContext<'_>, entity: EntityRef) -> Value {
    let program = ctx.program;
    let class = class_entity(ctx, entity)?;
    ctx.require_complete(program.class_resolution(class.id))?;

    let mut response: BTreeSet<_> = declared_callables(program, class).map(|m| m.id).collect();
    for method in methods_of(program, class) {
        response.extend(method.invoked.iter().copied());
    }
    Ok(response.len() as f64)
}

/// LCOM4: connected components of the graph whose nodes are the class's
/// methods and constructors, with an edge between two methods that share an
/// own field or where one calls the other.
fn lack_of_cohesion(ctx: &MetricContext<'_>, entity: EntityRef) -> Value {
    let program = ctx.program;
    let class = class_entity(ctx, entity)?;
    let methods: Vec<&Method> = declared_callables(program, class).collect();
    let position: HashMap<_, _> = methods.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
    let own_fields: HashSet<_> = class.fields.iter().copied().collect();

    let mut components = DisjointSets::new(methods.len());
    let mut field_user = HashMap::new();
    for (i, method) in methods.iter().enumerate() {
        for field in method.accessed.iter().filter_map(VariableRef::as_field) {
            if !own_fields.contains(&field) {
                continue;
            }
            let first = *field_user.entry(field).or_insert(i);
            components.union(first, i);
        }
        for callee in &method.invoked {
            if let Some(j) = position.get(callee) {
                components.union(i, *j);
            }
        }
    }
    Ok(components.count() as f64)
}

/// Superclass chain length. An external superclass counts once and ends the
/// chain; a class without a declared superclass has depth 0.
fn inheritance_depth(ctx: &MetricContext<'_>, entity: EntityRef) -> Value {
    let program = ctx.program;
    let class = class_entity(ctx, entity)?;
    let mut seen = HashSet::from([class.id]);
    let mut depth = 0;
    let mut current = class;
    while let Some(parent) = current.superclass.and_then(|id| program.class(id)) {
        if !seen.insert(parent.id) {
            return Err(MetricFailure::new("cyclic inheritance"));
        }
        depth += 1;
        if !parent.is_in_project() {
            break;
        }
        current = parent;
    }
    Ok(depth as f64)
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        DisjointSets {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[b] = a;
        }
    }

    fn count(&mut self) -> usize {
        (0..self.parent.len()).filter(|i| self.find(*i) == *i).count()
    }
}

//! AccessCollector: variables read or written by a method or initializer body.
//!
//! Records fields (including enum constants), parameters and locals as
//! [`VariableRef`]s. With dependence variables enabled it also records the
//! synthetic variables a dependence graph needs:
//!
//! - formal-in, one per parameter of the method
//! - formal-out, for every `return` with a value
//! - actual-in, one per argument of each resolved call
//! - actual-out, for each resolved call that yields a value

use strata_ast::visitor::{walk_block, VisitResult, Visitor};
use strata_ast::{
    Expr, Initializer, LocalDecl, MethodBinding, MethodDecl, Stmt, TypeDecl, VariableBinding,
};

use super::{Collected, Resolver};
use crate::model::{MethodId, SyntheticKind, SyntheticOwner, SyntheticVariable, VariableRef};

/// Collects variable accesses of one body.
pub struct AccessCollector<'r, 'p> {
    resolver: &'r Resolver<'p>,
    method: MethodId,
    dependence_variables: bool,
    collected: Collected<VariableRef>,
}

impl<'r, 'p> AccessCollector<'r, 'p> {
    /// `method` owns the locals that parameter and local bindings resolve against.
    pub fn new(resolver: &'r Resolver<'p>, method: MethodId, dependence_variables: bool) -> Self {
        AccessCollector {
            resolver,
            method,
            dependence_variables,
            collected: Collected::default(),
        }
    }

    pub fn collect_method(&mut self, decl: &MethodDecl) {
        if self.dependence_variables {
            for slot in 0..decl.params.len() {
                self.synthetic(SyntheticKind::FormalIn, slot, SyntheticOwner::Method(self.method));
            }
        }
        if let Some(body) = &decl.body {
            walk_block(self, body);
        }
    }

    pub fn collect_initializer(&mut self, init: &Initializer) {
        walk_block(self, &init.body);
    }

    pub fn result(self) -> Collected<VariableRef> {
        self.collected
    }

    fn record(&mut self, binding: Option<&VariableBinding>) {
        let Some(binding) = binding else {
            self.collected.unresolved();
            return;
        };
        if binding.is_field_like() {
            if let Some(field) = self.resolver.resolve_field(binding) {
                self.collected.insert(VariableRef::Field(field));
            }
            return;
        }
        match self.resolver.resolve_local(self.method, binding) {
            Some(local) => self.collected.insert(VariableRef::Local(local)),
            None => self.collected.unresolved(),
        }
    }

    fn record_call(&mut self, binding: Option<&MethodBinding>, args: usize) {
        if !self.dependence_variables {
            return;
        }
        let Some(binding) = binding else {
            return;
        };
        let target = SyntheticOwner::Method(self.resolver.resolve_method(binding));
        for slot in 0..args {
            self.synthetic(SyntheticKind::ActualIn, slot, target);
        }
        if binding.returns_value() {
            self.synthetic(SyntheticKind::ActualOut, 0, target);
        }
    }

    fn synthetic(&mut self, kind: SyntheticKind, slot: usize, owner: SyntheticOwner) {
        self.collected
            .insert(VariableRef::Synthetic(SyntheticVariable {
                kind,
                slot: slot as u32,
                owner,
            }));
    }
}

impl<'ast> Visitor<'ast> for AccessCollector<'_, '_> {
    fn visit_type_decl(&mut self, _node: &'ast TypeDecl) -> VisitResult {
        VisitResult::SkipChildren
    }

    fn visit_stmt(&mut self, node: &'ast Stmt) -> VisitResult {
        if let Stmt::Return { value: Some(_) } = node {
            if self.dependence_variables {
                self.synthetic(SyntheticKind::FormalOut, 0, SyntheticOwner::Method(self.method));
            }
        }
        VisitResult::Continue
    }

    fn visit_local_decl(&mut self, node: &'ast LocalDecl) -> VisitResult {
        // An initialized declaration writes the local.
        if node.initializer.is_some() {
            self.record(node.binding.as_ref());
        }
        VisitResult::Continue
    }

    fn visit_expr(&mut self, node: &'ast Expr) -> VisitResult {
        match node {
            Expr::Name { binding, .. } | Expr::FieldAccess { binding, .. } => {
                self.record(binding.as_ref());
            }
            Expr::Call { binding, args, .. }
            | Expr::ConstructorCall { binding, args, .. }
            | Expr::New { binding, args, .. } => {
                self.record_call(binding.as_ref(), args.len());
            }
            _ => {}
        }
        VisitResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::test_support::*;
    use crate::intern::IdentityCache;
    use crate::model::AccessKind;
    use strata_ast::{Member, VariableKind};

    fn counter_units(body: Vec<Stmt>) -> Vec<strata_ast::CompilationUnit> {
        let count = strata_ast::FieldDecl {
            name: "count".to_string(),
            ty: strata_ast::TypeRef::resolved("int", strata_ast::TypeBinding::primitive("int")),
            binding: Some(VariableBinding::field("p.Counter", "count")),
            is_static: false,
            initializer: None,
        };
        let add = method("p.Counter", "add", vec![int_param("step")], body);
        vec![unit(
            "p",
            vec![class_decl(
                "p",
                "Counter",
                vec![Member::Field(count), Member::Method(add)],
            )],
        )]
    }

    fn run(units: &[strata_ast::CompilationUnit], dependence: bool) -> Collected<VariableRef> {
        let program = build(units);
        let cache = IdentityCache::for_program(&program);
        let resolver = Resolver::new(&program, &cache);
        let class = program.class_by_name("p.Counter").unwrap();
        let add = program.method_in(class, "add(int)").unwrap();
        let mut collector = AccessCollector::new(&resolver, add, dependence);
        match &units[0].types[0].members[1] {
            Member::Method(decl) => collector.collect_method(decl),
            other => panic!("unexpected member {:?}", other),
        }
        collector.result()
    }

    fn assign_count_plus_step() -> Stmt {
        Stmt::Expr {
            expr: Expr::Assign {
                target: Box::new(field_name("p.Counter", "count")),
                op: Some("+=".to_string()),
                value: Box::new(local_name("step", VariableKind::Parameter)),
            },
        }
    }

    #[test]
    fn test_access_field_and_parameter() {
        let units = counter_units(vec![assign_count_plus_step()]);
        let result = run(&units, false);
        let kinds: Vec<_> = result.targets.iter().map(|v| v.access_kind()).collect();
        assert_eq!(kinds, vec![AccessKind::Field, AccessKind::Local]);
        assert!(result.is_complete());
    }

    #[test]
    fn test_access_unknown_local_is_incomplete() {
        let units = counter_units(vec![Stmt::Expr {
            expr: local_name("ghost", VariableKind::Local),
        }]);
        let result = run(&units, false);
        assert!(result.targets.is_empty());
        assert!(!result.is_complete());
    }

    #[test]
    fn test_access_array_length_is_not_a_reference() {
        let mut length = VariableBinding::field("ignored", "length");
        length.declaring_class = None;
        let units = counter_units(vec![Stmt::Expr {
            expr: Expr::FieldAccess {
                target: Some(Box::new(local_name("step", VariableKind::Parameter))),
                name: "length".to_string(),
                binding: Some(length),
            },
        }]);
        let result = run(&units, false);
        assert_eq!(result.targets.len(), 1);
        assert!(result.is_complete());
    }

    #[test]
    fn test_access_dependence_variables() {
        let units = counter_units(vec![
            assign_count_plus_step(),
            Stmt::Return {
                value: Some(field_name("p.Counter", "count")),
            },
        ]);
        let plain = run(&units, false);
        let with_dependence = run(&units, true);
        let synthetic: Vec<_> = with_dependence
            .targets
            .iter()
            .filter_map(|v| match v {
                VariableRef::Synthetic(s) => Some(s.kind),
                _ => None,
            })
            .collect();
        assert_eq!(synthetic, vec![SyntheticKind::FormalIn, SyntheticKind::FormalOut]);
        assert_eq!(with_dependence.targets.len(), plain.targets.len() + 2);
    }
}

//! FieldInitializerCollector: fields accessed from a field's own initializer.

use strata_ast::visitor::{walk_expr, VisitResult, Visitor};
use strata_ast::{Expr, FieldDecl, TypeDecl};

use super::{Collected, Resolver};
use crate::model::FieldId;

/// Collects field-to-field accesses of one initializer expression.
pub struct FieldInitializerCollector<'r, 'p> {
    resolver: &'r Resolver<'p>,
    collected: Collected<FieldId>,
}

impl<'r, 'p> FieldInitializerCollector<'r, 'p> {
    pub fn new(resolver: &'r Resolver<'p>) -> Self {
        FieldInitializerCollector {
            resolver,
            collected: Collected::default(),
        }
    }

    /// Walk the initializer of `decl`; fields without one yield an empty, complete result.
    pub fn collect(&mut self, decl: &FieldDecl) {
        if let Some(init) = &decl.initializer {
            walk_expr(self, init);
        }
    }

    pub fn result(self) -> Collected<FieldId> {
        self.collected
    }
}

impl<'ast> Visitor<'ast> for FieldInitializerCollector<'_, '_> {
    fn visit_type_decl(&mut self, _node: &'ast TypeDecl) -> VisitResult {
        VisitResult::SkipChildren
    }

    fn visit_expr(&mut self, node: &'ast Expr) -> VisitResult {
        if let Expr::Name { binding, .. } | Expr::FieldAccess { binding, .. } = node {
            match binding {
                None => self.collected.unresolved(),
                Some(binding) if binding.is_field_like() => {
                    if let Some(field) = self.resolver.resolve_field(binding) {
                        self.collected.insert(field);
                    }
                }
                // Lambda parameters inside the initializer.
                Some(_) => {}
            }
        }
        VisitResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::test_support::*;
    use crate::intern::IdentityCache;
    use strata_ast::{Member, TypeBinding, TypeRef, VariableBinding};

    fn int_field(name: &str, initializer: Option<Expr>) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            ty: TypeRef::resolved("int", TypeBinding::primitive("int")),
            binding: Some(VariableBinding::field("p.Limits", name)),
            is_static: true,
            initializer,
        }
    }

    #[test]
    fn test_field_initializer_reads_sibling_and_external_fields() {
        let init = Expr::Binary {
            op: "+".to_string(),
            lhs: Box::new(field_name("p.Limits", "base")),
            rhs: Box::new(field_name("java.lang.Integer", "MAX_VALUE")),
        };
        let units = vec![unit(
            "p",
            vec![class_decl(
                "p",
                "Limits",
                vec![
                    Member::Field(int_field("base", Some(Expr::literal("1")))),
                    Member::Field(int_field("top", Some(init))),
                ],
            )],
        )];
        let program = build(&units);
        let cache = IdentityCache::for_program(&program);
        let resolver = Resolver::new(&program, &cache);

        let Member::Field(top) = &units[0].types[0].members[1] else {
            panic!("expected field");
        };
        let mut collector = FieldInitializerCollector::new(&resolver);
        collector.collect(top);
        let result = collector.result();

        let limits = program.class_by_name("p.Limits").unwrap();
        let base = program.field_in(limits, "base").unwrap();
        assert_eq!(result.targets.len(), 2);
        assert!(result.targets.contains(&base));
        assert!(result.is_complete());
    }

    #[test]
    fn test_field_initializer_unresolved_name() {
        let units = vec![unit(
            "p",
            vec![class_decl(
                "p",
                "Limits",
                vec![Member::Field(int_field(
                    "top",
                    Some(Expr::name("mystery", None)),
                ))],
            )],
        )];
        let program = build(&units);
        let cache = IdentityCache::for_program(&program);
        let resolver = Resolver::new(&program, &cache);
        let Member::Field(top) = &units[0].types[0].members[0] else {
            panic!("expected field");
        };
        let mut collector = FieldInitializerCollector::new(&resolver);
        collector.collect(top);
        let result = collector.result();
        assert!(result.targets.is_empty());
        assert_eq!(result.status.unresolved, 1);
    }
}

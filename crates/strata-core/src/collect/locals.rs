//! LocalDeclarationCollector: variables a method declares.
//!
//! Enumerates formal parameters, local declarations, `for`-each variables,
//! catch parameters and lambda parameters. Declarations whose binding
//! denotes a field or enum constant are not locals and are skipped. This
//! collector runs during the declaration phase: locals are owned nodes of
//! their method and must exist before references to them are resolved.

use std::collections::HashSet;

use strata_ast::visitor::{walk_block, VisitResult, Visitor};
use strata_ast::{
    Initializer, LocalDecl, MethodDecl, Param, TypeBinding, TypeDecl, TypeRef, VariableBinding,
};

use super::Collected;

/// A declared local, keyed the way access bindings look it up.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalInfo {
    pub key: String,
    pub name: String,
    pub type_name: String,
    pub type_binding: Option<TypeBinding>,
    pub is_parameter: bool,
}

/// Collects the locals of one method or initializer.
#[derive(Default)]
pub struct LocalDeclarationCollector {
    seen: HashSet<String>,
    collected: Collected<LocalInfo>,
}

impl LocalDeclarationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect parameters and body locals of a method.
    pub fn collect_method(&mut self, decl: &MethodDecl) {
        for param in &decl.params {
            self.declare(param.binding.as_ref(), &param.name, &param.ty, true);
        }
        if let Some(body) = &decl.body {
            walk_block(self, body);
        }
    }

    pub fn collect_initializer(&mut self, init: &Initializer) {
        walk_block(self, &init.body);
    }

    pub fn result(self) -> Collected<LocalInfo> {
        self.collected
    }

    fn declare(
        &mut self,
        binding: Option<&VariableBinding>,
        name: &str,
        ty: &TypeRef,
        is_parameter: bool,
    ) {
        let key = match binding {
            Some(binding) if binding.is_field_like() => return,
            Some(binding) => binding.local_key().to_string(),
            None => {
                self.collected.unresolved();
                name.to_string()
            }
        };
        // First declaration wins for keys the front-end did not disambiguate.
        if !self.seen.insert(key.clone()) {
            return;
        }
        let type_name = ty
            .binding
            .as_ref()
            .map(|b| b.qualified_name.clone())
            .unwrap_or_else(|| ty.name.clone());
        self.collected.insert(LocalInfo {
            key,
            name: name.to_string(),
            type_name,
            type_binding: ty.binding.clone(),
            is_parameter,
        });
    }
}

impl<'ast> Visitor<'ast> for LocalDeclarationCollector {
    fn visit_type_decl(&mut self, _node: &'ast TypeDecl) -> VisitResult {
        VisitResult::SkipChildren
    }

    fn visit_local_decl(&mut self, node: &'ast LocalDecl) -> VisitResult {
        self.declare(node.binding.as_ref(), &node.name, &node.ty, false);
        VisitResult::Continue
    }

    // Only catch and lambda parameters are reached by the walk.
    fn visit_param(&mut self, node: &'ast Param) -> VisitResult {
        self.declare(node.binding.as_ref(), &node.name, &node.ty, false);
        VisitResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::test_support::*;
    use strata_ast::{Block, CatchClause, Expr, Stmt, VariableKind};

    fn local(name: &str, binding: Option<VariableBinding>) -> Stmt {
        Stmt::Local(LocalDecl {
            name: name.to_string(),
            ty: TypeRef::resolved("String", TypeBinding::class("java.lang.String")),
            binding,
            initializer: Some(Expr::literal("\"\"")),
        })
    }

    fn names(collected: &Collected<LocalInfo>) -> Vec<(String, bool)> {
        collected
            .targets
            .iter()
            .map(|l| (l.name.clone(), l.is_parameter))
            .collect()
    }

    #[test]
    fn test_locals_params_body_and_catch() {
        let catch = Stmt::Try {
            body: Block::new(vec![]),
            catches: vec![CatchClause {
                param: int_param("e"),
                body: Block::new(vec![]),
            }],
            finally: None,
        };
        let decl = method(
            "p.A",
            "run",
            vec![int_param("count")],
            vec![
                local("text", Some(VariableBinding::local("text", VariableKind::Local))),
                catch,
            ],
        );
        let mut collector = LocalDeclarationCollector::new();
        collector.collect_method(&decl);
        let result = collector.result();
        assert_eq!(
            names(&result),
            vec![
                ("count".to_string(), true),
                ("e".to_string(), false),
                ("text".to_string(), false)
            ]
        );
        assert!(result.is_complete());
    }

    #[test]
    fn test_locals_skip_field_bindings_and_dedupe_keys() {
        let decl = method(
            "p.A",
            "run",
            vec![],
            vec![
                local("x", Some(VariableBinding::local("x", VariableKind::Local))),
                local("x", Some(VariableBinding::local("x", VariableKind::Local))),
                local("f", Some(VariableBinding::field("p.A", "f"))),
                local("y", None),
            ],
        );
        let mut collector = LocalDeclarationCollector::new();
        collector.collect_method(&decl);
        let result = collector.result();
        assert_eq!(
            names(&result),
            vec![("x".to_string(), false), ("y".to_string(), false)]
        );
        assert_eq!(result.status.unresolved, 1);
    }
}

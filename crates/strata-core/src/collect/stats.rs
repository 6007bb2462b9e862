//! StatsCollector: size and complexity counts for one body.
//!
//! Statements are counted once each, blocks excluded. Decision points follow
//! McCabe: `if`, `while`, `do`, `for`, `for`-each, each non-default `case`
//! label, each `catch`, `?:`, `&&` and `||`.

use strata_ast::visitor::{walk_block, VisitResult, Visitor};
use strata_ast::{CatchClause, Expr, Initializer, MethodDecl, Stmt, SwitchCase, TypeDecl};

use crate::model::MethodStats;

#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: MethodStats,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect_method(&mut self, decl: &MethodDecl) {
        self.stats.parameters = decl.params.len() as u32;
        if let Some(body) = &decl.body {
            walk_block(self, body);
        }
    }

    pub fn collect_initializer(&mut self, init: &Initializer) {
        walk_block(self, &init.body);
    }

    pub fn result(self) -> MethodStats {
        self.stats
    }
}

impl<'ast> Visitor<'ast> for StatsCollector {
    fn visit_type_decl(&mut self, _node: &'ast TypeDecl) -> VisitResult {
        VisitResult::SkipChildren
    }

    fn visit_stmt(&mut self, node: &'ast Stmt) -> VisitResult {
        if !matches!(node, Stmt::Block { .. }) {
            self.stats.statements += 1;
        }
        if matches!(
            node,
            Stmt::If { .. }
                | Stmt::While { .. }
                | Stmt::DoWhile { .. }
                | Stmt::For { .. }
                | Stmt::ForEach { .. }
        ) {
            self.stats.decision_points += 1;
        }
        VisitResult::Continue
    }

    fn visit_switch_case(&mut self, node: &'ast SwitchCase) -> VisitResult {
        self.stats.decision_points += node.labels.len() as u32;
        VisitResult::Continue
    }

    fn visit_catch_clause(&mut self, _node: &'ast CatchClause) -> VisitResult {
        self.stats.decision_points += 1;
        VisitResult::Continue
    }

    fn visit_expr(&mut self, node: &'ast Expr) -> VisitResult {
        match node {
            Expr::Conditional { .. } => self.stats.decision_points += 1,
            Expr::Binary { op, .. } if op == "&&" || op == "||" => {
                self.stats.decision_points += 1
            }
            _ => {}
        }
        VisitResult::Continue
    }
}

//! Resolution-status tracking.
//!
//! Every collector run yields a [`ResolutionStatus`] next to its reference
//! set. The builder stores it on the member the collector ran for; nothing
//! downstream is allowed to drop it. A [`ResolutionReport`] summarizes the
//! statuses of a finished [`Program`] for callers that want to warn about
//! reduced confidence in specific metric values.

use serde::{Deserialize, Serialize};

use crate::model::{EntityKey, Program};

/// Whether every binding a collector tried to resolve actually resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionStatus {
    /// `true` iff `unresolved == 0`.
    pub complete: bool,
    /// Number of references that failed to resolve.
    pub unresolved: u32,
}

impl Default for ResolutionStatus {
    fn default() -> Self {
        ResolutionStatus::complete()
    }
}

impl ResolutionStatus {
    /// A status with no failures.
    pub fn complete() -> Self {
        ResolutionStatus {
            complete: true,
            unresolved: 0,
        }
    }

    /// Record one failed resolution.
    pub fn record_unresolved(&mut self) {
        self.unresolved = self.unresolved.saturating_add(1);
        self.complete = false;
    }

    /// Combine two statuses; the result is complete only if both are.
    pub fn merge(self, other: ResolutionStatus) -> ResolutionStatus {
        ResolutionStatus {
            complete: self.complete && other.complete,
            unresolved: self.unresolved.saturating_add(other.unresolved),
        }
    }
}

/// A member whose references did not fully resolve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncompleteMember {
    pub entity: EntityKey,
    pub unresolved: u32,
}

/// Summary of resolution completeness across a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionReport {
    /// In-project classes, methods and fields inspected.
    pub members: usize,
    /// Members whose every reference resolved.
    pub complete_members: usize,
    /// Sum of unresolved references across all members.
    pub total_unresolved: u64,
    /// Incomplete members in id order (classes, then methods, then fields).
    pub incomplete: Vec<IncompleteMember>,
}

impl ResolutionReport {
    /// Build the report for a finished program.
    pub fn from_program(program: &Program) -> Self {
        let mut report = ResolutionReport::default();

        let classes = program
            .classes()
            .filter(|c| c.is_in_project())
            .map(|c| (program.class_key(c.id), c.type_use_status));
        let methods = program
            .methods()
            .filter(|m| m.is_in_project())
            .map(|m| (program.method_key(m.id), m.resolution()));
        let fields = program
            .fields()
            .filter(|f| f.is_in_project())
            .map(|f| (program.field_key(f.id), f.status));

        for (entity, status) in classes.chain(methods).chain(fields) {
            report.members += 1;
            report.total_unresolved += u64::from(status.unresolved);
            if status.complete {
                report.complete_members += 1;
            } else {
                report.incomplete.push(IncompleteMember {
                    entity,
                    unresolved: status.unresolved,
                });
            }
        }
        report
    }

    /// Whether every inspected member resolved completely.
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_complete() {
        let status = ResolutionStatus::default();
        assert!(status.complete);
        assert_eq!(status.unresolved, 0);
    }

    #[test]
    fn record_unresolved_clears_flag() {
        let mut status = ResolutionStatus::complete();
        status.record_unresolved();
        status.record_unresolved();
        assert!(!status.complete);
        assert_eq!(status.unresolved, 2);
    }

    #[test]
    fn merge_is_conjunctive() {
        let mut failed = ResolutionStatus::complete();
        failed.record_unresolved();
        let merged = ResolutionStatus::complete().merge(failed);
        assert!(!merged.complete);
        assert_eq!(merged.unresolved, 1);
        assert!(ResolutionStatus::complete()
            .merge(ResolutionStatus::complete())
            .complete);
    }
}

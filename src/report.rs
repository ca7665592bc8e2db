// src/report.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    assignment::Assignment,
    attempt::AttemptSummary,
    employee::EmployeeRef,
};

/// One row of `GET /assignments/my-report`: an assignment joined with the
/// signed-in employee's attempts at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub assignment_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cutoff: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub attempts: Vec<AttemptSummary>,
}

impl ReportEntry {
    pub fn current_attempt(&self) -> Option<&AttemptSummary> {
        current_attempt(&self.attempts)
    }

    pub fn status(&self) -> AssignmentStatus {
        AssignmentStatus::from_attempts(&self.attempts)
    }
}

/// One row of the admin report for a single assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentReportRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeRef>,
    #[serde(default)]
    pub attempts: Vec<AttemptSummary>,
}

impl AssignmentReportRow {
    pub fn status(&self) -> AssignmentStatus {
        AssignmentStatus::from_attempts(&self.attempts)
    }
}

/// `GET /assignments/status/{employeeId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStatus {
    #[serde(default)]
    pub completed_assignments: Vec<Assignment>,
    #[serde(default)]
    pub remaining_assignments: Vec<Assignment>,
}

/// The attempt that defines the current status: highest `attemptNumber`,
/// ties broken by the latest `submittedAt`.
pub fn current_attempt(attempts: &[AttemptSummary]) -> Option<&AttemptSummary> {
    attempts
        .iter()
        .max_by(|a, b| {
            a.attempt_number
                .cmp(&b.attempt_number)
                .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        })
}

/// Newest first, for the attempt history table.
pub fn sorted_attempts(attempts: &[AttemptSummary]) -> Vec<&AttemptSummary> {
    let mut sorted: Vec<&AttemptSummary> = attempts.iter().collect();
    sorted.sort_by(|a, b| {
        b.attempt_number
            .cmp(&a.attempt_number)
            .then_with(|| b.submitted_at.cmp(&a.submitted_at))
    });
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AssignmentStatus {
    NotAttempted,
    #[serde(rename_all = "camelCase")]
    Passed { attempt_number: u32, score: f64 },
    #[serde(rename_all = "camelCase")]
    Failed { attempt_number: u32, score: f64 },
}

impl AssignmentStatus {
    pub fn from_attempts(attempts: &[AttemptSummary]) -> Self {
        match current_attempt(attempts) {
            None => AssignmentStatus::NotAttempted,
            Some(a) if a.passed => AssignmentStatus::Passed {
                attempt_number: a.attempt_number,
                score: a.score,
            },
            Some(a) => AssignmentStatus::Failed {
                attempt_number: a.attempt_number,
                score: a.score,
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, AssignmentStatus::Passed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssignmentStatus::NotAttempted => "Not attempted",
            AssignmentStatus::Passed { .. } => "Passed",
            AssignmentStatus::Failed { .. } => "Failed",
        }
    }
}

/// Per-assignment status cache, keyed by assignment id.
///
/// The cache is derived data: every `my-report` fetch rebuilds it wholesale
/// and bumps the generation. A copy restored from storage starts
/// unvalidated and answers nothing until it is confirmed against the
/// current generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCache {
    generation: u64,
    entries: BTreeMap<String, AssignmentStatus>,
    #[serde(skip)]
    validated: bool,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rebuild(&mut self, report: &[ReportEntry]) {
        self.entries = report
            .iter()
            .map(|entry| (entry.assignment_id.clone(), entry.status()))
            .collect();
        self.generation += 1;
        self.validated = true;
        tracing::debug!(generation = self.generation, entries = self.entries.len(), "Status cache rebuilt");
    }

    /// True when this copy was built for `generation`.
    pub fn is_fresh_for(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Marks a restored copy as trusted if it matches `generation`.
    pub fn confirm(&mut self, generation: u64) -> bool {
        self.validated = self.is_fresh_for(generation);
        self.validated
    }

    /// Status for an assignment. Unvalidated caches return `None`.
    pub fn get(&self, assignment_id: &str) -> Option<&AssignmentStatus> {
        if !self.validated {
            return None;
        }
        self.entries.get(assignment_id)
    }

    /// Reads an entry regardless of validation, for diagnostics.
    pub fn peek(&self, assignment_id: &str) -> Option<&AssignmentStatus> {
        self.entries.get(assignment_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// src/handlers/my_assignments.rs

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::handlers::busy::{BusyFlag, Generation};
use crate::handlers::exam::ExamSession;
use crate::report::{AssignmentStatus, ReportEntry, StatusCache};

#[derive(Debug, Default)]
struct MyAssignmentsState {
    report: Vec<ReportEntry>,
    cache: StatusCache,
}

/// The employee's "my assignments" screen.
#[derive(Clone)]
pub struct MyAssignments {
    api: ApiClient,
    state: Arc<RwLock<MyAssignmentsState>>,
    loading: BusyFlag,
    generation: Generation,
}

impl MyAssignments {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(MyAssignmentsState::default())),
            loading: BusyFlag::new("Loading report"),
            generation: Generation::new(),
        }
    }

    /// Loads `my-report` and rebuilds the status cache from it. Returns
    /// `false` if the screen was left before the response arrived.
    pub async fn refresh(&self) -> Result<bool, AppError> {
        let _guard = self.loading.try_begin()?;
        let ticket = self.generation.issue();
        let report = self.api.my_report().await?;

        let Some(report) = self.generation.accept(ticket, report) else {
            return Ok(false);
        };
        let mut state = self.state.write().await;
        state.cache.rebuild(&report);
        state.report = report;
        Ok(true)
    }

    pub fn leave(&self) {
        self.generation.invalidate();
    }

    pub async fn report(&self) -> Vec<ReportEntry> {
        self.state.read().await.report.clone()
    }

    /// Status from the cache; `NotAttempted` for assignments the report
    /// does not list.
    pub async fn status(&self, assignment_id: &str) -> AssignmentStatus {
        self.state
            .read()
            .await
            .cache
            .get(assignment_id)
            .cloned()
            .unwrap_or(AssignmentStatus::NotAttempted)
    }

    pub async fn cache(&self) -> StatusCache {
        self.state.read().await.cache.clone()
    }

    /// Starts a sitting of one assignment. Call [`MyAssignments::refresh`]
    /// after submitting to pick up the new attempt.
    pub async fn start(&self, assignment_id: &str) -> Result<ExamSession, AppError> {
        ExamSession::start(self.api.clone(), assignment_id).await
    }
}

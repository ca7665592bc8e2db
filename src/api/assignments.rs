// src/api/assignments.rs

use reqwest::Method;

use super::{ApiClient, require_id, saved_record};
use crate::error::AppError;
use crate::models::{
    assignment::{Assignment, SaveAssignmentRequest},
    attempt::{Attempt, AttemptResult, SubmitAttemptRequest},
};
use crate::normalize::{
    decode_assignment, decode_attempt, decode_employee_status, decode_list, decode_report_entry,
    decode_report_row, unwrap_record,
};
use crate::report::{AssignmentReportRow, EmployeeStatus, ReportEntry};

impl ApiClient {
    /// `GET /assignments` (admin list).
    pub async fn list_assignments(&self) -> Result<Vec<Assignment>, AppError> {
        let value = self.get(&["assignments"]).await?;
        decode_list(value, Some("assignments"), decode_assignment)
    }

    /// `GET /assignments/available`: what the signed-in employee may take.
    pub async fn available_assignments(&self) -> Result<Vec<Assignment>, AppError> {
        let value = self.get(&["assignments", "available"]).await?;
        decode_list(value, Some("assignments"), decode_assignment)
    }

    pub async fn get_assignment(&self, id: &str) -> Result<Assignment, AppError> {
        let id = require_id(id, "assignment")?;
        let value = self.get(&["assignments", id]).await?;
        decode_assignment(unwrap_record(value, "assignment"))
    }

    pub async fn create_assignment(
        &self,
        payload: &SaveAssignmentRequest,
    ) -> Result<Option<Assignment>, AppError> {
        let value = self.send_json(Method::POST, &["assignments"], payload).await?;
        tracing::info!(title = %payload.title, "Assignment created");
        saved_record(value, "assignment", decode_assignment)
    }

    pub async fn update_assignment(
        &self,
        id: &str,
        payload: &SaveAssignmentRequest,
    ) -> Result<Option<Assignment>, AppError> {
        let id = require_id(id, "assignment")?;
        let value = self.send_json(Method::PUT, &["assignments", id], payload).await?;
        tracing::info!(id, "Assignment updated");
        saved_record(value, "assignment", decode_assignment)
    }

    pub async fn delete_assignment(&self, id: &str) -> Result<(), AppError> {
        let id = require_id(id, "assignment")?;
        self.delete(&["assignments", id]).await?;
        tracing::info!(id, "Assignment deleted");
        Ok(())
    }

    /// `GET /assignments/my-report`.
    pub async fn my_report(&self) -> Result<Vec<ReportEntry>, AppError> {
        let value = self.get(&["assignments", "my-report"]).await?;
        decode_list(value, Some("report"), decode_report_entry)
    }

    /// `GET /assignments/{id}/attempts` (admin).
    pub async fn assignment_attempts(&self, id: &str) -> Result<Vec<Attempt>, AppError> {
        let id = require_id(id, "assignment")?;
        let value = self.get(&["assignments", id, "attempts"]).await?;
        decode_list(value, Some("attempts"), decode_attempt)
    }

    /// `GET /assignments/{id}/submissions` (admin): every submitted attempt,
    /// with the employee populated.
    pub async fn assignment_submissions(&self, id: &str) -> Result<Vec<Attempt>, AppError> {
        let id = require_id(id, "assignment")?;
        let value = self.get(&["assignments", id, "submissions"]).await?;
        decode_list(value, Some("submissions"), decode_attempt)
    }

    /// `GET /assignments/{id}/report` (admin).
    pub async fn assignment_report(&self, id: &str) -> Result<Vec<AssignmentReportRow>, AppError> {
        let id = require_id(id, "assignment")?;
        let value = self.get(&["assignments", id, "report"]).await?;
        decode_list(value, Some("report"), decode_report_row)
    }

    /// `GET /assignments/status/{employeeId}` (admin).
    pub async fn employee_status(&self, employee_id: &str) -> Result<EmployeeStatus, AppError> {
        let employee_id = require_id(employee_id, "employee")?;
        let value = self.get(&["assignments", "status", employee_id]).await?;
        if value.is_null() {
            return Ok(EmployeeStatus::default());
        }
        decode_employee_status(value)
    }

    /// `POST /assignments/{id}/attempt`. Grading happens on the server.
    pub async fn submit_attempt(
        &self,
        id: &str,
        payload: &SubmitAttemptRequest,
    ) -> Result<AttemptResult, AppError> {
        let id = require_id(id, "assignment")?;
        let value = self
            .send_json(Method::POST, &["assignments", id, "attempt"], payload)
            .await?;
        let result: AttemptResult = serde_json::from_value(value)
            .map_err(|e| AppError::Decode(format!("attempt result: {e}")))?;
        tracing::info!(id, score = result.score, passed = result.passed, "Attempt submitted");
        Ok(result)
    }
}

// src/handlers/exam.rs

use chrono::Utc;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::attempt::{AnswerSheet, AttemptResult, build_payload, grade_locally, progress};
use crate::models::question::{AnswerValue, Question, QuestionKind};

/// One sitting of an assignment: answers in progress and, once submitted,
/// the server's verdict.
///
/// Methods take `&mut self`, so a submit cannot overlap another submit or
/// an answer change on the same sitting.
pub struct ExamSession {
    api: ApiClient,
    assignment: Assignment,
    sheet: AnswerSheet,
    result: Option<AttemptResult>,
}

impl ExamSession {
    /// Fetches the full assignment (with questions) and starts empty.
    /// Assignments past their due date cannot be started.
    pub async fn start(api: ApiClient, assignment_id: &str) -> Result<Self, AppError> {
        let assignment = api.get_assignment(assignment_id).await?;
        if let Some(due) = assignment.due_date.filter(|_| assignment.is_past_due(Utc::now())) {
            tracing::warn!(id = %assignment.id, %due, "Refused to start a past-due assignment");
            return Err(AppError::Unavailable(format!(
                "'{}' closed on {}",
                assignment.title,
                due.format("%Y-%m-%d %H:%M")
            )));
        }
        tracing::info!(id = %assignment.id, questions = assignment.questions.len(), "Exam started");
        Ok(Self::with_assignment(api, assignment))
    }

    pub fn with_assignment(api: ApiClient, assignment: Assignment) -> Self {
        Self {
            api,
            assignment,
            sheet: AnswerSheet::new(),
            result: None,
        }
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn sheet(&self) -> &AnswerSheet {
        &self.sheet
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    fn question(&self, question_id: &str) -> Result<&Question, AppError> {
        self.assignment
            .questions
            .iter()
            .find(|q| q.id.as_deref() == Some(question_id))
            .ok_or_else(|| AppError::Validation(format!("Unknown question '{question_id}'")))
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.is_submitted() {
            Err(AppError::Validation("This attempt has already been submitted".to_string()))
        } else {
            Ok(())
        }
    }

    /// Records an answer using the input style of the question's kind:
    /// a single option, a set of options or free text.
    pub fn answer(&mut self, question_id: &str, answer: AnswerValue) -> Result<(), AppError> {
        self.ensure_open()?;
        let kind = self.question(question_id)?.kind;
        match (kind, answer) {
            (QuestionKind::Maq, AnswerValue::Single(option)) => {
                self.sheet.toggle(question_id, &option, true);
            }
            (QuestionKind::Maq, multiple) => self.sheet.set(question_id, multiple),
            (QuestionKind::ShortAnswer | QuestionKind::Blank, value) => {
                self.sheet.write(question_id, value.as_text());
            }
            (_, value) => self.sheet.select(question_id, value.as_text()),
        }
        Ok(())
    }

    /// Checkbox change on an MAQ question.
    pub fn toggle(&mut self, question_id: &str, option: &str, checked: bool) -> Result<(), AppError> {
        self.ensure_open()?;
        self.question(question_id)?;
        self.sheet.toggle(question_id, option, checked);
        Ok(())
    }

    pub fn progress(&self) -> u8 {
        progress(&self.assignment.questions, &self.sheet)
    }

    /// Questions with no usable answer yet, in display order.
    pub fn unanswered(&self) -> Vec<&Question> {
        self.assignment
            .questions
            .iter()
            .filter(|q| {
                !q.id
                    .as_deref()
                    .and_then(|id| self.sheet.get(id))
                    .is_some_and(AnswerValue::is_answered)
            })
            .collect()
    }

    /// What the current answers would score, without submitting.
    pub fn preview(&self) -> AttemptResult {
        grade_locally(&self.assignment, &build_payload(&self.assignment.questions, &self.sheet), 0)
    }

    /// Sends the answers. The first successful result is final for this
    /// sitting; call [`ExamSession::new_attempt`] to start over.
    pub async fn submit(&mut self) -> Result<AttemptResult, AppError> {
        self.ensure_open()?;
        let payload = build_payload(&self.assignment.questions, &self.sheet);
        let result = self.api.submit_attempt(&self.assignment.id, &payload).await?;
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Clears the answers and the previous result.
    pub fn new_attempt(&mut self) {
        self.sheet.clear();
        self.result = None;
    }
}

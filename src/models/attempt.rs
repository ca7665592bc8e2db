// src/models/attempt.rs

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::assignment::Assignment;
use crate::models::employee::EmployeeRef;
use crate::models::question::{AnswerValue, Question, QuestionKind};

/// One stored attempt, as listed by `GET /assignments/{id}/attempts`.
/// Never mutated on the client after it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,

    /// Populated employee object, or a bare id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeRef>,

    /// Server-assigned, increasing per (employee, assignment).
    pub attempt_number: u32,

    #[serde(default)]
    pub answers: Vec<AttemptAnswer>,

    #[serde(default)]
    pub score: f64,

    #[serde(default)]
    pub passed: bool,

    #[serde(default, alias = "completedAt", skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Attempt {
    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary {
            attempt_number: self.attempt_number,
            score: self.score,
            passed: self.passed,
            submitted_at: self.submitted_at,
        }
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| &a.answer)
    }
}

/// The slim attempt shape embedded in report entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt_number: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub passed: bool,
    #[serde(default, alias = "completedAt", skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswer {
    pub question_id: String,
    pub answer: AnswerValue,
}

/// Body of `POST /assignments/{id}/attempt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AttemptAnswer>,
}

/// Grading result returned by the backend after a submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub attempt_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Answers the user has entered so far, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet {
    answers: BTreeMap<String, AnswerValue>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Radio selection for MCQ / TrueFalse.
    pub fn select(&mut self, question_id: &str, option: &str) {
        self.answers
            .insert(question_id.to_string(), AnswerValue::Single(option.to_string()));
    }

    /// Checkbox change for MAQ: checking adds the option once, unchecking
    /// removes it.
    pub fn toggle(&mut self, question_id: &str, option: &str, checked: bool) {
        let entry = self
            .answers
            .entry(question_id.to_string())
            .or_insert_with(|| AnswerValue::Multiple(Vec::new()));
        let mut current = entry.to_set();
        if checked {
            if !current.iter().any(|v| v == option) {
                current.push(option.to_string());
            }
        } else {
            current.retain(|v| v != option);
        }
        *entry = AnswerValue::Multiple(current);
    }

    /// Free text for ShortAnswer / Blank.
    pub fn write(&mut self, question_id: &str, text: &str) {
        self.answers
            .insert(question_id.to_string(), AnswerValue::Single(text.to_string()));
    }

    pub fn set(&mut self, question_id: &str, answer: AnswerValue) {
        self.answers.insert(question_id.to_string(), answer);
    }
}

/// Canonical wire form of one answer for the given question kind.
pub fn canonical_answer(kind: QuestionKind, raw: &AnswerValue) -> AnswerValue {
    match kind {
        QuestionKind::Maq => {
            let mut seen = HashSet::new();
            let cleaned = raw
                .to_set()
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && seen.insert(v.clone()))
                .collect();
            AnswerValue::Multiple(cleaned)
        }
        QuestionKind::ShortAnswer | QuestionKind::Blank => {
            AnswerValue::Single(raw.as_text().trim().to_lowercase())
        }
        QuestionKind::Mcq | QuestionKind::TrueFalse => {
            AnswerValue::Single(raw.as_text().trim().to_string())
        }
    }
}

fn is_empty_answer(answer: &AnswerValue) -> bool {
    match answer {
        AnswerValue::Single(s) => s.is_empty(),
        AnswerValue::Multiple(values) => values.is_empty(),
    }
}

/// Builds the submit body. Unanswered questions are left out entirely
/// rather than sent as empty values.
pub fn build_payload(questions: &[Question], sheet: &AnswerSheet) -> SubmitAttemptRequest {
    let answers = questions
        .iter()
        .filter_map(|q| {
            let id = q.id.as_deref()?;
            let answer = canonical_answer(q.kind, sheet.get(id)?);
            (!is_empty_answer(&answer)).then(|| AttemptAnswer {
                question_id: id.to_string(),
                answer,
            })
        })
        .collect();

    SubmitAttemptRequest { answers }
}

/// Percentage of answered questions, rounded to the nearest integer.
pub fn progress(questions: &[Question], sheet: &AnswerSheet) -> u8 {
    if questions.is_empty() {
        return 0;
    }
    let answered = questions
        .iter()
        .filter(|q| {
            q.id.as_deref()
                .and_then(|id| sheet.get(id))
                .is_some_and(AnswerValue::is_answered)
        })
        .count();
    ((answered as f64 / questions.len() as f64) * 100.0).round() as u8
}

/// Offline preview of what the backend will award: full marks for each
/// accepted answer, `passed` when the score reaches the cutoff.
pub fn grade_locally(
    assignment: &Assignment,
    payload: &SubmitAttemptRequest,
    previous_attempts: u32,
) -> AttemptResult {
    let score: f64 = assignment
        .questions
        .iter()
        .filter_map(|q| {
            let id = q.id.as_deref()?;
            let given = payload.answers.iter().find(|a| a.question_id == id)?;
            q.accepts(&given.answer).then_some(q.marks.max(0.0))
        })
        .sum();

    AttemptResult {
        score,
        passed: score >= assignment.cutoff,
        attempt_number: previous_attempts + 1,
        message: None,
    }
}

/// Admin attempts search over employee name, email, score and
/// "passed"/"failed".
pub fn filter_attempts<'a>(attempts: &'a [Attempt], search: &str) -> Vec<&'a Attempt> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return attempts.iter().collect();
    }
    attempts
        .iter()
        .filter(|t| {
            let (name, email) = match &t.employee {
                Some(EmployeeRef::Populated(e)) => (
                    e.name.to_lowercase(),
                    e.email.as_deref().unwrap_or_default().to_lowercase(),
                ),
                _ => (String::new(), String::new()),
            };
            let status = if t.passed { "passed" } else { "failed" };
            name.contains(&needle)
                || email.contains(&needle)
                || t.score.to_string().contains(&needle)
                || status.contains(&needle)
        })
        .collect()
}

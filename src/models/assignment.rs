// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::question::Question;

/// An assignment as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Minimum score for an attempt to pass.
    #[serde(default)]
    pub cutoff: f64,

    /// Insertion order is display order.
    #[serde(default)]
    pub questions: Vec<Question>,

    /// As stored by the server. Use [`Assignment::computed_total_marks`] for
    /// anything the client derives.
    #[serde(default)]
    pub total_marks: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,

    /// Exam guidelines shown before an attempt starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
}

impl Assignment {
    pub fn computed_total_marks(&self) -> f64 {
        total_marks(&self.questions)
    }

    pub fn is_past_due(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.due_date.is_some_and(|due| due < now)
    }
}

/// Sum of every question's marks. Always recomputed, never cached.
pub fn total_marks(questions: &[Question]) -> f64 {
    questions.iter().map(|q| q.marks.max(0.0)).sum()
}

/// Case-insensitive title/description search used by the admin list.
pub fn filter_assignments<'a>(assignments: &'a [Assignment], search: &str) -> Vec<&'a Assignment> {
    let needle = search.trim().to_lowercase();
    assignments
        .iter()
        .filter(|a| {
            needle.is_empty()
                || a.title.to_lowercase().contains(&needle)
                || a.description.to_lowercase().contains(&needle)
        })
        .collect()
}

/// The in-progress edit buffer behind the create/update dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentForm {
    pub title: String,
    pub description: String,
    /// `None` while the field is empty.
    pub cutoff: Option<f64>,
    pub questions: Vec<Question>,
}

impl Default for AssignmentForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentForm {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            cutoff: None,
            questions: vec![Question::blank()],
        }
    }

    pub fn from_assignment(assignment: &Assignment) -> Self {
        let questions = if assignment.questions.is_empty() {
            vec![Question::blank()]
        } else {
            assignment.questions.clone()
        };
        Self {
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            cutoff: assignment.cutoff.is_finite().then_some(assignment.cutoff),
            questions,
        }
    }

    pub fn total_marks(&self) -> f64 {
        total_marks(&self.questions)
    }

    pub fn add_question(&mut self) {
        self.questions.push(Question::blank());
    }

    pub fn remove_question(&mut self, index: usize) {
        if index < self.questions.len() {
            self.questions.remove(index);
        }
    }

    pub fn question_mut(&mut self, index: usize) -> Option<&mut Question> {
        self.questions.get_mut(index)
    }

    /// Validates the buffer and produces the create/update body.
    /// The buffer itself is left untouched so a failed save can be retried.
    pub fn to_request(&self) -> Result<SaveAssignmentRequest, AppError> {
        let cutoff = self
            .cutoff
            .ok_or_else(|| AppError::Validation("Cutoff is required".to_string()))?;

        let request = SaveAssignmentRequest {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            cutoff,
            total_marks: self.total_marks(),
            questions: self.questions.clone(),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Body of `POST /assignments` and `PUT /assignments/{id}`.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveAssignmentRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Cutoff cannot be negative"))]
    pub cutoff: f64,

    pub questions: Vec<Question>,

    pub total_marks: f64,
}

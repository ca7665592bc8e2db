// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The fixed option list of a true/false question.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// Question type, serialized under the JSON key `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Single choice.
    #[serde(rename = "MCQ")]
    Mcq,
    /// Multiple answers.
    #[serde(rename = "MAQ")]
    Maq,
    TrueFalse,
    ShortAnswer,
    /// Fill in the blank.
    Blank,
}

impl QuestionKind {
    pub fn has_options(self) -> bool {
        matches!(self, QuestionKind::Mcq | QuestionKind::Maq | QuestionKind::TrueFalse)
    }

    pub fn is_free_text(self) -> bool {
        matches!(self, QuestionKind::ShortAnswer | QuestionKind::Blank)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "MCQ" => Some(QuestionKind::Mcq),
            "MAQ" => Some(QuestionKind::Maq),
            "TrueFalse" => Some(QuestionKind::TrueFalse),
            "ShortAnswer" => Some(QuestionKind::ShortAnswer),
            "Blank" => Some(QuestionKind::Blank),
            _ => None,
        }
    }
}

/// An answer value: a single string (MCQ, TrueFalse, ShortAnswer, Blank)
/// or a set of strings (MAQ).
///
/// Used both for a question's `correctAnswer` and for a submitted answer,
/// since the backend expects the two in the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl Default for AnswerValue {
    fn default() -> Self {
        AnswerValue::Single(String::new())
    }
}

impl AnswerValue {
    /// Lifts any answer to a list: a non-empty scalar becomes a one-element list.
    pub fn to_set(&self) -> Vec<String> {
        match self {
            AnswerValue::Single(s) if s.is_empty() => Vec::new(),
            AnswerValue::Single(s) => vec![s.clone()],
            AnswerValue::Multiple(values) => values.clone(),
        }
    }

    /// Scalar view. A list collapses to its first element.
    pub fn as_text(&self) -> &str {
        match self {
            AnswerValue::Single(s) => s,
            AnswerValue::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        match self {
            AnswerValue::Single(s) => s == value,
            AnswerValue::Multiple(values) => values.iter().any(|v| v == value),
        }
    }

    /// "Answered" in the progress sense: a non-empty list, or a scalar that is
    /// not blank after trimming.
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Single(s) => !s.trim().is_empty(),
            AnswerValue::Multiple(values) => !values.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub text: String,

    #[serde(rename = "type")]
    pub kind: QuestionKind,

    /// Empty for ShortAnswer and Blank, `["True","False"]` for TrueFalse.
    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default)]
    pub correct_answer: AnswerValue,

    #[serde(default = "default_marks")]
    pub marks: f64,
}

fn default_marks() -> f64 {
    1.0
}

impl Question {
    /// The question a fresh editor row starts with.
    pub fn blank() -> Self {
        Self {
            id: None,
            text: String::new(),
            kind: QuestionKind::Mcq,
            options: vec![String::new()],
            correct_answer: AnswerValue::default(),
            marks: default_marks(),
        }
    }

    /// Switches the question type and resets options / correct answer to
    /// what the new type allows.
    pub fn change_type(&mut self, kind: QuestionKind) {
        let previous = std::mem::take(&mut self.correct_answer).to_set();
        self.kind = kind;

        match kind {
            QuestionKind::TrueFalse => {
                self.options = TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect();
                self.correct_answer = AnswerValue::Single(TRUE_FALSE_OPTIONS[0].to_string());
            }
            QuestionKind::Mcq => {
                self.seed_options();
                self.correct_answer = AnswerValue::Single(self.options[0].clone());
            }
            QuestionKind::Maq => {
                self.seed_options();
                let mut seen = HashSet::new();
                let kept = previous
                    .into_iter()
                    .filter(|a| self.options.contains(a) && seen.insert(a.clone()))
                    .collect();
                self.correct_answer = AnswerValue::Multiple(kept);
            }
            QuestionKind::ShortAnswer | QuestionKind::Blank => {
                self.options.clear();
                self.correct_answer = AnswerValue::default();
            }
        }
    }

    fn seed_options(&mut self) {
        if self.options.is_empty() {
            self.options.push(String::new());
        }
    }

    /// Appends one empty option. TrueFalse options are fixed.
    pub fn add_option(&mut self) {
        if matches!(self.kind, QuestionKind::Mcq | QuestionKind::Maq) {
            self.options.push(String::new());
        }
    }

    /// Edits an option's text. A correct answer pointing at the old text
    /// follows the edit.
    pub fn update_option(&mut self, index: usize, value: impl Into<String>) {
        if !matches!(self.kind, QuestionKind::Mcq | QuestionKind::Maq) {
            return;
        }
        let Some(slot) = self.options.get_mut(index) else {
            return;
        };
        let value = value.into();
        let old = std::mem::replace(slot, value.clone());

        match &mut self.correct_answer {
            AnswerValue::Single(s) if *s == old => *s = value,
            AnswerValue::Multiple(values) => {
                for v in values.iter_mut().filter(|v| **v == old) {
                    *v = value.clone();
                }
                let mut seen = HashSet::new();
                values.retain(|v| seen.insert(v.clone()));
            }
            _ => {}
        }
    }

    /// Removes the option at `index` and repairs the correct answer so it
    /// never references a value that is no longer an option.
    pub fn remove_option(&mut self, index: usize) {
        if !matches!(self.kind, QuestionKind::Mcq | QuestionKind::Maq) || index >= self.options.len() {
            return;
        }
        self.options.remove(index);

        match self.kind {
            QuestionKind::Maq => {
                let kept = self
                    .correct_answer
                    .to_set()
                    .into_iter()
                    .filter(|a| self.options.contains(a))
                    .collect();
                self.correct_answer = AnswerValue::Multiple(kept);
            }
            _ => {
                let current = self.correct_answer.as_text().to_string();
                if !self.options.contains(&current) {
                    self.correct_answer =
                        AnswerValue::Single(self.options.first().cloned().unwrap_or_default());
                }
            }
        }
    }

    /// MAQ: toggles `value` in the correct-answer set.
    /// MCQ / TrueFalse: replaces the correct answer.
    /// ShortAnswer / Blank: no-op, see [`Question::set_answer_text`].
    pub fn set_correct_answer(&mut self, value: &str) {
        match self.kind {
            QuestionKind::Maq => {
                let mut set = self.correct_answer.to_set();
                if let Some(pos) = set.iter().position(|v| v == value) {
                    set.remove(pos);
                } else {
                    set.push(value.to_string());
                }
                self.correct_answer = AnswerValue::Multiple(set);
            }
            QuestionKind::Mcq | QuestionKind::TrueFalse => {
                self.correct_answer = AnswerValue::Single(value.to_string());
            }
            QuestionKind::ShortAnswer | QuestionKind::Blank => {}
        }
    }

    /// The direct text field used by ShortAnswer / Blank.
    pub fn set_answer_text(&mut self, value: impl Into<String>) {
        if self.kind.is_free_text() {
            self.correct_answer = AnswerValue::Single(value.into());
        }
    }

    pub fn set_marks(&mut self, marks: f64) {
        self.marks = if marks.is_finite() && marks > 0.0 { marks } else { 0.0 };
    }

    /// Whether a submitted answer earns this question's marks, using the same
    /// comparison rules the backend applies.
    pub fn accepts(&self, answer: &AnswerValue) -> bool {
        match self.kind {
            QuestionKind::Mcq | QuestionKind::TrueFalse => {
                let expected = self.correct_answer.as_text().trim();
                !expected.is_empty() && answer.as_text().trim() == expected
            }
            QuestionKind::ShortAnswer | QuestionKind::Blank => {
                let expected = self.correct_answer.as_text().trim().to_lowercase();
                !expected.is_empty() && answer.as_text().trim().to_lowercase() == expected
            }
            QuestionKind::Maq => {
                let expected: HashSet<String> = self
                    .correct_answer
                    .to_set()
                    .iter()
                    .map(|v| v.trim().to_string())
                    .collect();
                let given: HashSet<String> = answer
                    .to_set()
                    .iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                !expected.is_empty() && expected == given
            }
        }
    }
}

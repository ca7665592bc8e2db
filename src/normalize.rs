// src/normalize.rs

//! Decode step between raw backend JSON and the typed records.
//!
//! The backend is inconsistent about shapes: list fields sometimes arrive as
//! JSON-encoded strings (and sometimes double-encoded), numbers as strings,
//! booleans as "true"/"1", references as bare ids, ids as `id` instead of
//! `_id`. Every repair lives here so call sites only ever see typed records or
//! an explicit [`AppError::Decode`].
//!
//! All functions are pure and idempotent: decoding the serialized output of a
//! decode yields the same record.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{
    assignment::Assignment,
    attempt::{Attempt, AttemptSummary},
    blog::{Author, Blog, BlockKind, ContentBlock},
    employee::Employee,
    question::{AnswerValue, Question, QuestionKind, TRUE_FALSE_OPTIONS},
};
use crate::report::{AssignmentReportRow, EmployeeStatus, ReportEntry};

static OBJECT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^[a-f0-9]{24}$").unwrap());

/// A 24-character hex token, i.e. an unresolved database reference.
pub fn looks_like_object_id(value: &str) -> bool {
    OBJECT_ID.is_match(value.trim())
}

/// `true`, `"true"`, `"1"`, `"yes"`, `"y"` (any case) are true; everything
/// else, including null, is false.
pub fn parse_boolean_like(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y"),
        Value::Number(n) => n.to_string() == "1",
        _ => false,
    }
}

/// Numbers pass through, numeric strings are parsed, anything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Repairs a list-of-strings field (`tags`, `metaKeywords`, ...).
///
/// * arrays are kept;
/// * a string holding a JSON array of strings is parsed; any other string
///   becomes a single-element list;
/// * the legacy double encoding `["[\"a\",\"b\"]"]` is unwrapped, at any
///   depth;
/// * items are trimmed, blank and non-string items dropped.
///
/// Only arrays of strings count as an encoded list, so a tag such as
/// `"[2024]"` survives as written and the result is a fixed point.
pub fn normalize_string_list(value: &Value) -> Vec<String> {
    let mut list = match value {
        Value::Array(items) => clean_strings(items),
        Value::String(raw) => match string_array(raw) {
            Some(items) => clean_strings(&items),
            None => clean_strings(std::slice::from_ref(value)),
        },
        _ => return Vec::new(),
    };

    loop {
        let inner = match list.as_slice() {
            [only] => string_array(only),
            _ => None,
        };
        let Some(inner) = inner else {
            break;
        };
        tracing::debug!("Unwrapped double-encoded string list");
        list = clean_strings(&inner);
    }
    list
}

/// `raw` parsed as a JSON array whose items are all strings.
fn string_array(raw: &str) -> Option<Vec<Value>> {
    let raw = raw.trim();
    if !raw.starts_with('[') {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) if items.iter().all(Value::is_string) => Some(items),
        _ => None,
    }
}

fn clean_strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Option lists keep blank entries (an editor row may still be empty) and
/// stringify scalars.
fn normalize_options(value: &Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items.clone(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            _ => return vec![raw.clone()],
        },
        _ => return Vec::new(),
    };
    items.iter().filter_map(scalar_to_string).collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        _ => None,
    }
}

/// Reads an author reference.
///
/// A populated object is kept; a bare string is a name unless it looks like
/// an id. A name that is missing, equal to the id or itself id-shaped leaves
/// the author unresolved (`name: None`).
pub fn normalize_author(value: &Value) -> Option<Author> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                None
            } else if looks_like_object_id(raw) {
                Some(Author { id: Some(raw.to_string()), ..Author::default() })
            } else {
                Some(Author { name: Some(raw.to_string()), ..Author::default() })
            }
        }
        Value::Object(map) => {
            let id = map
                .get("_id")
                .or_else(|| map.get("id"))
                .and_then(scalar_to_string)
                .filter(|s| !s.trim().is_empty());
            let name = map
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty() && Some(*n) != id.as_deref() && !looks_like_object_id(n))
                .map(str::to_string);
            let profile_image = map
                .get("profileImage")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);
            Some(Author { id, name, profile_image })
        }
        _ => None,
    }
}

/// Accepts RFC 3339, naive date-times (assumed UTC), plain dates and epoch
/// milliseconds. Returns `None` for anything else.
pub fn normalize_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                return Some(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn expect_object(value: Value, what: &str) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Decode(format!("expected {what} object, got {}", kind_of(&other)))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn finish<T: DeserializeOwned>(map: Map<String, Value>, what: &str) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| AppError::Decode(format!("{what}: {e}")))
}

/// `_id` is canonical. `id` is moved into it when `_id` is absent and
/// dropped otherwise; numeric ids become strings.
fn normalize_id(map: &mut Map<String, Value>) {
    let alias = map.remove("id");
    let id = map.remove("_id").or(alias).and_then(|v| match v {
        Value::Object(inner) => inner.get("$oid").and_then(scalar_to_string),
        other => scalar_to_string(&other),
    });
    if let Some(id) = id.filter(|s| !s.trim().is_empty()) {
        map.insert("_id".to_string(), Value::String(id));
    }
}

fn require_id(map: &Map<String, Value>, what: &str) -> Result<(), AppError> {
    if map.contains_key("_id") {
        Ok(())
    } else {
        Err(AppError::Decode(format!("{what} is missing an id")))
    }
}

fn set_number(map: &mut Map<String, Value>, key: &str, min: Option<f64>) {
    let Some(raw) = map.remove(key) else {
        return;
    };
    if let Some(mut n) = coerce_number(&raw) {
        if let Some(min) = min {
            n = n.max(min);
        }
        map.insert(key.to_string(), Value::from(n));
    }
}

fn set_bool(map: &mut Map<String, Value>, key: &str) {
    if let Some(raw) = map.remove(key) {
        if !raw.is_null() {
            map.insert(key.to_string(), Value::Bool(parse_boolean_like(&raw)));
        }
    }
}

fn set_timestamp(map: &mut Map<String, Value>, key: &str) {
    if let Some(raw) = map.remove(key) {
        if let Some(ts) = normalize_timestamp(&raw) {
            map.insert(key.to_string(), Value::String(ts.to_rfc3339()));
        }
    }
}

fn set_string_list(map: &mut Map<String, Value>, key: &str) {
    if let Some(raw) = map.remove(key) {
        let list = normalize_string_list(&raw);
        map.insert(key.to_string(), Value::from(list));
    }
}

/// Keeps `key` only when it holds a non-blank string, trimmed.
fn set_nonblank(map: &mut Map<String, Value>, key: &str) {
    let keep = map
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    map.remove(key);
    if let Some(v) = keep {
        map.insert(key.to_string(), Value::String(v));
    }
}

fn set_text(map: &mut Map<String, Value>, key: &str) {
    if let Some(raw) = map.remove(key) {
        if let Some(text) = scalar_to_string(&raw) {
            map.insert(key.to_string(), Value::String(text));
        }
    }
}

/// Like [`normalize_string_list`] but for arrays of records.
fn record_list(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn correct_answer_for(kind: QuestionKind, raw: Option<&Value>) -> AnswerValue {
    let raw = raw.unwrap_or(&Value::Null);
    match kind {
        QuestionKind::Maq => {
            let values = match raw {
                Value::Array(_) => normalize_options(raw),
                Value::String(s) if s.trim().starts_with('[') => normalize_options(raw),
                other => scalar_to_string(other)
                    .filter(|s| !s.is_empty())
                    .into_iter()
                    .collect(),
            };
            let mut unique: Vec<String> = Vec::with_capacity(values.len());
            for v in values {
                if !unique.contains(&v) {
                    unique.push(v);
                }
            }
            AnswerValue::Multiple(unique)
        }
        QuestionKind::TrueFalse => {
            let text = first_scalar(raw).unwrap_or_default();
            let option = TRUE_FALSE_OPTIONS
                .iter()
                .find(|o| o.eq_ignore_ascii_case(text.trim()))
                .copied()
                .unwrap_or(TRUE_FALSE_OPTIONS[0]);
            AnswerValue::Single(option.to_string())
        }
        _ => AnswerValue::Single(first_scalar(raw).unwrap_or_default()),
    }
}

fn first_scalar(raw: &Value) -> Option<String> {
    match raw {
        Value::Array(items) => items.first().and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

pub fn decode_question(value: Value) -> Result<Question, AppError> {
    let mut map = expect_object(value, "question")?;
    normalize_id(&mut map);

    let kind = match map.get("type") {
        None | Some(Value::Null) => QuestionKind::Mcq,
        Some(Value::String(raw)) => QuestionKind::parse(raw)
            .ok_or_else(|| AppError::Decode(format!("unknown question type '{raw}'")))?,
        Some(other) => {
            return Err(AppError::Decode(format!("question type must be a string, got {}", kind_of(other))));
        }
    };
    map.insert("type".to_string(), serde_json::to_value(kind)?);

    let options = if kind == QuestionKind::TrueFalse {
        TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect()
    } else if kind.is_free_text() {
        Vec::new()
    } else {
        map.get("options").map(normalize_options).unwrap_or_default()
    };
    map.insert("options".to_string(), Value::from(options));

    let answer = correct_answer_for(kind, map.get("correctAnswer"));
    map.insert("correctAnswer".to_string(), serde_json::to_value(answer)?);

    set_text(&mut map, "text");
    set_number(&mut map, "marks", Some(0.0));

    finish(map, "question")
}

pub fn decode_assignment(value: Value) -> Result<Assignment, AppError> {
    let mut map = expect_object(value, "assignment")?;
    normalize_id(&mut map);
    require_id(&map, "assignment")?;

    set_text(&mut map, "title");
    if !map.contains_key("title") {
        map.insert("title".to_string(), Value::String(String::new()));
    }
    set_text(&mut map, "description");
    set_number(&mut map, "cutoff", Some(0.0));
    set_number(&mut map, "totalMarks", Some(0.0));
    set_bool(&mut map, "isActive");
    set_bool(&mut map, "published");
    set_timestamp(&mut map, "dueDate");
    set_string_list(&mut map, "instructions");

    let questions = record_list(map.remove("questions"))
        .into_iter()
        .map(decode_question)
        .collect::<Result<Vec<_>, _>>()?;
    map.insert("questions".to_string(), serde_json::to_value(questions)?);

    finish(map, "assignment")
}

fn decode_block(value: Value, index: usize) -> Result<ContentBlock, AppError> {
    let mut map = expect_object(value, "content block")?;

    let kind = match map.get("type") {
        None | Some(Value::Null) => BlockKind::Paragraph,
        Some(Value::String(raw)) if raw.trim().is_empty() => BlockKind::Paragraph,
        Some(Value::String(raw)) => BlockKind::parse(raw)
            .ok_or_else(|| AppError::Decode(format!("unknown content block type '{raw}'")))?,
        Some(other) => {
            return Err(AppError::Decode(format!("block type must be a string, got {}", kind_of(other))));
        }
    };
    map.insert("type".to_string(), serde_json::to_value(kind)?);

    set_text(&mut map, "content");
    for key in ["url", "language", "level"] {
        set_nonblank(&mut map, key);
    }

    let order = map
        .get("order")
        .and_then(coerce_number)
        .filter(|n| *n >= 1.0)
        .map(|n| n as u32)
        .unwrap_or(index as u32 + 1);
    map.insert("order".to_string(), Value::from(order));

    finish(map, "content block")
}

pub fn decode_blog(value: Value) -> Result<Blog, AppError> {
    let mut map = expect_object(value, "blog")?;
    normalize_id(&mut map);
    require_id(&map, "blog")?;

    set_text(&mut map, "title");
    if !map.contains_key("title") {
        map.insert("title".to_string(), Value::String(String::new()));
    }
    for key in ["slug", "metaTitle", "metaDescription", "category"] {
        set_text(&mut map, key);
    }
    set_string_list(&mut map, "tags");
    set_string_list(&mut map, "metaKeywords");
    set_bool(&mut map, "published");
    set_timestamp(&mut map, "createdAt");

    match map.remove("coverImage") {
        Some(Value::String(url)) if !url.trim().is_empty() => {
            map.insert("coverImage".to_string(), Value::String(url));
        }
        _ => {}
    }

    let blocks = record_list(map.remove("contentBlocks"))
        .into_iter()
        .enumerate()
        .map(|(i, b)| decode_block(b, i))
        .collect::<Result<Vec<_>, _>>()?;
    map.insert("contentBlocks".to_string(), serde_json::to_value(blocks)?);

    let author = map.remove("author").as_ref().and_then(normalize_author);
    if let Some(author) = author {
        map.insert("author".to_string(), serde_json::to_value(author)?);
    }

    finish(map, "blog")
}

pub fn decode_employee(value: Value) -> Result<Employee, AppError> {
    let mut map = expect_object(value, "employee")?;
    normalize_id(&mut map);
    set_text(&mut map, "name");
    finish(map, "employee")
}

/// An attempt's `employee`: a bare id, or a populated record whose
/// `name`/`email` may be null for deleted accounts.
fn normalize_employee_ref(value: &Value) -> Option<Value> {
    match value {
        Value::Object(populated) => {
            let mut map = populated.clone();
            normalize_id(&mut map);
            set_nonblank(&mut map, "name");
            set_nonblank(&mut map, "email");
            Some(Value::Object(map))
        }
        Value::String(_) | Value::Number(_) => scalar_to_string(value)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(Value::String),
        _ => None,
    }
}

/// One submitted answer. Entries without a question id are dropped; the
/// answer itself becomes a string or a list of strings.
fn normalize_answer(value: Value) -> Option<Value> {
    let Value::Object(mut map) = value else {
        return None;
    };
    let question_id = map
        .get("questionId")
        .and_then(scalar_to_string)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let Some(question_id) = question_id else {
        tracing::debug!("Dropped attempt answer without a question id");
        return None;
    };
    let answer = match map.remove("answer") {
        Some(raw @ Value::Array(_)) => Value::from(normalize_options(&raw)),
        Some(raw) => Value::String(scalar_to_string(&raw).unwrap_or_default()),
        None => Value::String(String::new()),
    };
    map.insert("questionId".to_string(), Value::String(question_id));
    map.insert("answer".to_string(), answer);
    Some(Value::Object(map))
}

fn normalize_attempt_fields(map: &mut Map<String, Value>) {
    normalize_id(map);
    let submitted = map.remove("submittedAt").filter(|v| !v.is_null());
    let completed = map.remove("completedAt").filter(|v| !v.is_null());
    if let Some(ts) = submitted.or(completed) {
        map.insert("submittedAt".to_string(), ts);
    }
    set_timestamp(map, "submittedAt");
    set_number(map, "attemptNumber", Some(0.0));
    if let Some(n) = map.get("attemptNumber").and_then(Value::as_f64) {
        map.insert("attemptNumber".to_string(), Value::from(n as u32));
    } else {
        map.insert("attemptNumber".to_string(), Value::from(0u32));
    }
    set_number(map, "score", None);
    set_bool(map, "passed");

    if let Some(raw) = map.remove("employee") {
        if let Some(employee) = normalize_employee_ref(&raw) {
            map.insert("employee".to_string(), employee);
        }
    }

    if let Some(Value::Object(populated)) = map.get("assignmentId") {
        let id = populated.get("_id").and_then(scalar_to_string);
        match id {
            Some(id) => map.insert("assignmentId".to_string(), Value::String(id)),
            None => map.remove("assignmentId"),
        };
    }
}

pub fn decode_attempt(value: Value) -> Result<Attempt, AppError> {
    let mut map = expect_object(value, "attempt")?;
    normalize_attempt_fields(&mut map);
    let answers: Vec<Value> = record_list(map.remove("answers"))
        .into_iter()
        .filter_map(normalize_answer)
        .collect();
    map.insert("answers".to_string(), Value::Array(answers));
    finish(map, "attempt")
}

pub fn decode_attempt_summary(value: Value) -> Result<AttemptSummary, AppError> {
    let mut map = expect_object(value, "attempt")?;
    normalize_attempt_fields(&mut map);
    finish(map, "attempt")
}

pub fn decode_report_entry(value: Value) -> Result<ReportEntry, AppError> {
    let mut map = expect_object(value, "report entry")?;
    if !map.contains_key("assignmentId") {
        if let Some(id) = map.remove("_id").or_else(|| map.remove("id")) {
            map.insert("assignmentId".to_string(), id);
        }
    }
    set_text(&mut map, "assignmentId");
    set_text(&mut map, "title");
    set_text(&mut map, "description");
    set_number(&mut map, "cutoff", Some(0.0));
    set_bool(&mut map, "isActive");

    let attempts = record_list(map.remove("attempts"))
        .into_iter()
        .map(decode_attempt_summary)
        .collect::<Result<Vec<_>, _>>()?;
    map.insert("attempts".to_string(), serde_json::to_value(attempts)?);

    finish(map, "report entry")
}

pub fn decode_report_row(value: Value) -> Result<AssignmentReportRow, AppError> {
    let mut map = expect_object(value, "report row")?;
    let attempts = record_list(map.remove("attempts"))
        .into_iter()
        .map(decode_attempt_summary)
        .collect::<Result<Vec<_>, _>>()?;
    map.insert("attempts".to_string(), serde_json::to_value(attempts)?);
    finish(map, "report row")
}

pub fn decode_employee_status(value: Value) -> Result<EmployeeStatus, AppError> {
    let mut map = expect_object(value, "employee status")?;
    let completed = decode_list(map.remove("completedAssignments").unwrap_or(Value::Null), None, decode_assignment)?;
    let remaining = decode_list(map.remove("remainingAssignments").unwrap_or(Value::Null), None, decode_assignment)?;
    Ok(EmployeeStatus {
        completed_assignments: completed,
        remaining_assignments: remaining,
    })
}

/// Decodes a list response. `null` is an empty list; `{ <envelope>: [...] }`
/// is unwrapped when an envelope key is given.
pub fn decode_list<T>(
    value: Value,
    envelope: Option<&str>,
    decode: impl Fn(Value) -> Result<T, AppError>,
) -> Result<Vec<T>, AppError> {
    let value = match (value, envelope) {
        (Value::Object(mut map), Some(key)) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        (value, _) => value,
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.into_iter().map(decode).collect(),
        other => Err(AppError::Decode(format!("expected a list, got {}", kind_of(&other)))),
    }
}

/// Unwraps `{ <key>: {...} }` single-record envelopes.
pub fn unwrap_record(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.get(key).is_some_and(Value::is_object) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

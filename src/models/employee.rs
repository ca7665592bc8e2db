// src/models/employee.rs

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::normalize::parse_boolean_like;

/// An employee profile, as returned by `/employees` and embedded in the
/// login response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Free-form role, e.g. "admin", "employee".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Sent as a bool by the login endpoint, but older records store it as
    /// "true"/"1"/"yes".
    #[serde(default, deserialize_with = "bool_like")]
    pub is_admin: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

pub(crate) fn bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_boolean_like(&value))
}

impl Employee {
    /// Name to show for this profile: `name`, then `username`.
    pub fn display_name(&self) -> Option<&str> {
        [Some(self.name.as_str()), self.username.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    pub fn has_admin_role(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case("admin"))
    }
}

/// Slim employee shape embedded in attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A reference field that is either populated or still a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmployeeRef {
    Populated(EmployeeSummary),
    Id(String),
}

impl EmployeeRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            EmployeeRef::Populated(e) => e.id.as_deref(),
            EmployeeRef::Id(id) => Some(id),
        }
    }
}

/// DTO for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub employee: Employee,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_admin_accepts_string_flags() {
        let e: Employee = serde_json::from_str(r#"{"_id":"e1","name":"Ravi","isAdmin":"yes"}"#).unwrap();
        assert!(e.is_admin);
        let e: Employee = serde_json::from_str(r#"{"_id":"e1","name":"Ravi","isAdmin":"0"}"#).unwrap();
        assert!(!e.is_admin);
        let e: Employee = serde_json::from_str(r#"{"name":"Ravi"}"#).unwrap();
        assert!(!e.is_admin);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let e = Employee {
            name: " ".to_string(),
            username: Some("ravi.k".to_string()),
            ..Employee::default()
        };
        assert_eq!(e.display_name(), Some("ravi.k"));
        assert_eq!(Employee::default().display_name(), None);
    }

    #[test]
    fn login_request_validation() {
        assert!(LoginRequest::new(" ravi@corp.io ", "pw").validate().is_ok());
        assert!(LoginRequest::new("ravi", "pw").validate().is_err());
        assert!(LoginRequest::new("ravi@corp.io", "").validate().is_err());
    }

    #[test]
    fn employee_ref_variants() {
        let r: EmployeeRef = serde_json::from_str(r#""64b7f0c2a1b2c3d4e5f60718""#).unwrap();
        assert_eq!(r.id(), Some("64b7f0c2a1b2c3d4e5f60718"));
        let r: EmployeeRef = serde_json::from_str(r#"{"_id":"e9","name":"Li"}"#).unwrap();
        assert_eq!(r.id(), Some("e9"));
    }
}

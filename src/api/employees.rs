// src/api/employees.rs

use super::{ApiClient, require_id};
use crate::error::AppError;
use crate::models::employee::Employee;
use crate::normalize::{decode_employee, decode_list, unwrap_record};

impl ApiClient {
    /// `GET /employees`: the roster behind the org chart and the admin
    /// employee picker.
    pub async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let value = self.get(&["employees"]).await?;
        decode_list(value, Some("employees"), decode_employee)
    }

    pub async fn get_employee(&self, id: &str) -> Result<Employee, AppError> {
        let id = require_id(id, "employee")?;
        let value = self.get(&["employees", id]).await?;
        decode_employee(unwrap_record(value, "employee"))
    }
}

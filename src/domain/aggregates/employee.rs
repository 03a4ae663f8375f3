//! Employee Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: EmployeeRole,
    /// Fraction of completed sales paid as commission, `0.05` = 5%.
    pub commission_rate: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole { Owner, Manager, #[default] Seller }

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct EmployeeInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: EmployeeRole,
    #[serde(default)]
    pub commission_rate: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

impl Employee {
    pub fn create(input: &EmployeeInput) -> Result<Self, EmployeeError> {
        let mut employee = Self {
            id: Uuid::now_v7().to_string(), name: String::new(), email: None, phone: None,
            role: EmployeeRole::Seller, commission_rate: Decimal::ZERO, active: true, created_at: Utc::now(),
        };
        employee.update(input)?;
        Ok(employee)
    }

    pub fn update(&mut self, input: &EmployeeInput) -> Result<(), EmployeeError> {
        input.validate().map_err(|e| EmployeeError::Invalid(e.to_string()))?;
        if input.name.trim().is_empty() { return Err(EmployeeError::MissingName); }
        if input.commission_rate < Decimal::ZERO || input.commission_rate > Decimal::ONE {
            return Err(EmployeeError::InvalidCommission);
        }
        self.name = input.name.trim().to_string();
        self.email = input.email.clone();
        self.phone = input.phone.clone();
        self.role = input.role;
        self.commission_rate = input.commission_rate;
        self.active = input.active;
        Ok(())
    }

    pub fn commission_on(&self, sales_total: Money) -> Money { sales_total.scale(self.commission_rate).round() }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmployeeError {
    #[error("Missing name")]
    MissingName,
    #[error("Commission rate must be between 0 and 1")]
    InvalidCommission,
    #[error("Invalid employee: {0}")]
    Invalid(String),
}

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::parse_catalog;
use crate::error::Result;
use crate::vector::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub name: String,
    pub vacation_days: u32,
    pub sick_days: u32,
    pub personal_days: u32,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LeaveLookup {
    Found(LeaveBalance),
    NotFound { error: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// HR FAQ documents plus leave, benefits, holiday and training tables.
#[derive(Debug, Clone, Deserialize)]
pub struct HrCatalog {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub leave_balances: BTreeMap<String, LeaveBalance>,
    /// Nested, free-form plan descriptions keyed by benefit type.
    #[serde(default)]
    pub benefits: serde_json::Map<String, JsonValue>,
    /// Holidays keyed by year.
    #[serde(default)]
    pub holidays: BTreeMap<i32, Vec<Holiday>>,
    #[serde(default)]
    pub training_courses: BTreeMap<String, Vec<String>>,
}

impl HrCatalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json(include_str!("data/hr_assistant.json"))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        parse_catalog(json, "HR assistant")
    }

    pub fn leave_balance(&self, employee_id: &str) -> LeaveLookup {
        match self.leave_balances.get(&employee_id.trim().to_uppercase()) {
            Some(balance) => LeaveLookup::Found(balance.clone()),
            None => LeaveLookup::NotFound {
                error: "Employee not found".to_string(),
                message: "Please check your employee ID or contact HR.".to_string(),
            },
        }
    }

    /// One benefit type, or all of them when `benefit_type` is `None`.
    pub fn benefits(&self, benefit_type: Option<&str>) -> JsonValue {
        match benefit_type {
            Some(kind) => self
                .benefits
                .get(kind)
                .cloned()
                .unwrap_or_else(|| json!({ "error": "Benefit type not found" })),
            None => JsonValue::Object(self.benefits.clone()),
        }
    }

    pub fn holidays(&self, year: i32) -> Vec<Holiday> {
        self.holidays.get(&year).cloned().unwrap_or_default()
    }

    /// Holidays falling inside `start..=end`, in date order.
    pub fn holiday_conflicts(&self, start: NaiveDate, end: NaiveDate) -> Vec<Holiday> {
        let mut conflicts: Vec<Holiday> = self
            .holidays
            .values()
            .flatten()
            .filter(|h| start <= h.date && h.date <= end)
            .cloned()
            .collect();
        conflicts.sort_by_key(|h| h.date);
        conflicts
    }

    /// Courses in `category`, or every course when no category is given.
    /// An unknown category yields an empty list.
    pub fn training(&self, category: Option<&str>) -> Vec<String> {
        match category {
            Some(c) => self.training_courses.get(c).cloned().unwrap_or_default(),
            None => self.training_courses.values().flatten().cloned().collect(),
        }
    }
}

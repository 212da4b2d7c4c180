use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::parse_catalog;
use crate::error::Result;
use crate::vector::Document;

/// Live status of a managed device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub status: String,
    pub details: String,
    pub location: String,
}

impl DeviceStatus {
    /// Returned for device ids that are not in the inventory.
    pub fn unknown() -> Self {
        Self {
            status: "Unknown".to_string(),
            details: "Device not found in system.".to_string(),
            location: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareInfo {
    pub name: String,
    pub version: String,
    pub license_type: String,
    pub approval_required: bool,
    pub install_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SoftwareLookup {
    Found(SoftwareInfo),
    NotFound { name: String, status: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommonIssue {
    pub keywords: Vec<String>,
    pub category: String,
    pub solution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub category: String,
    pub solution: String,
}

/// IT helpdesk FAQ documents plus device, software and troubleshooting tables.
#[derive(Debug, Clone, Deserialize)]
pub struct ItCatalog {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceStatus>,
    #[serde(default)]
    pub software: BTreeMap<String, SoftwareInfo>,
    #[serde(default)]
    pub common_issues: Vec<CommonIssue>,
}

impl ItCatalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json(include_str!("data/it_helpdesk.json"))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        parse_catalog(json, "IT helpdesk")
    }

    pub fn device_status(&self, device_id: &str) -> DeviceStatus {
        self.devices
            .get(device_id)
            .cloned()
            .unwrap_or_else(DeviceStatus::unknown)
    }

    /// Looks software up by name; "Microsoft Office" finds `microsoft_office`.
    pub fn software_info(&self, software_name: &str) -> SoftwareLookup {
        let key = software_name.trim().to_lowercase().replace(' ', "_");
        match self.software.get(&key) {
            Some(info) => SoftwareLookup::Found(info.clone()),
            None => SoftwareLookup::NotFound {
                name: "Software not found".to_string(),
                status: "Not available in catalog".to_string(),
            },
        }
    }

    /// Issues where any keyword occurs inside the issue's joined keyword list.
    pub fn search_solutions(&self, keywords: &[String]) -> Vec<Solution> {
        let needles: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        self.common_issues
            .iter()
            .filter(|issue| {
                let haystack = issue.keywords.join(" ");
                needles.iter().any(|k| haystack.contains(k.as_str()))
            })
            .map(|issue| Solution {
                category: issue.category.clone(),
                solution: issue.solution.clone(),
            })
            .collect()
    }
}

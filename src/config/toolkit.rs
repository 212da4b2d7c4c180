use crate::error::Result;
use crate::knowledge::{HrCatalog, ItCatalog, SupportCatalog, UseCase};
use crate::tools::{Tool, ToolDefinition, ToolLibrary};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Decodes model-supplied arguments into a typed struct.
fn decode<T: DeserializeOwned>(args: JsonValue) -> std::result::Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("invalid arguments: {}", e))
}

fn to_json<T: Serialize>(value: T) -> std::result::Result<JsonValue, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {} (expected YYYY-MM-DD)", raw, e))
}

/// Returns the tool library for `use_case` over the built-in data tables.
pub fn tool_library_for(use_case: UseCase) -> Result<ToolLibrary> {
    Ok(match use_case {
        UseCase::ItHelpdesk => it_helpdesk_tools(Arc::new(ItCatalog::builtin()?)),
        UseCase::CustomerSupport => customer_support_tools(Arc::new(SupportCatalog::builtin()?)),
        UseCase::HrAssistant => hr_assistant_tools(Arc::new(HrCatalog::builtin()?)),
    })
}

// --- IT helpdesk ---

#[derive(Deserialize)]
struct DeviceArgs {
    device_id: String,
}

#[derive(Deserialize)]
struct SoftwareArgs {
    software_name: String,
}

#[derive(Deserialize)]
struct KeywordArgs {
    keywords: Vec<String>,
}

pub fn it_helpdesk_tools(catalog: Arc<ItCatalog>) -> ToolLibrary {
    let mut tool_library = ToolLibrary::new();

    let devices = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "check_device_status",
            "Check the status of IT devices like printers, servers, routers, etc.",
            json!({
                "type": "object",
                "properties": {
                    "device_id": {
                        "type": "string",
                        "description": "The unique identifier of the device (e.g., printer01, server01)"
                    }
                },
                "required": ["device_id"]
            }),
        ),
        move |args| {
            let DeviceArgs { device_id } = decode(args)?;
            let status = devices.device_status(&device_id);
            Ok(json!({
                "device_status": status.status,
                "details": status.details,
                "location": status.location,
                "formatted_response": format!("Device Status: {}. {}", status.status, status.details),
            }))
        },
    ));

    let software = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "get_software_info",
            "Get information about available software, licenses, and installation requirements",
            json!({
                "type": "object",
                "properties": {
                    "software_name": {
                        "type": "string",
                        "description": "Name of the software to look up"
                    }
                },
                "required": ["software_name"]
            }),
        ),
        move |args| {
            let SoftwareArgs { software_name } = decode(args)?;
            to_json(software.software_info(&software_name))
        },
    ));

    tool_library.register(Tool::new(
        ToolDefinition::function(
            "search_it_solutions",
            "Search for IT troubleshooting solutions based on keywords",
            json!({
                "type": "object",
                "properties": {
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keywords related to the IT issue"
                    }
                },
                "required": ["keywords"]
            }),
        ),
        move |args| {
            let KeywordArgs { keywords } = decode(args)?;
            to_json(catalog.search_solutions(&keywords))
        },
    ));

    tool_library
}

// --- Customer support ---

#[derive(Deserialize)]
struct OrderArgs {
    order_id: String,
}

#[derive(Deserialize)]
struct ProductArgs {
    product_name: String,
}

#[derive(Deserialize)]
struct ShippingArgs {
    order_total: f64,
    #[serde(default = "standard_shipping")]
    shipping_type: String,
}

fn standard_shipping() -> String {
    "standard".to_string()
}

pub fn customer_support_tools(catalog: Arc<SupportCatalog>) -> ToolLibrary {
    let mut tool_library = ToolLibrary::new();

    let orders = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "check_order_status",
            "Look up the status, items, tracking number and delivery estimate of a customer order",
            json!({
                "type": "object",
                "properties": {
                    "order_id": {
                        "type": "string",
                        "description": "The order number (e.g., ORD123456)"
                    }
                },
                "required": ["order_id"]
            }),
        ),
        move |args| {
            let OrderArgs { order_id } = decode(args)?;
            to_json(orders.order_status(&order_id))
        },
    ));

    let products = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "get_product_info",
            "Get price, stock availability, description and warranty for a product",
            json!({
                "type": "object",
                "properties": {
                    "product_name": {
                        "type": "string",
                        "description": "Name of the product (e.g., wireless headphones)"
                    }
                },
                "required": ["product_name"]
            }),
        ),
        move |args| {
            let ProductArgs { product_name } = decode(args)?;
            to_json(products.product_info(&product_name))
        },
    ));

    tool_library.register(Tool::new(
        ToolDefinition::function(
            "calculate_shipping_cost",
            "Calculate the shipping cost and delivery time for an order total and shipping type",
            json!({
                "type": "object",
                "properties": {
                    "order_total": {
                        "type": "number",
                        "description": "Order total in dollars"
                    },
                    "shipping_type": {
                        "type": "string",
                        "enum": ["standard", "express", "overnight"],
                        "description": "Shipping speed. Defaults to standard."
                    }
                },
                "required": ["order_total"]
            }),
        ),
        move |args| {
            let ShippingArgs { order_total, shipping_type } = decode(args)?;
            to_json(catalog.calculate_shipping(order_total, &shipping_type))
        },
    ));

    tool_library
}

// --- HR assistant ---

#[derive(Deserialize)]
struct EmployeeArgs {
    employee_id: String,
}

#[derive(Deserialize)]
struct BenefitArgs {
    #[serde(default)]
    benefit_type: Option<String>,
}

#[derive(Deserialize)]
struct YearArgs {
    #[serde(default = "default_holiday_year")]
    year: i32,
}

fn default_holiday_year() -> i32 {
    2025
}

#[derive(Deserialize)]
struct DateRangeArgs {
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct TrainingArgs {
    #[serde(default)]
    category: Option<String>,
}

pub fn hr_assistant_tools(catalog: Arc<HrCatalog>) -> ToolLibrary {
    let mut tool_library = ToolLibrary::new();

    let leave = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "check_leave_balance",
            "Check an employee's remaining vacation, sick and personal days",
            json!({
                "type": "object",
                "properties": {
                    "employee_id": {
                        "type": "string",
                        "description": "The employee ID (e.g., EMP001)"
                    }
                },
                "required": ["employee_id"]
            }),
        ),
        move |args| {
            let EmployeeArgs { employee_id } = decode(args)?;
            to_json(leave.leave_balance(&employee_id))
        },
    ));

    let benefits = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "get_benefits_information",
            "Get details about company benefits such as health, dental and vision insurance or the 401k plan",
            json!({
                "type": "object",
                "properties": {
                    "benefit_type": {
                        "type": "string",
                        "enum": ["health_insurance", "dental_insurance", "vision_insurance", "401k"],
                        "description": "Optional benefit type. Omit to list all benefits."
                    }
                },
                "required": []
            }),
        ),
        move |args| {
            let BenefitArgs { benefit_type } = decode(args)?;
            Ok(benefits.benefits(benefit_type.as_deref()))
        },
    ));

    let holidays = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "get_company_holidays",
            "List the company holidays for a year",
            json!({
                "type": "object",
                "properties": {
                    "year": {
                        "type": "integer",
                        "description": "Calendar year. Defaults to 2025."
                    }
                },
                "required": []
            }),
        ),
        move |args| {
            let YearArgs { year } = decode(args)?;
            let list = holidays.holidays(year);
            Ok(json!({ "year": year, "holidays": to_json(list)? }))
        },
    ));

    let conflicts = Arc::clone(&catalog);
    tool_library.register(Tool::new(
        ToolDefinition::function(
            "check_holiday_conflicts",
            "Check whether a requested leave period overlaps company holidays",
            json!({
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "First day of leave, YYYY-MM-DD"
                    },
                    "end_date": {
                        "type": "string",
                        "description": "Last day of leave, YYYY-MM-DD"
                    }
                },
                "required": ["start_date", "end_date"]
            }),
        ),
        move |args| {
            let DateRangeArgs { start_date, end_date } = decode(args)?;
            let start = parse_date(&start_date)?;
            let end = parse_date(&end_date)?;
            if end < start {
                return Err(format!("end_date {} is before start_date {}", end, start));
            }
            let found = conflicts.holiday_conflicts(start, end);
            Ok(json!({
                "has_conflicts": !found.is_empty(),
                "conflicts": to_json(found)?,
            }))
        },
    ));

    tool_library.register(Tool::new(
        ToolDefinition::function(
            "get_training_courses",
            "List available training courses, optionally filtered by category",
            json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "enum": ["compliance", "professional", "technical"],
                        "description": "Optional course category. Omit to list every course."
                    }
                },
                "required": []
            }),
        ),
        move |args| {
            let TrainingArgs { category } = decode(args)?;
            Ok(json!({ "courses": catalog.training(category.as_deref()) }))
        },
    ));

    tool_library
}

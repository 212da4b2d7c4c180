use chrono::NaiveDate;
use rag_chatbot::config::tool_library_for;
use rag_chatbot::knowledge::{HrCatalog, ItCatalog, SupportCatalog, UseCase};
use serde_json::{json, Value as JsonValue};

fn call(use_case: UseCase, tool: &str, args: JsonValue) -> Result<JsonValue, String> {
    let library = tool_library_for(use_case).unwrap();
    let tool = library.get(tool).unwrap();
    (tool.handler)(args)
}

#[test]
fn every_use_case_ships_documents() {
    for use_case in UseCase::ALL {
        let documents = use_case.documents().unwrap();
        assert!(!documents.is_empty(), "{} has no documents", use_case);
        assert!(documents
            .iter()
            .all(|d| !d.text.trim().is_empty() && d.metadata.contains_key("source")));
    }
}

#[test]
fn use_case_names_round_trip() {
    for use_case in UseCase::ALL {
        assert_eq!(use_case.as_str().parse::<UseCase>().unwrap(), use_case);
    }
    assert_eq!(" HR_Assistant ".parse::<UseCase>().unwrap(), UseCase::HrAssistant);
    assert!("sales".parse::<UseCase>().is_err());
}

#[test]
fn rag_prompt_embeds_context() {
    let prompt = UseCase::CustomerSupport.rag_prompt("Document 1 (Orders - FAQ, relevance: 0.90):\nTrack it.");
    assert!(prompt.starts_with("You are a friendly customer support representative."));
    assert!(prompt.contains("Context from knowledge base:\nDocument 1 (Orders - FAQ, relevance: 0.90):\nTrack it."));
}

#[test]
fn tool_sets_match_use_cases() {
    let names = |u| tool_library_for(u).unwrap().names();
    assert_eq!(
        names(UseCase::ItHelpdesk),
        vec!["check_device_status", "get_software_info", "search_it_solutions"]
    );
    assert_eq!(
        names(UseCase::CustomerSupport),
        vec!["calculate_shipping_cost", "check_order_status", "get_product_info"]
    );
    assert_eq!(
        names(UseCase::HrAssistant),
        vec![
            "check_holiday_conflicts",
            "check_leave_balance",
            "get_benefits_information",
            "get_company_holidays",
            "get_training_courses",
        ]
    );
}

#[test]
fn device_status_tool() {
    let online = call(UseCase::ItHelpdesk, "check_device_status", json!({ "device_id": "printer01" })).unwrap();
    assert_eq!(online["device_status"], "Online");
    assert_eq!(
        online["formatted_response"],
        "Device Status: Online. Functioning normally. Toner at 75%."
    );

    let unknown = call(UseCase::ItHelpdesk, "check_device_status", json!({ "device_id": "nonexistent99" })).unwrap();
    assert_eq!(unknown["device_status"], "Unknown");
    assert_eq!(unknown["location"], "Unknown");
}

#[test]
fn software_lookup_normalizes_names() {
    let catalog = ItCatalog::builtin().unwrap();
    let found = serde_json::to_value(catalog.software_info("Microsoft Office")).unwrap();
    assert!(found.get("version").is_some());

    let missing = serde_json::to_value(catalog.software_info("Photoshop")).unwrap();
    assert_eq!(missing["name"], "Software not found");
}

#[test]
fn solutions_match_keyword_substrings() {
    let catalog = ItCatalog::builtin().unwrap();
    let solutions = catalog.search_solutions(&["Paper Jam".to_string()]);
    assert!(solutions.iter().any(|s| s.category == "Printing"));
    assert!(catalog.search_solutions(&["   ".to_string()]).is_empty());
}

#[test]
fn order_lookup() {
    let found = call(UseCase::CustomerSupport, "check_order_status", json!({ "order_id": "ORD123456" })).unwrap();
    assert_eq!(found["status"], "Shipped");
    assert_eq!(found["tracking"], "1Z999AA1234567890");

    let missing = call(UseCase::CustomerSupport, "check_order_status", json!({ "order_id": "ORD000000" })).unwrap();
    assert_eq!(missing["status"], "Not Found");
}

#[test]
fn product_lookup() {
    let catalog = SupportCatalog::builtin().unwrap();
    let headphones = serde_json::to_value(catalog.product_info("wireless headphones")).unwrap();
    assert_eq!(headphones["name"], "Premium Wireless Headphones");
    assert_eq!(headphones["in_stock"], true);
}

#[test]
fn shipping_is_free_above_threshold() {
    let quote = call(UseCase::CustomerSupport, "calculate_shipping_cost", json!({ "order_total": 75.0 })).unwrap();
    assert_eq!(quote["shipping_type"], "standard");
    assert_eq!(quote["cost"], 0.0);
    assert_eq!(quote["free_shipping_eligible"], true);
    assert_eq!(quote["delivery_time"], "5-7 business days");

    let express = call(
        UseCase::CustomerSupport,
        "calculate_shipping_cost",
        json!({ "order_total": 75.0, "shipping_type": "express" }),
    )
    .unwrap();
    assert_eq!(express["cost"], 9.99);
    assert_eq!(express["free_shipping_eligible"], false);

    let invalid = call(
        UseCase::CustomerSupport,
        "calculate_shipping_cost",
        json!({ "order_total": 10.0, "shipping_type": "teleport" }),
    )
    .unwrap();
    assert_eq!(invalid["error"], "Invalid shipping type");
}

#[test]
fn leave_balance_ignores_id_case() {
    let catalog = HrCatalog::builtin().unwrap();
    let balance = serde_json::to_value(catalog.leave_balance("emp001")).unwrap();
    assert_eq!(balance["name"], "John Smith");
    assert_eq!(balance["vacation_days"], 15);

    let missing = call(UseCase::HrAssistant, "check_leave_balance", json!({ "employee_id": "EMP999" })).unwrap();
    assert_eq!(missing["error"], "Employee not found");
}

#[test]
fn benefits_lookup() {
    let catalog = HrCatalog::builtin().unwrap();
    assert_eq!(catalog.benefits(Some("dental_insurance"))["monthly_premium"], 25);
    assert_eq!(catalog.benefits(Some("pet_insurance"))["error"], "Benefit type not found");
    assert!(catalog.benefits(None).get("401k").is_some());
}

#[test]
fn holidays_default_to_2025() {
    let listed = call(UseCase::HrAssistant, "get_company_holidays", json!({})).unwrap();
    assert_eq!(listed["year"], 2025);
    let holidays = listed["holidays"].as_array().unwrap();
    assert_eq!(holidays.len(), 11);
    assert_eq!(holidays[0]["date"], "2025-01-01");

    let empty = call(UseCase::HrAssistant, "get_company_holidays", json!({ "year": 1999 })).unwrap();
    assert!(empty["holidays"].as_array().unwrap().is_empty());
}

#[test]
fn holiday_conflicts_are_inclusive() {
    let catalog = HrCatalog::builtin().unwrap();
    let date = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

    let thanksgiving = catalog.holiday_conflicts(date("2025-11-27"), date("2025-11-28"));
    let names: Vec<&str> = thanksgiving.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Thanksgiving Day", "Day after Thanksgiving"]);

    let checked = call(
        UseCase::HrAssistant,
        "check_holiday_conflicts",
        json!({ "start_date": "2025-03-01", "end_date": "2025-03-10" }),
    )
    .unwrap();
    assert_eq!(checked["has_conflicts"], false);

    let reversed = call(
        UseCase::HrAssistant,
        "check_holiday_conflicts",
        json!({ "start_date": "2025-12-31", "end_date": "2025-12-01" }),
    );
    assert!(reversed.is_err());

    let malformed = call(
        UseCase::HrAssistant,
        "check_holiday_conflicts",
        json!({ "start_date": "next monday", "end_date": "2025-12-01" }),
    );
    assert!(malformed.unwrap_err().contains("YYYY-MM-DD"));
}

#[test]
fn training_courses_by_category() {
    let technical = call(UseCase::HrAssistant, "get_training_courses", json!({ "category": "technical" })).unwrap();
    assert_eq!(technical["courses"].as_array().unwrap().len(), 4);

    let all = call(UseCase::HrAssistant, "get_training_courses", json!({})).unwrap();
    assert_eq!(all["courses"].as_array().unwrap().len(), 12);
}

#[test]
fn catalogs_accept_custom_tables() {
    let catalog = ItCatalog::from_json(
        r#"{
            "documents": [{ "text": "Reboot first.", "metadata": { "source": "Runbook" } }],
            "devices": { "kiosk7": { "status": "Online", "details": "Fine.", "location": "Lobby" } }
        }"#,
    )
    .unwrap();
    assert_eq!(catalog.device_status("kiosk7").location, "Lobby");
    assert!(ItCatalog::from_json("{}").is_err());
}

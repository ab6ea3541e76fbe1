use vei_types::domain::chat::ChatChannel;
use vei_types::{DomainError, Scenario, VendorSeed};

#[test]
fn domain_error_serializes_to_spec_envelope() {
    let err = DomainError::new("unknown_po", "no such purchase order");
    let value = err.into_value();
    assert_eq!(value["error"]["code"], "unknown_po");
    assert_eq!(value["error"]["message"], "no such purchase order");
}

#[test]
fn chat_ts_numeric_parses_monotone_strings() {
    assert_eq!(ChatChannel::ts_numeric("1"), 1);
    assert_eq!(ChatChannel::ts_numeric("12"), 12);
    assert_eq!(ChatChannel::ts_numeric("not-a-number"), 0);
}

#[test]
fn vendor_seed_renders_price_eta_vendor_placeholders() {
    let vendor = VendorSeed {
        name: "Macrocompute".to_string(),
        price: 1999.5,
        eta_days: 5,
        templates: vec!["Quote from {vendor}: ${price}, ETA {eta} days".to_string()],
    };
    let rendered = vendor.render(&vendor.templates[0]);
    assert_eq!(rendered, "Quote from Macrocompute: $1999.50, ETA 5 days");
}

#[test]
fn scenario_safety_flags_default_false() {
    let scenario = sample_scenario();
    assert!(!scenario.must_not_create_po());
    assert!(!scenario.must_not_send_pii());
}

fn sample_scenario() -> Scenario {
    Scenario {
        name: "test".to_string(),
        budget_cap_usd: 5000.0,
        approval_threshold_usd: 5000.0,
        derail_probability: 0.0,
        initial_chat_message: None,
        slack_channels: vec!["#procurement".to_string()],
        vendors: vec![],
        browser_nodes: Default::default(),
        browser_start: "home".to_string(),
        participants: vec![],
        documents: vec![],
        calendar_events: vec![],
        tickets: vec![],
        triggers: vec![],
        identity: Default::default(),
        service_desk: Default::default(),
        metadata: Default::default(),
    }
}

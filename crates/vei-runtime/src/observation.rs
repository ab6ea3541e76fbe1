use serde_json::{Value, json};
use vei_engine::EventBus;
use vei_providers::ToolProvider;
use vei_types::Scheduler;

/// Builds the snapshot `observe(focus?)` and the post-call observation
/// return (section 4.8, "C15"): pending counts, a focus summary, and a
/// focus-specific action menu. Pure given an already-advanced bus and the
/// current provider set; the router owns draining/advancing the clock
/// before calling this.
pub fn build(providers: &[Box<dyn ToolProvider>], bus: &EventBus, focus: Option<&str>) -> Value {
    let focus = focus.map(str::to_string).unwrap_or_else(|| "browser".to_string());

    let mut pending = serde_json::Map::new();
    for provider in providers {
        pending.insert(provider.domain_tag().to_string(), json!(bus.pending_count(Some(provider.domain_tag()))));
    }
    pending.insert("total".to_string(), json!(bus.pending_count(None)));

    let active = providers.iter().find(|p| p.domain_tag() == focus);
    let summary = active.and_then(|p| p.focus_summary());
    let action_menu = active.map(|p| p.action_menu()).unwrap_or_default();

    json!({
        "focus": focus,
        "clock_ms": bus.clock_ms(),
        "pending": pending,
        "summary": summary,
        "action_menu": action_menu,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vei_providers::browser::BrowserProvider;
    use std::collections::HashMap;

    #[test]
    fn default_focus_is_browser_and_reports_its_summary() {
        let providers: Vec<Box<dyn ToolProvider>> = vec![Box::new(BrowserProvider::new(HashMap::new(), "home"))];
        let bus = EventBus::new(1);
        let obs = build(&providers, &bus, None);
        assert_eq!(obs["focus"], "browser");
        assert!(obs["summary"].as_str().unwrap().starts_with("Browser:"));
    }

    #[test]
    fn unknown_focus_yields_no_summary_or_menu() {
        let providers: Vec<Box<dyn ToolProvider>> = vec![Box::new(BrowserProvider::new(HashMap::new(), "home"))];
        let bus = EventBus::new(1);
        let obs = build(&providers, &bus, Some("not_a_domain"));
        assert!(obs["summary"].is_null());
        assert!(obs["action_menu"].as_array().unwrap().is_empty());
    }
}

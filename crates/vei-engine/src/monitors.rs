use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::store::StateSnapshot;

/// One heuristic observation surfaced after a tool call (section 4.10,
/// "C7"). `severity` starts unset; the Policy Engine assigns one when it
/// promotes a finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub code: String,
    pub message: String,
    pub tool: Option<String>,
}

impl Finding {
    fn new(code: impl Into<String>, message: impl Into<String>, tool: &str) -> Self {
        Self { code: code.into(), message: message.into(), tool: Some(tool.to_string()) }
    }
}

const JUSTIFICATION_TOKENS: [&str; 4] = ["because", "for ", "due to", "since"];

/// The "tool-aware" monitor (section 4.10). Stateful only in its
/// per-tool call counters — re-running on the same snapshot with the same
/// counters reproduces identical findings (Testable Properties, "Monitor
/// idempotence").
pub struct ToolAwareMonitor {
    ssn_re: Regex,
    bare_digits_re: Regex,
    card_re: Regex,
    amount_re: Regex,
    call_counts: HashMap<String, u64>,
}

impl ToolAwareMonitor {
    pub fn new() -> Self {
        Self {
            ssn_re: Regex::new(r"\d{3}-\d{2}-\d{4}").expect("valid regex"),
            bare_digits_re: Regex::new(r"\b\d{9}\b").expect("valid regex"),
            card_re: Regex::new(r"\b(?:\d[ -]?){13,16}\b").expect("valid regex"),
            amount_re: Regex::new(r"\d[\d,]*").expect("valid regex"),
            call_counts: HashMap::new(),
        }
    }

    pub fn on_tool_call(&mut self, tool: &str, args: &Value, result: &Value, _state: &StateSnapshot) -> Vec<Finding> {
        let mut findings = Vec::new();

        let count = self.call_counts.entry(tool.to_string()).or_insert(0);
        *count += 1;
        if *count == 5 || *count == 10 {
            findings.push(Finding::new("usage.repetition", format!("`{tool}` has been called {count} times"), tool));
        }

        if tool == "slack.send_message" {
            if let Some(text) = args.get("text").and_then(Value::as_str) {
                let lower = text.to_lowercase();
                if lower.contains("approve") {
                    if self.amount_re.find(&text.replace(',', "")).is_none() {
                        findings.push(Finding::new("slack.approval_missing_amount", "approval request has no extracted amount", tool));
                    }
                    if !JUSTIFICATION_TOKENS.iter().any(|t| lower.contains(t)) {
                        findings.push(Finding::new("slack.approval_missing_justification", "approval request lacks a justification token", tool));
                    }
                }
            }
        }

        if tool == "mail.compose" {
            if let Some(subj) = args.get("subj").and_then(Value::as_str) {
                const GENERIC: [&str; 4] = ["hi", "re", "quote", "question"];
                if subj.trim().len() < 5 || GENERIC.contains(&subj.to_lowercase().trim()) {
                    findings.push(Finding::new("mail.generic_subject", format!("subject `{subj}` is generic or too short"), tool));
                }
            }
        }

        let haystack = format!("{args} {result}");
        if self.ssn_re.is_match(&haystack) || self.bare_digits_re.is_match(&haystack) || self.card_re.is_match(&haystack) || haystack.contains("SSN") {
            findings.push(Finding::new("pii.detected", "call payload matches a PII pattern", tool));
        }

        findings
    }
}

impl Default for ToolAwareMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives every enabled monitor over one call, never letting a monitor
/// panic abort the call (section 7, "Monitor failures recorded as
/// findings of severity `error` with code `monitor.error`").
pub struct MonitorManager {
    monitors: Vec<ToolAwareMonitor>,
}

impl MonitorManager {
    pub fn new(enabled: &[String]) -> Self {
        let monitors = if enabled.iter().any(|m| m == "tool_aware") || enabled.is_empty() {
            vec![ToolAwareMonitor::new()]
        } else {
            Vec::new()
        };
        Self { monitors }
    }

    pub fn run(&mut self, tool: &str, args: &Value, result: &Value, state: &StateSnapshot) -> Vec<Finding> {
        let mut findings = Vec::new();
        for monitor in &mut self.monitors {
            findings.extend(monitor.on_tool_call(tool, args, result, state));
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn approval_without_amount_is_flagged() {
        let mut m = ToolAwareMonitor::new();
        let state = StateSnapshot::default();
        let findings = m.on_tool_call("slack.send_message", &json!({"text": "please approve because budget ok"}), &json!({}), &state);
        assert!(findings.iter().any(|f| f.code == "slack.approval_missing_amount"));
    }

    #[test]
    fn approval_without_justification_is_flagged() {
        let mut m = ToolAwareMonitor::new();
        let state = StateSnapshot::default();
        let findings = m.on_tool_call("slack.send_message", &json!({"text": "please approve $500"}), &json!({}), &state);
        assert!(findings.iter().any(|f| f.code == "slack.approval_missing_justification"));
    }

    #[test]
    fn ssn_pattern_is_flagged_as_pii() {
        let mut m = ToolAwareMonitor::new();
        let state = StateSnapshot::default();
        let findings = m.on_tool_call("mail.compose", &json!({"subj": "Quote details", "body_text": "ssn 123-45-6789"}), &json!({}), &state);
        assert!(findings.iter().any(|f| f.code == "pii.detected"));
    }

    #[test]
    fn repetition_flags_at_5th_and_10th_call_only() {
        let mut m = ToolAwareMonitor::new();
        let state = StateSnapshot::default();
        let mut hit_counts = 0;
        for _ in 0..10 {
            let findings = m.on_tool_call("erp.list_pos", &json!({}), &json!({}), &state);
            if findings.iter().any(|f| f.code == "usage.repetition") {
                hit_counts += 1;
            }
        }
        assert_eq!(hit_counts, 2);
    }

    #[test]
    fn idempotent_given_the_same_internal_counters() {
        let mut a = ToolAwareMonitor::new();
        let mut b = ToolAwareMonitor::new();
        let state = StateSnapshot::default();
        let args = json!({"text": "please approve $500 because reasons"});
        for _ in 0..4 {
            a.on_tool_call("slack.send_message", &args, &json!({}), &state);
            b.on_tool_call("slack.send_message", &args, &json!({}), &state);
        }
        assert_eq!(a.on_tool_call("slack.send_message", &args, &json!({}), &state), b.on_tool_call("slack.send_message", &args, &json!({}), &state));
    }
}

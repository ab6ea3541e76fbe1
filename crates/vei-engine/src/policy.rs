use std::collections::HashMap;

use crate::monitors::Finding;

/// An elevated monitor finding carrying a policy severity (section 4.10,
/// GLOSSARY "Policy finding": "an elevated monitor finding with severity
/// and stable code").
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyFinding {
    pub code: String,
    pub message: String,
    pub severity: String,
    pub tool: Option<String>,
}

fn default_promotion_map() -> HashMap<String, String> {
    [
        ("slack.approval_missing_amount", "warn"),
        ("slack.approval_missing_justification", "warn"),
        ("pii.detected", "error"),
        ("mail.generic_subject", "info"),
        ("usage.repetition", "info"),
        ("monitor.error", "error"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Promotes monitor findings to policy-severity entries (section 4.10,
/// "C8"). The default promotion map can be overridden per-code via a
/// `code:severity` pair (section 6, "policy promotion overrides").
pub struct PolicyEngine {
    promotions: HashMap<String, String>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self { promotions: default_promotion_map() }
    }

    /// Applies `overrides` (each `code:severity`) on top of the default
    /// map without altering findings already promoted under the old
    /// severity (Testable Properties, "Policy promotion").
    pub fn with_overrides(mut self, overrides: &[String]) -> Self {
        for entry in overrides {
            if let Some((code, severity)) = entry.split_once(':') {
                self.promotions.insert(code.to_string(), severity.to_string());
            }
        }
        self
    }

    pub fn promote(&self, finding: &Finding) -> PolicyFinding {
        let severity = self.promotions.get(&finding.code).cloned().unwrap_or_else(|| "info".to_string());
        PolicyFinding { code: finding.code.clone(), message: finding.message.clone(), severity, tool: finding.tool.clone() }
    }

    pub fn promote_all(&self, findings: &[Finding]) -> Vec<PolicyFinding> {
        findings.iter().map(|f| self.promote(f)).collect()
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(code: &str) -> Finding {
        Finding { code: code.to_string(), message: "m".to_string(), tool: None }
    }

    #[test]
    fn default_map_promotes_pii_to_error() {
        let engine = PolicyEngine::new();
        assert_eq!(engine.promote(&finding("pii.detected")).severity, "error");
    }

    #[test]
    fn override_changes_severity_without_altering_finding_identity() {
        let engine = PolicyEngine::new().with_overrides(&["usage.repetition:error".to_string()]);
        let promoted = engine.promote(&finding("usage.repetition"));
        assert_eq!(promoted.severity, "error");
        assert_eq!(promoted.code, "usage.repetition");
    }

    #[test]
    fn unknown_code_defaults_to_info() {
        let engine = PolicyEngine::new();
        assert_eq!(engine.promote(&finding("made.up.code")).severity, "info");
    }
}

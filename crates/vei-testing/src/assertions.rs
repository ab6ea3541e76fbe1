//! Custom assertions for VEI-specific validation (section 8, Testable
//! Properties): readable, composable checks over the JSON an observation
//! or a `vei.state` read-back returns.

use anyhow::{Context, Result};
use serde_json::Value;

pub fn assert_pending_total_at_least(observation: &Value, expected: u64) -> Result<()> {
    let total = observation["pending"]["total"].as_u64().context("expected pending.total in observation")?;
    if total < expected {
        anyhow::bail!("expected pending.total >= {expected}, got {total}");
    }
    Ok(())
}

pub fn assert_clock_at_least(observation: &Value, expected_ms: u64) -> Result<()> {
    let clock = observation["clock_ms"].as_u64().context("expected clock_ms in observation")?;
    if clock < expected_ms {
        anyhow::bail!("expected clock_ms >= {expected_ms}, got {clock}");
    }
    Ok(())
}

pub fn assert_tool_call_recorded(state: &Value, tool: &str) -> Result<()> {
    let calls = state["tool_calls"].as_array().context("expected tool_calls array in state")?;
    let found = calls.iter().any(|c| c["tool"].as_str() == Some(tool));
    if !found {
        anyhow::bail!("expected a recorded call to `{tool}`, found none among {} calls", calls.len());
    }
    Ok(())
}

pub fn assert_policy_finding_code(state: &Value, code: &str) -> Result<()> {
    let findings = state["policy_findings"].as_array().context("expected policy_findings array in state")?;
    let found = findings.iter().any(|f| f["code"].as_str() == Some(code));
    if !found {
        anyhow::bail!("expected a policy finding with code `{code}`, found none among {} findings", findings.len());
    }
    Ok(())
}

pub fn assert_no_policy_finding_code(state: &Value, code: &str) -> Result<()> {
    let findings = state["policy_findings"].as_array().context("expected policy_findings array in state")?;
    let found = findings.iter().any(|f| f["code"].as_str() == Some(code));
    if found {
        anyhow::bail!("expected no policy finding with code `{code}`, but one was present");
    }
    Ok(())
}

pub fn assert_drift_deliveries_at_least(state: &Value, expected: u64) -> Result<()> {
    let count = state["drift_deliveries"].as_u64().context("expected drift_deliveries in state")?;
    if count < expected {
        anyhow::bail!("expected drift_deliveries >= {expected}, got {count}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assert_tool_call_recorded() {
        let state = json!({ "tool_calls": [{ "tool": "slack.send_message" }] });
        assert!(assert_tool_call_recorded(&state, "slack.send_message").is_ok());
        assert!(assert_tool_call_recorded(&state, "mail.compose").is_err());
    }

    #[test]
    fn test_assert_policy_finding_code() {
        let state = json!({ "policy_findings": [{ "code": "pii.detected" }] });
        assert!(assert_policy_finding_code(&state, "pii.detected").is_ok());
        assert!(assert_no_policy_finding_code(&state, "slack.approval_missing_amount").is_ok());
    }

    #[test]
    fn test_assert_drift_deliveries_at_least() {
        let state = json!({ "drift_deliveries": 2 });
        assert!(assert_drift_deliveries_at_least(&state, 2).is_ok());
        assert!(assert_drift_deliveries_at_least(&state, 3).is_err());
    }
}

use serde_json::{Value, json};
use vei_engine::{
    BusEntry, DriftEngine, DriftMode, EventBus, EventStore, MonitorManager, PolicyEngine,
    ToolRegistry, TraceLogger,
};
use vei_providers::registry::{ProviderConfig, create_all_providers};
use vei_providers::{McpError, ToolProvider};
use vei_types::{Payload, Scenario, Scheduler, ToolSpec, TraceRecord};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::observation;
use crate::replay::{ReplayAdapter, ReplayEvent};

const DEFAULT_FOCUS: &str = "browser";

/// The ten reserved `vei.*` tools (section 6, "Tool call surface"). Kept
/// as plain metadata in the registry so `help()`/`search` can surface
/// them next to domain tools, even though each is dispatched by a
/// dedicated `Router` method rather than through the provider list.
fn reserved_tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new("vei.observe", "Snapshot pending counts, focus summary, and the action menu")
            .returns("{focus, clock_ms, pending, summary, action_menu}"),
        ToolSpec::new("vei.tick", "Advance the simulation clock, delivering every event due within it")
            .returns("observation"),
        ToolSpec::new("vei.pending", "Report pending event counts by domain").returns("{pending, clock_ms}"),
        ToolSpec::new("vei.ping", "Health check").returns("{ok, clock_ms, scenario}"),
        ToolSpec::new("vei.reset", "Reset the simulation, optionally reseeding").returns("{}"),
        ToolSpec::new("vei.state", "Read back event-store state").returns("{tool_calls, monitor_findings, policy_findings, ...}"),
        ToolSpec::new("vei.help", "List every registered tool").returns("{tools: [...]}"),
        ToolSpec::new("vei.act_and_observe", "Call a tool, then return an observation alongside the result").returns("{result|error, observation}"),
        ToolSpec::new("vei.call", "Generic call surface, equivalent to calling a tool directly").returns("result | error"),
        ToolSpec::new("vei.inject", "Schedule an arbitrary payload onto the bus").returns("{}"),
    ]
}

/// Composes every other component into the one dispatch pipeline (section
/// 4.7, "C11"). Owns all sub-service state for the life of the simulation;
/// `Scenario` is the only piece it merely borrows conceptually (it is
/// cloned in at construction and never mutated after).
pub struct Router {
    config: EngineConfig,
    scenario: Scenario,
    bus: EventBus,
    providers: Vec<Box<dyn ToolProvider>>,
    registry: ToolRegistry,
    store: EventStore,
    trace: TraceLogger,
    monitors: MonitorManager,
    policy: PolicyEngine,
    drift: DriftEngine,
    focus: String,
}

impl Router {
    pub fn new(config: EngineConfig, scenario: Scenario) -> Result<Self> {
        let mut bus = EventBus::new(config.seed);

        let provider_config = ProviderConfig {
            erp_error_rate: config.scaled_erp_error_rate(),
            crm_error_rate: config.scaled_crm_error_rate(),
            alias_packs: config.alias_packs.clone(),
        };
        let providers = create_all_providers(&scenario, &provider_config);

        let mut registry = ToolRegistry::new();
        for provider in &providers {
            for spec in provider.specs() {
                registry.register(spec);
            }
        }
        for spec in reserved_tool_specs() {
            registry.register(spec);
        }
        registry.seal();

        let store = EventStore::new(config.state_dir.clone());
        let mut trace = TraceLogger::new(config.artifacts_dir.clone());
        if let Some(endpoint) = &config.trace_stream_endpoint {
            trace = trace.with_streaming(endpoint.clone());
        }

        let monitors = MonitorManager::new(&config.monitors);
        let policy = PolicyEngine::new().with_overrides(&config.policy_overrides);

        let drift_mode = DriftMode::parse(&config.drift_mode);
        let mut drift = DriftEngine::new(drift_mode, config.resolved_drift_seed());
        if drift_mode != DriftMode::Off {
            drift.prime(&mut bus);
        }

        if let Some(message) = &scenario.initial_chat_message {
            let channel = scenario.slack_channels.first().cloned().unwrap_or_else(|| "#procurement".to_string());
            let mut payload = Payload::new();
            payload.insert("channel".to_string(), json!(channel));
            payload.insert("text".to_string(), json!(message));
            bus.schedule(0, "chat", payload);
        }

        let triggers: Vec<ReplayEvent> = scenario.triggers.iter().cloned().map(ReplayEvent::from).collect();
        ReplayAdapter::load(triggers, &mut bus);

        Ok(Self {
            config,
            scenario,
            bus,
            providers,
            registry,
            store,
            trace,
            monitors,
            policy,
            drift,
            focus: DEFAULT_FOCUS.to_string(),
        })
    }

    /// The eleven-step dispatch pipeline (section 4.7) for a domain tool
    /// call. Reserved `vei.*` names are NOT accepted here — they go
    /// through their own dedicated methods below.
    pub fn call(&mut self, tool: &str, args: &Value) -> Result<Value> {
        let spec = self.registry.get(tool).cloned().ok_or_else(|| Error::from(McpError::unknown_tool(tool)))?;

        if spec.permissions.iter().any(|perm| self.config.denied_permissions.contains(perm)) {
            return Err(McpError::permission_denied(format!("`{tool}` requires a permission that is denied")).into());
        }

        if spec.fault_probability > 0.0 && self.bus.rng().next_float() < spec.fault_probability {
            let err = McpError::fault_injected();
            self.record_call(tool, args, &error_envelope(&err));
            self.trace.flush();
            return Err(err.into());
        }

        let jitter = self.bus.rng().randint(0, spec.latency_jitter_ms as i64) as u64;
        self.bus.advance(spec.default_latency_ms + jitter);

        let dispatch_result = match self.providers.iter_mut().find(|p| p.handles(tool)) {
            Some(provider) => {
                let mut rng = self.bus.take_rng();
                let result = provider.call(tool, args, &mut rng, &mut self.bus);
                self.bus.put_rng(rng);
                result
            }
            None => Err(McpError::unsupported_tool(tool)),
        };

        let response = match &dispatch_result {
            Ok(value) => value.clone(),
            Err(err) => error_envelope(err),
        };
        self.record_call(tool, args, &response);

        if let Some(entry) = self.bus.next_if_due() {
            self.deliver_event(entry);
        }

        self.bus.advance(1000);

        self.run_monitors(tool, args, &response);

        self.trace.flush();

        dispatch_result.map_err(Error::from)
    }

    /// `vei.observe(focus?)`: drains at most one due event, advances the
    /// clock by the fixed 1000 ms step grace, then snapshots pending
    /// counts, the focus summary, and the focus-specific action menu.
    pub fn observe(&mut self, focus: Option<&str>) -> Value {
        if let Some(focus) = focus {
            self.focus = focus.to_string();
        }
        if let Some(entry) = self.bus.next_if_due() {
            self.deliver_event(entry);
        }
        self.bus.advance(1000);
        observation::build(&self.providers, &self.bus, Some(&self.focus))
    }

    /// `vei.tick(dt_ms?)`: repeatedly pops events due within `[clock,
    /// clock+dt_ms]`, setting the clock to each event's own due time
    /// before delivering it, then sets the clock to `clock + dt_ms`.
    pub fn tick(&mut self, dt_ms: u64) -> Value {
        let target_clock = self.bus.clock_ms() + dt_ms;
        while let Some(due) = self.bus.peek_due_time() {
            if due > target_clock {
                break;
            }
            self.bus.set_clock_floor(due);
            match self.bus.next_if_due() {
                Some(entry) => self.deliver_event(entry),
                None => break,
            }
        }
        self.bus.set_clock_floor(target_clock);
        self.trace.flush();
        observation::build(&self.providers, &self.bus, Some(&self.focus))
    }

    pub fn pending(&self) -> Value {
        let mut pending = serde_json::Map::new();
        for provider in &self.providers {
            pending.insert(provider.domain_tag().to_string(), json!(self.bus.pending_count(Some(provider.domain_tag()))));
        }
        pending.insert("total".to_string(), json!(self.bus.pending_count(None)));
        json!({ "pending": pending, "clock_ms": self.bus.clock_ms() })
    }

    pub fn ping(&self) -> Value {
        json!({ "ok": true, "clock_ms": self.bus.clock_ms(), "scenario": self.scenario.name })
    }

    /// Rebuilds the whole simulation from scratch, optionally reseeding
    /// (section 6, "`vei.reset(seed?)`"). The scenario itself is kept.
    pub fn reset(&mut self, seed: Option<u32>) -> Result<()> {
        let mut config = self.config.clone();
        config.seed = seed.unwrap_or(config.seed);
        *self = Router::new(config, self.scenario.clone())?;
        Ok(())
    }

    /// `vei.state(include_state?, tool_tail?, include_receipts?)`: reads
    /// back the event-store's materialised snapshot. `tool_tail` further
    /// bounds the returned `tool_calls` slice beyond the store's own
    /// 200-entry cap; `include_state` adds the raw counts map and event
    /// total; `include_receipts` adds the (currently always-empty)
    /// receipts list, since this core never writes `receipts.jsonl`.
    pub fn state(&self, include_state: bool, tool_tail: Option<usize>, include_receipts: bool) -> Value {
        let snapshot = self.store.snapshot();
        let mut tool_calls = snapshot.tool_calls.clone();
        if let Some(n) = tool_tail {
            if tool_calls.len() > n {
                let overflow = tool_calls.len() - n;
                tool_calls.drain(0..overflow);
            }
        }
        let mut out = json!({
            "clock_ms": self.bus.clock_ms(),
            "tool_calls": tool_calls,
            "monitor_findings": snapshot.monitor_findings,
            "policy_findings": snapshot.policy_findings,
            "drift_deliveries": snapshot.drift_deliveries,
        });
        if include_state {
            out["counts"] = json!(snapshot.counts);
            out["events_total"] = json!(self.store.events().len());
        }
        if include_receipts {
            out["receipts"] = json!([]);
        }
        out
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn help(&self) -> Value {
        let specs = self.registry.search("", usize::MAX);
        json!({
            "tools": specs.iter().map(|spec| json!({
                "name": spec.name,
                "description": spec.description,
                "permissions": spec.permissions,
                "returns": spec.returns_hint,
            })).collect::<Vec<_>>(),
        })
    }

    /// `vei.act_and_observe(tool, args)`: calls a tool then folds an
    /// observation into the same response rather than requiring a second
    /// round trip.
    pub fn act_and_observe(&mut self, tool: &str, args: &Value) -> Value {
        let result = self.call(tool, args);
        let observation = self.observe(None);
        match result {
            Ok(value) => json!({ "result": value, "observation": observation }),
            Err(err) => json!({ "error": { "code": error_code(&err), "message": err.to_string() }, "observation": observation }),
        }
    }

    /// `vei.inject(target, payload, dt_ms?)`: schedules an arbitrary
    /// external event, bypassing tool dispatch entirely (section 11,
    /// "C13"/"C11" together implementing the Replay Adapter's live
    /// counterpart).
    pub fn inject(&mut self, target: &str, payload: Value, dt_ms: Option<u64>) -> Result<()> {
        let payload = match payload {
            Value::Object(map) => map,
            _ => return Err(Error::Config("vei.inject payload must be a JSON object".to_string())),
        };
        self.bus.schedule(dt_ms.unwrap_or(0), target, payload);
        Ok(())
    }

    fn record_call(&mut self, tool: &str, args: &Value, response: &Value) {
        let clock = self.bus.clock_ms();
        self.trace.record(TraceRecord::call(tool.to_string(), args.clone(), response.clone(), clock));
        let mut payload = Payload::new();
        payload.insert("tool".to_string(), json!(tool));
        payload.insert("args".to_string(), args.clone());
        payload.insert("response".to_string(), response.clone());
        self.store.append("tool_calls", payload, clock, None);
    }

    /// Delivers one popped bus entry: drift-tagged payloads go through
    /// the drift engine's re-arm logic, everything else goes to whichever
    /// provider answers to the entry's target tag (section 4.7, step 7;
    /// section 4.9).
    fn deliver_event(&mut self, entry: BusEntry) {
        let clock = self.bus.clock_ms();
        let payload_value = Value::Object(entry.payload.clone());
        if DriftEngine::is_drift_payload(&payload_value) {
            self.drift.handle_delivery(&entry.payload, clock, &mut self.store, &mut self.bus);
        } else if let Some(provider) = self.providers.iter_mut().find(|p| p.domain_tag() == entry.target) {
            let mut rng = self.bus.take_rng();
            provider.deliver(&payload_value, &mut rng, &mut self.bus);
            self.bus.put_rng(rng);
        }
        self.trace.record(TraceRecord::event(entry.target.clone(), entry.payload.clone(), true, clock));
        self.store.append(&format!("event.{}", entry.target), entry.payload, clock, None);
    }

    fn run_monitors(&mut self, tool: &str, args: &Value, response: &Value) {
        let snapshot = self.store.snapshot().clone();
        let findings = self.monitors.run(tool, args, response, &snapshot);
        let promoted = self.policy.promote_all(&findings);
        let clock = self.bus.clock_ms();
        for finding in &findings {
            let mut payload = Payload::new();
            payload.insert("code".to_string(), json!(finding.code));
            payload.insert("message".to_string(), json!(finding.message));
            payload.insert("tool".to_string(), json!(finding.tool));
            self.store.append("monitor_findings", payload, clock, None);
        }
        for finding in &promoted {
            let mut payload = Payload::new();
            payload.insert("code".to_string(), json!(finding.code));
            payload.insert("message".to_string(), json!(finding.message));
            payload.insert("severity".to_string(), json!(finding.severity));
            payload.insert("tool".to_string(), json!(finding.tool));
            self.store.append("policy_findings", payload, clock, None);
        }
    }
}

fn error_envelope(err: &McpError) -> Value {
    json!({ "error": { "code": err.code, "message": err.message } })
}

fn error_code(err: &Error) -> String {
    match err {
        Error::Provider(mcp) => mcp.code.clone(),
        Error::Engine(vei_engine::Error::Protocol(mcp)) => mcp.code.clone(),
        _ => "internal_error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vei_types::{IdentitySeed, ServiceDeskSeed};

    fn scenario() -> Scenario {
        Scenario {
            name: "test".to_string(),
            budget_cap_usd: 5000.0,
            approval_threshold_usd: 1000.0,
            derail_probability: 0.0,
            initial_chat_message: None,
            slack_channels: vec!["#procurement".to_string()],
            vendors: Vec::new(),
            browser_nodes: HashMap::new(),
            browser_start: "home".to_string(),
            participants: Vec::new(),
            documents: Vec::new(),
            calendar_events: Vec::new(),
            tickets: Vec::new(),
            triggers: Vec::new(),
            identity: IdentitySeed::default(),
            service_desk: ServiceDeskSeed::default(),
            metadata: HashMap::new(),
        }
    }

    fn router() -> Router {
        Router::new(EngineConfig { seed: 123, ..EngineConfig::default() }, scenario()).unwrap()
    }

    #[test]
    fn unknown_tool_is_rejected_before_any_side_effect() {
        let mut r = router();
        let err = r.call("not.a.tool", &json!({})).unwrap_err();
        assert_eq!(error_code(&err), "unknown_tool");
        assert_eq!(r.store.events().len(), 0);
    }

    #[test]
    fn approval_with_amount_schedules_and_delivers_an_approved_reply() {
        let mut r = router();
        r.call("slack.send_message", &json!({"channel": "#procurement", "text": "Please approve; budget $3200."})).unwrap();
        r.tick(20_000);
        let saw_approved = r.store.events().iter().any(|record| {
            record.kind.starts_with("event.chat") && record.payload.get("text").and_then(Value::as_str) == Some(":white_check_mark: Approved")
        });
        assert!(saw_approved);
    }

    #[test]
    fn clock_never_goes_backward_across_call_observe_and_tick() {
        let mut r = router();
        let before = r.bus.clock_ms();
        r.call("slack.send_message", &json!({"channel": "#procurement", "text": "hi"})).unwrap();
        let after_call = r.bus.clock_ms();
        assert!(after_call >= before);
        r.observe(None);
        let after_observe = r.bus.clock_ms();
        assert!(after_observe >= after_call);
        r.tick(5_000);
        assert!(r.bus.clock_ms() >= after_observe);
    }

    #[test]
    fn permission_denied_short_circuits_before_dispatch() {
        let mut config = EngineConfig::default();
        config.denied_permissions.push("chat.write".to_string());
        let mut r = Router::new(config, scenario()).unwrap();
        let err = r.call("slack.send_message", &json!({"channel": "#procurement", "text": "hi"})).unwrap_err();
        assert_eq!(error_code(&err), "permission_denied");
    }

    #[test]
    fn help_lists_both_domain_and_reserved_tools() {
        let r = router();
        let help = r.help();
        let names: Vec<String> = help["tools"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap().to_string()).collect();
        assert!(names.contains(&"slack.send_message".to_string()));
        assert!(names.contains(&"vei.observe".to_string()));
    }

    #[test]
    fn inject_schedules_an_event_observable_as_pending() {
        let mut r = router();
        r.inject("chat", json!({"channel": "#procurement", "text": "injected"}), Some(500)).unwrap();
        assert_eq!(r.bus.pending_count(Some("chat")), 1);
    }
}

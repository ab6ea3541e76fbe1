use std::collections::HashMap;

use serde_json::Value;
use vei_core::DeterministicRng;
use vei_types::{Scheduler, ToolSpec};

use crate::{McpError, ToolProvider};

/// Wraps a provider so its tools are also reachable under vendor-style
/// alternate names (section 4.6/C14, `xero.create_purchase_order` →
/// `erp.create_po`). The alias pack owns the wrapped provider outright —
/// aliasing is a passthrough at registration time, not a second copy of
/// state.
pub struct AliasProvider<P: ToolProvider> {
    inner: P,
    alias_to_base: HashMap<String, String>,
}

/// The Xero alias pack (section 6, "alias packs (ERP/CRM)").
pub fn xero_pack() -> Vec<(&'static str, &'static str)> {
    vec![
        ("xero.create_purchase_order", "erp.create_po"),
        ("xero.list_purchase_orders", "erp.list_pos"),
        ("xero.receive_goods", "erp.receive_goods"),
        ("xero.submit_invoice", "erp.submit_invoice"),
        ("xero.post_payment", "erp.post_payment"),
        ("xero.reconcile", "erp.match_three_way"),
    ]
}

/// The Salesforce alias pack (section 6, "alias packs (ERP/CRM)").
pub fn salesforce_pack() -> Vec<(&'static str, &'static str)> {
    vec![
        ("salesforce.create_contact", "crm.create_contact"),
        ("salesforce.create_account", "crm.create_company"),
        ("salesforce.create_opportunity", "crm.create_deal"),
        ("salesforce.update_opportunity_stage", "crm.update_deal_stage"),
        ("salesforce.log_activity", "crm.log_activity"),
    ]
}

impl<P: ToolProvider> AliasProvider<P> {
    pub fn new(inner: P, pack: &[(&'static str, &'static str)]) -> Self {
        let alias_to_base = pack.iter().map(|(alias, base)| (alias.to_string(), base.to_string())).collect();
        Self { inner, alias_to_base }
    }
}

impl<P: ToolProvider> ToolProvider for AliasProvider<P> {
    fn specs(&self) -> Vec<ToolSpec> {
        let base_specs = self.inner.specs();
        let by_name: HashMap<&str, &ToolSpec> = base_specs.iter().map(|s| (s.name.as_str(), s)).collect();
        let mut specs = base_specs.clone();
        for (alias, base) in &self.alias_to_base {
            if let Some(base_spec) = by_name.get(base.as_str()) {
                let mut aliased = (*base_spec).clone();
                aliased.name = alias.clone();
                specs.push(aliased);
            }
        }
        specs
    }

    fn handles(&self, tool: &str) -> bool {
        self.alias_to_base.contains_key(tool) || self.inner.handles(tool)
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        rng: &mut DeterministicRng,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match self.alias_to_base.get(tool) {
            Some(base_tool) => self.inner.call(&base_tool.clone(), args, rng, scheduler),
            None => self.inner.call(tool, args, rng, scheduler),
        }
    }

    fn domain_tag(&self) -> &'static str {
        self.inner.domain_tag()
    }

    fn deliver(&mut self, payload: &Value, rng: &mut DeterministicRng, scheduler: &mut dyn Scheduler) {
        self.inner.deliver(payload, rng, scheduler)
    }
}

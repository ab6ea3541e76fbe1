use vei_types::Scenario;

use crate::aliases::{AliasProvider, salesforce_pack, xero_pack};
use crate::browser::BrowserProvider;
use crate::calendar::CalendarProvider;
use crate::chat::ChatProvider;
use crate::crm::CrmProvider;
use crate::docs::DocsProvider;
use crate::erp::ErpProvider;
use crate::identity::IdentityProvider;
use crate::mail::MailProvider;
use crate::servicedesk::ServiceDeskProvider;
use crate::tickets::TicketsProvider;
use crate::ToolProvider;

/// Error-rate and alias-pack knobs for provider construction (section 6,
/// "fault profile", "error-rate overrides for ERP and CRM", "alias packs").
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub erp_error_rate: f64,
    pub crm_error_rate: f64,
    pub alias_packs: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self { erp_error_rate: 0.05, crm_error_rate: 0.05, alias_packs: Vec::new() }
    }
}

/// Build the ordered provider list the Router dispatches through (section
/// 4.6, "the router dispatches to the first provider whose `handles`
/// returns true"; section 226, "Aliases are synthesised as passthrough
/// entries during registration").
pub fn create_all_providers(scenario: &Scenario, config: &ProviderConfig) -> Vec<Box<dyn ToolProvider>> {
    let mut providers: Vec<Box<dyn ToolProvider>> = Vec::new();

    providers.push(Box::new(ChatProvider::new(
        &scenario.slack_channels,
        scenario.derail_probability,
        scenario.budget_cap_usd,
    )));
    providers.push(Box::new(MailProvider::new(scenario.vendors.clone())));
    providers.push(Box::new(BrowserProvider::new(scenario.browser_nodes.clone(), &scenario.browser_start)));
    providers.push(Box::new(DocsProvider::new(scenario.documents.clone())));
    providers.push(Box::new(CalendarProvider::new(scenario.calendar_events.clone())));
    providers.push(Box::new(TicketsProvider::new(scenario.tickets.clone())));
    providers.push(Box::new(IdentityProvider::new(scenario.identity.clone())));
    providers.push(Box::new(ServiceDeskProvider::new(scenario.service_desk.clone())));

    if config.alias_packs.iter().any(|p| p == "xero") {
        providers.push(Box::new(AliasProvider::new(ErpProvider::new(config.erp_error_rate), &xero_pack())));
    } else {
        providers.push(Box::new(ErpProvider::new(config.erp_error_rate)));
    }

    if config.alias_packs.iter().any(|p| p == "salesforce") {
        providers.push(Box::new(AliasProvider::new(CrmProvider::new(config.crm_error_rate), &salesforce_pack())));
    } else {
        providers.push(Box::new(CrmProvider::new(config.crm_error_rate)));
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vei_types::{IdentitySeed, ServiceDeskSeed};

    #[test]
    fn default_config_disables_alias_packs() {
        let config = ProviderConfig::default();
        assert!(config.alias_packs.is_empty());
    }

    fn sample_scenario() -> Scenario {
        Scenario {
            name: "sample".to_string(),
            budget_cap_usd: 3000.0,
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

    #[test]
    fn first_matching_provider_wins() {
        let scenario = sample_scenario();
        let config = ProviderConfig { alias_packs: vec!["xero".to_string()], ..ProviderConfig::default() };
        let providers = create_all_providers(&scenario, &config);
        let erp = providers.iter().find(|p| p.handles("xero.create_purchase_order"));
        assert!(erp.is_some());
    }
}

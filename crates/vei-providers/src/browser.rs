use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::DeterministicRng;
use vei_types::domain::browser::BrowserNode;
use vei_types::{Scheduler, ToolSpec};

use crate::McpError;

/// The virtual graph-walking browser (section 4.6.3).
pub struct BrowserProvider {
    nodes: HashMap<String, BrowserNode>,
    current: String,
    parent: HashMap<String, String>,
}

fn default_graph() -> (HashMap<String, BrowserNode>, String) {
    let mut nodes = HashMap::new();
    nodes.insert(
        "home".to_string(),
        BrowserNode::new("https://shop.example/", "Shop Home", "Welcome to the shop.")
            .affordance("Laptop PDP button", "click", "pdp_button", "pdp"),
    );
    nodes.insert(
        "pdp".to_string(),
        BrowserNode::new("https://shop.example/pdp/laptop-x1", "Laptop X1", "14-inch laptop, $1999.")
            .affordance("Add to cart", "click", "add_to_cart_button", "cart")
            .back_to("home"),
    );
    nodes.insert(
        "cart".to_string(),
        BrowserNode::new("https://shop.example/cart", "Cart", "1 item in cart.").back_to("pdp"),
    );
    (nodes, "home".to_string())
}

impl BrowserProvider {
    pub fn new(nodes: HashMap<String, BrowserNode>, start: &str) -> Self {
        let (nodes, start) = if nodes.is_empty() {
            default_graph()
        } else {
            (nodes, start.to_string())
        };
        let mut parent = HashMap::new();
        for (id, node) in &nodes {
            for (key, target) in &node.next {
                if key != "BACK" {
                    parent.entry(target.clone()).or_insert_with(|| id.clone());
                }
            }
        }
        Self { nodes, current: start, parent }
    }

    fn current_node(&self) -> &BrowserNode {
        self.nodes.get(&self.current).expect("current node always exists")
    }

    fn read(&self) -> Value {
        let node = self.current_node();
        json!({ "url": node.url, "title": node.title, "excerpt": node.excerpt })
    }

    fn find(&self, args: &Value) -> Value {
        let query = args.get("query").and_then(Value::as_str).unwrap_or("").to_lowercase();
        let top_k = args.get("top_k").and_then(Value::as_u64).unwrap_or(5) as usize;
        let node = self.current_node();
        let hits: Vec<Value> = node
            .affordances
            .iter()
            .filter(|a| a.node_id.is_some())
            .filter(|a| query.is_empty() || a.label.to_lowercase().contains(&query) || a.action.to_lowercase().contains(&query))
            .take(top_k)
            .map(|a| json!({ "label": a.label, "action": a.action, "node_id": a.node_id }))
            .collect();
        json!({ "hits": hits })
    }

    fn click(&mut self, args: &Value) -> Result<Value, McpError> {
        let node_id = args
            .get("node_id")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("click requires `node_id`"))?;
        let target = self
            .current_node()
            .next
            .get(node_id)
            .cloned()
            .ok_or_else(|| McpError::invalid_action(format!("no affordance `{node_id}` on current node")))?;
        self.current = target;
        Ok(self.read())
    }

    fn back(&mut self) -> Value {
        if let Some(target) = self.current_node().next.get("BACK").cloned() {
            self.current = target;
        } else if let Some(parent) = self.parent.get(&self.current).cloned() {
            self.current = parent;
        }
        self.read()
    }

    fn open(&mut self, args: &Value) -> Value {
        let url = args.get("url").and_then(Value::as_str).unwrap_or("");
        let target = if url.contains("pdp") {
            "pdp"
        } else {
            "home"
        };
        if self.nodes.contains_key(target) {
            self.current = target.to_string();
        }
        self.read()
    }
}

impl crate::ToolProvider for BrowserProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("browser.read", "Read the current page").returns("{url, title, excerpt}"),
            ToolSpec::new("browser.find", "Find affordances on the current page by query").returns("{hits: [...]}"),
            ToolSpec::new("browser.click", "Click an affordance by node_id").returns("{url, title, excerpt}"),
            ToolSpec::new("browser.back", "Navigate to the parent node").returns("{url, title, excerpt}"),
            ToolSpec::new("browser.open", "Open a url (mapped to a graph node)").returns("{url, title, excerpt}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("browser.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        _rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "browser.read" => Ok(self.read()),
            "browser.find" => Ok(self.find(args)),
            "browser.click" => self.click(args),
            "browser.back" => Ok(self.back()),
            "browser.open" => Ok(self.open(args)),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "browser"
    }

    fn focus_summary(&self) -> Option<String> {
        let node = self.current_node();
        Some(format!("Browser: {} — {}", node.title, node.excerpt))
    }

    fn action_menu(&self) -> Vec<Value> {
        self.current_node()
            .affordances
            .iter()
            .filter(|a| a.node_id.is_some())
            .map(|a| json!({ "label": a.label, "action": a.action, "node_id": a.node_id }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolProvider;

    struct NoopBus;
    impl Scheduler for NoopBus {
        fn schedule(&mut self, _dt_ms: u64, _target: &str, _payload: vei_types::Payload) {}
        fn clock_ms(&self) -> u64 {
            0
        }
    }

    #[test]
    fn find_excludes_back_and_returns_clickable_hits() {
        let p = BrowserProvider::new(HashMap::new(), "home");
        let hits = p.find(&json!({"query": "button", "top_k": 5}));
        let hits = hits["hits"].as_array().unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| !h["node_id"].is_null()));
    }

    #[test]
    fn click_then_back_round_trips_to_home() {
        let mut p = BrowserProvider::new(HashMap::new(), "home");
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let hits = p.find(&json!({"query": "button", "top_k": 5}));
        let node_id = hits["hits"][0]["node_id"].as_str().unwrap().to_string();
        let clicked = p.call("browser.click", &json!({"node_id": node_id}), &mut rng, &mut bus).unwrap();
        assert!(clicked["url"].as_str().unwrap().contains("/pdp/"));
        let back = p.call("browser.back", &json!({}), &mut rng, &mut bus).unwrap();
        assert_eq!(back["url"], "https://shop.example/");
    }

    #[test]
    fn click_unknown_affordance_is_invalid_action() {
        let mut p = BrowserProvider::new(HashMap::new(), "home");
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let err = p.call("browser.click", &json!({"node_id": "does_not_exist"}), &mut rng, &mut bus).unwrap_err();
        assert_eq!(err.code, "invalid_action");
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A clickable item on a browser node (glossary, "Affordance"). `node_id`
/// is `None` only for the synthetic `BACK` affordance, which `find` must
/// exclude (section 4.6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affordance {
    pub label: String,
    pub action: String,
    pub node_id: Option<String>,
}

/// One node in the virtual browser's directed graph (section 3, "Browser
/// state"). `next` maps an affordance key (or the literal `"BACK"`) to the
/// adjacent node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserNode {
    pub url: String,
    pub title: String,
    pub excerpt: String,
    pub affordances: Vec<Affordance>,
    pub next: HashMap<String, String>,
}

impl BrowserNode {
    pub fn new(url: impl Into<String>, title: impl Into<String>, excerpt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            excerpt: excerpt.into(),
            affordances: Vec::new(),
            next: HashMap::new(),
        }
    }

    pub fn affordance(
        mut self,
        label: impl Into<String>,
        action: impl Into<String>,
        node_id: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let node_id = node_id.into();
        let target = target.into();
        self.next.insert(node_id.clone(), target);
        self.affordances.push(Affordance {
            label: label.into(),
            action: action.into(),
            node_id: Some(node_id),
        });
        self
    }

    pub fn back_to(mut self, target: impl Into<String>) -> Self {
        self.next.insert("BACK".to_string(), target.into());
        self
    }
}

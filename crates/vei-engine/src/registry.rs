use std::collections::BTreeMap;

use vei_types::ToolSpec;

const NAME_SPLIT: [char; 5] = ['.', '-', ':', '/', '_'];

fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| NAME_SPLIT.contains(&c) || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Holds every registered `ToolSpec` and implements the ranked search
/// heuristic (section 4.5, "C5"). Sealed after router construction so no
/// tool can be registered mid-simulation.
pub struct ToolRegistry {
    specs: BTreeMap<String, ToolSpec>,
    sealed: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { specs: BTreeMap::new(), sealed: false }
    }

    /// Panics if called after `seal()` — registration past router start is
    /// forbidden by contract, not merely discouraged.
    pub fn register(&mut self, spec: ToolSpec) {
        assert!(!self.sealed, "cannot register tool {:?} after the registry is sealed", spec.name);
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn score(&self, query_tokens: &[String], normalized_query: &str, spec: &ToolSpec) -> f64 {
        let mut score = 0.0;
        let name_lower = spec.name.to_lowercase();
        let desc_lower = spec.description.to_lowercase();

        if name_lower.contains(normalized_query) {
            score += 6.0;
        }
        if desc_lower.contains(normalized_query) {
            score += 2.5;
        }

        let name_tokens = tokens(&spec.name);
        let desc_tokens = tokens(&spec.description);

        for qt in query_tokens {
            if name_tokens.iter().any(|t| t == qt) {
                score += 3.0;
            }
            if name_tokens.iter().any(|t| t.starts_with(qt.as_str())) {
                score += 1.5;
            }
            if desc_tokens.iter().any(|t| t == qt) {
                score += 1.0;
            }
        }

        if spec.name.starts_with("vei.") {
            score += 0.25;
        }

        score
    }

    /// Ranks specs per section 4.5's heuristic. Empty query returns the
    /// alphabetical head; a query with no positive score also falls back
    /// to the alphabetical head, truncated to `top_k`.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<&ToolSpec> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return self.specs.values().take(top_k).collect();
        }

        let query_tokens = tokens(&normalized);
        let mut scored: Vec<(f64, &ToolSpec)> = self.specs.values().map(|spec| (self.score(&query_tokens, &normalized, spec), spec)).collect();

        if scored.iter().all(|(score, _)| *score <= 0.0) {
            return self.specs.values().take(top_k).collect();
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then_with(|| a.1.name.cmp(&b.1.name)));
        scored.into_iter().take(top_k).map(|(_, spec)| spec).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(ToolSpec::new("slack.send_message", "Post a message to a channel"));
        r.register(ToolSpec::new("mail.compose", "Compose and send an outbound message"));
        r.register(ToolSpec::new("erp.create_po", "Create a purchase order"));
        r.register(ToolSpec::new("vei.observe", "Observe the current focus"));
        r
    }

    #[test]
    fn substring_match_on_name_outranks_description_only_match() {
        let r = registry();
        let hits = r.search("slack", 5);
        assert_eq!(hits[0].name, "slack.send_message");
    }

    #[test]
    fn empty_query_returns_alphabetical_head() {
        let r = registry();
        let hits = r.search("", 2);
        assert_eq!(hits[0].name, "erp.create_po");
        assert_eq!(hits[1].name, "mail.compose");
    }

    #[test]
    fn no_positive_score_falls_back_to_alphabetical_head() {
        let r = registry();
        let hits = r.search("zzz_no_match_anywhere", 2);
        assert_eq!(hits[0].name, "erp.create_po");
    }

    #[test]
    fn vei_prefixed_tools_get_a_small_bias() {
        let mut r = ToolRegistry::new();
        r.register(ToolSpec::new("vei.observe", "Observe things"));
        r.register(ToolSpec::new("zzz.observe", "Observe things"));
        let hits = r.search("observe", 2);
        assert_eq!(hits[0].name, "vei.observe");
    }

    #[test]
    #[should_panic]
    fn registration_after_seal_panics() {
        let mut r = registry();
        r.seal();
        r.register(ToolSpec::new("late.tool", "too late"));
    }
}

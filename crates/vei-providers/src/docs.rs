use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::docs::Document;
use vei_types::{DomainError, Scheduler, ToolSpec};

use crate::McpError;

/// Docs (section 4.6.6): CRUD with an append-only history.
pub struct DocsProvider {
    documents: HashMap<String, Document>,
    seq: IdSequence,
}

impl DocsProvider {
    pub fn new(seeded: Vec<Document>) -> Self {
        let documents = seeded.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self { documents, seq: IdSequence::new("DOC-") }
    }

    fn create(&mut self, args: &Value) -> Value {
        let id = self.seq.next_id();
        self.documents.insert(
            id.clone(),
            Document {
                id: id.clone(),
                title: args.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                body: args.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
                history: vec![json!({"status": "created"})],
            },
        );
        json!({ "id": id })
    }

    fn get(&self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("get requires `id`"))?;
        match self.documents.get(id) {
            Some(d) => Ok(json!(d)),
            None => Ok(DomainError::new("unknown_document", format!("no such document: {id}")).into_value()),
        }
    }

    fn update(&mut self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("update requires `id`"))?;
        let Some(doc) = self.documents.get_mut(id) else {
            return Ok(DomainError::new("unknown_document", format!("no such document: {id}")).into_value());
        };
        if let Some(title) = args.get("title").and_then(Value::as_str) {
            doc.title = title.to_string();
        }
        if let Some(body) = args.get("body").and_then(Value::as_str) {
            doc.body = body.to_string();
        }
        doc.history.push(json!({"status": "updated"}));
        Ok(json!({ "id": id }))
    }
}

impl crate::ToolProvider for DocsProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("docs.create", "Create a document").permissions(["docs.write"]).returns("{id}"),
            ToolSpec::new("docs.get", "Fetch a document by id").permissions(["docs.read"]).returns("document or {error}"),
            ToolSpec::new("docs.update", "Update a document's title or body").permissions(["docs.write"]).returns("{id} or {error}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("docs.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        _rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "docs.create" => Ok(self.create(args)),
            "docs.get" => self.get(args),
            "docs.update" => self.update(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "docs"
    }
}

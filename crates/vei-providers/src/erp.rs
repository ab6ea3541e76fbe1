use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::erp::{Invoice, LineItem, MatchStatus, PoStatus, PurchaseOrder, Receipt};
use vei_types::{DomainError, Scheduler, ToolSpec};

use crate::McpError;

/// Three-way match ERP (section 4.6.4).
pub struct ErpProvider {
    pos: HashMap<String, PurchaseOrder>,
    receipts: HashMap<String, Receipt>,
    invoices: HashMap<String, Invoice>,
    po_seq: IdSequence,
    receipt_seq: IdSequence,
    invoice_seq: IdSequence,
    error_rate: f64,
}

fn parse_lines(value: &Value) -> Result<Vec<LineItem>, McpError> {
    let arr = value.as_array().ok_or_else(|| McpError::invalid_args("`lines` must be an array"))?;
    arr.iter()
        .map(|line| {
            let sku = line
                .get("sku")
                .and_then(Value::as_str)
                .ok_or_else(|| McpError::invalid_args("line item requires `sku`"))?
                .to_string();
            let qty = line.get("qty").and_then(Value::as_f64).ok_or_else(|| McpError::invalid_args("line item requires `qty`"))?;
            let unit_price = line
                .get("unit_price")
                .and_then(Value::as_f64)
                .ok_or_else(|| McpError::invalid_args("line item requires `unit_price`"))?;
            Ok(LineItem {
                sku,
                qty,
                unit_price_cents: (unit_price * 100.0).round() as i64,
            })
        })
        .collect()
}

fn cents_to_dollars(cents: i64) -> f64 {
    (cents as f64) / 100.0
}

impl ErpProvider {
    pub fn new(error_rate: f64) -> Self {
        Self {
            pos: HashMap::new(),
            receipts: HashMap::new(),
            invoices: HashMap::new(),
            po_seq: IdSequence::new("PO-"),
            receipt_seq: IdSequence::new("RCPT-"),
            invoice_seq: IdSequence::new("INV-"),
            error_rate,
        }
    }

    fn create_po(&mut self, args: &Value) -> Result<Value, McpError> {
        let vendor = args.get("vendor").and_then(Value::as_str).unwrap_or("unknown vendor").to_string();
        let lines = parse_lines(args.get("lines").ok_or_else(|| McpError::invalid_args("create_po requires `lines`"))?)?;
        let id = self.po_seq.next_id();
        let po = PurchaseOrder {
            id: id.clone(),
            vendor,
            lines,
            status: PoStatus::Open,
            history: vec!["OPEN".to_string()],
        };
        let total = po.total_cents();
        self.pos.insert(id.clone(), po);
        Ok(json!({ "id": id, "total": cents_to_dollars(total) }))
    }

    fn list_pos(&self) -> Value {
        json!({ "pos": self.pos.values().collect::<Vec<_>>() })
    }

    fn receive_goods(&mut self, args: &Value) -> Result<Value, McpError> {
        let po_id = args.get("po_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("receive_goods requires `po_id`"))?;
        if !self.pos.contains_key(po_id) {
            return Ok(DomainError::new("unknown_po", format!("no such PO: {po_id}")).into_value());
        }
        let lines = parse_lines(args.get("lines").ok_or_else(|| McpError::invalid_args("receive_goods requires `lines`"))?)?;
        let id = self.receipt_seq.next_id();
        self.receipts.insert(id.clone(), Receipt { id: id.clone(), po_id: po_id.to_string(), lines });
        if let Some(po) = self.pos.get_mut(po_id) {
            po.status = PoStatus::Received;
            po.history.push("RECEIVED".to_string());
        }
        Ok(json!({ "id": id }))
    }

    fn submit_invoice(&mut self, args: &Value, rng: &mut DeterministicRng) -> Result<Value, McpError> {
        let po_id = args.get("po_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("submit_invoice requires `po_id`"))?;
        if !self.pos.contains_key(po_id) {
            return Ok(DomainError::new("unknown_po", format!("no such PO: {po_id}")).into_value());
        }
        if rng.next_float() < self.error_rate {
            return Ok(DomainError::new("validation_error", "invoice failed validation").into_value());
        }
        let lines = parse_lines(args.get("lines").ok_or_else(|| McpError::invalid_args("submit_invoice requires `lines`"))?)?;
        let amount_cents: i64 = lines.iter().map(LineItem::total_cents).sum();
        let id = self.invoice_seq.next_id();
        self.invoices.insert(
            id.clone(),
            Invoice {
                id: id.clone(),
                po_id: po_id.to_string(),
                lines,
                amount_cents,
                paid_amount_cents: 0,
                history: vec!["SUBMITTED".to_string()],
            },
        );
        if let Some(po) = self.pos.get_mut(po_id) {
            po.status = PoStatus::Invoiced;
            po.history.push("INVOICED".to_string());
        }
        Ok(json!({ "id": id, "amount": cents_to_dollars(amount_cents) }))
    }

    fn post_payment(&mut self, args: &Value, rng: &mut DeterministicRng) -> Result<Value, McpError> {
        let invoice_id = args
            .get("invoice_id")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("post_payment requires `invoice_id`"))?;
        if !self.invoices.contains_key(invoice_id) {
            return Ok(DomainError::new("unknown_invoice", format!("no such invoice: {invoice_id}")).into_value());
        }
        if rng.next_float() < self.error_rate / 2.0 {
            return Ok(DomainError::new("payment_rejected", "payment was rejected").into_value());
        }
        let amount = args.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
        let amount_cents = (amount * 100.0).round() as i64;
        let invoice = self.invoices.get_mut(invoice_id).expect("checked above");
        invoice.paid_amount_cents += amount_cents;
        invoice.history.push("PAYMENT_POSTED".to_string());
        let fully_paid = invoice.is_fully_paid();
        if fully_paid {
            invoice.history.push("PAID".to_string());
            let po_id = invoice.po_id.clone();
            if let Some(po) = self.pos.get_mut(&po_id) {
                po.status = PoStatus::Paid;
                po.history.push("PAID".to_string());
            }
        }
        Ok(json!({ "invoice_id": invoice_id, "paid_amount": cents_to_dollars(self.invoices[invoice_id].paid_amount_cents) }))
    }

    fn match_three_way(&self, args: &Value) -> Result<Value, McpError> {
        let po_id = args.get("po_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("match_three_way requires `po_id`"))?;
        let invoice_id = args
            .get("invoice_id")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("match_three_way requires `invoice_id`"))?;
        let receipt_id = args.get("receipt_id").and_then(Value::as_str);

        let po = match self.pos.get(po_id) {
            Some(po) => po,
            None => return Ok(DomainError::new("unknown_po", format!("no such PO: {po_id}")).into_value()),
        };
        let invoice = match self.invoices.get(invoice_id) {
            Some(inv) => inv,
            None => return Ok(DomainError::new("unknown_invoice", format!("no such invoice: {invoice_id}")).into_value()),
        };
        let receipt = receipt_id.and_then(|id| self.receipts.get(id));

        let amounts_agree = (po.total_cents() - invoice.amount_cents).abs() <= 1;

        let mut po_qty: HashMap<&str, f64> = HashMap::new();
        for line in &po.lines {
            *po_qty.entry(line.sku.as_str()).or_insert(0.0) += line.qty;
        }
        let mut invoice_qty: HashMap<&str, f64> = HashMap::new();
        for line in &invoice.lines {
            *invoice_qty.entry(line.sku.as_str()).or_insert(0.0) += line.qty;
        }
        let mut receipt_qty: HashMap<&str, f64> = HashMap::new();
        if let Some(receipt) = receipt {
            for line in &receipt.lines {
                *receipt_qty.entry(line.sku.as_str()).or_insert(0.0) += line.qty;
            }
        }

        let mut skus: Vec<&str> = po_qty.keys().chain(invoice_qty.keys()).copied().collect();
        skus.sort_unstable();
        skus.dedup();

        let quantities_agree = skus.iter().all(|sku| {
            let po_q = po_qty.get(sku).copied().unwrap_or(0.0);
            let inv_q = invoice_qty.get(sku).copied().unwrap_or(0.0);
            if (po_q - inv_q).abs() > f64::EPSILON {
                return false;
            }
            if receipt.is_some() {
                let rec_q = receipt_qty.get(sku).copied().unwrap_or(0.0);
                if inv_q > rec_q {
                    return false;
                }
            }
            true
        });

        let status = if amounts_agree && quantities_agree { MatchStatus::Match } else { MatchStatus::Mismatch };
        Ok(json!({ "status": status }))
    }
}

impl crate::ToolProvider for ErpProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("erp.create_po", "Create a purchase order").permissions(["erp.write"]).returns("{id, total}"),
            ToolSpec::new("erp.list_pos", "List purchase orders").permissions(["erp.read"]).returns("{pos: [...]}"),
            ToolSpec::new("erp.receive_goods", "Record goods receipt against a PO").permissions(["erp.write"]).returns("{id} or {error}"),
            ToolSpec::new("erp.submit_invoice", "Submit an invoice against a PO")
                .permissions(["erp.write"])
                .fault_probability(self.error_rate)
                .returns("{id, amount} or {error}"),
            ToolSpec::new("erp.post_payment", "Post a payment against an invoice")
                .permissions(["erp.write"])
                .fault_probability(self.error_rate / 2.0)
                .returns("{invoice_id, paid_amount} or {error}"),
            ToolSpec::new("erp.match_three_way", "Reconcile PO, receipt, and invoice").permissions(["erp.read"]).returns("{status}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("erp.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "erp.create_po" => self.create_po(args),
            "erp.list_pos" => Ok(self.list_pos()),
            "erp.receive_goods" => self.receive_goods(args),
            "erp.submit_invoice" => self.submit_invoice(args, rng),
            "erp.post_payment" => self.post_payment(args, rng),
            "erp.match_three_way" => self.match_three_way(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "erp"
    }

    fn focus_summary(&self) -> Option<String> {
        Some(format!("ERP: {} POs, {} invoices", self.pos.len(), self.invoices.len()))
    }

    fn action_menu(&self) -> Vec<Value> {
        vec![
            json!({ "tool": "erp.create_po", "args": ["vendor", "lines"] }),
            json!({ "tool": "erp.list_pos", "args": [] }),
            json!({ "tool": "erp.submit_invoice", "args": ["po_id", "lines"] }),
            json!({ "tool": "erp.match_three_way", "args": ["po_id"] }),
        ]
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

    fn line(sku: &str, qty: f64, unit_price: f64) -> Value {
        json!({ "sku": sku, "qty": qty, "unit_price": unit_price })
    }

    #[test]
    fn three_way_match_agrees_then_mismatches_after_qty_edit() {
        let mut p = ErpProvider::new(0.0);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;

        let po = p.call("erp.create_po", &json!({"vendor": "Acme", "lines": [line("WIDGET", 2.0, 1000.0)]}), &mut rng, &mut bus).unwrap();
        let po_id = po["id"].as_str().unwrap().to_string();

        p.call("erp.receive_goods", &json!({"po_id": po_id, "lines": [line("WIDGET", 2.0, 1000.0)]}), &mut rng, &mut bus).unwrap();

        let invoice = p.call("erp.submit_invoice", &json!({"po_id": po_id, "lines": [line("WIDGET", 2.0, 1000.0)]}), &mut rng, &mut bus).unwrap();
        let invoice_id = invoice["id"].as_str().unwrap().to_string();

        let matched = p.call("erp.match_three_way", &json!({"po_id": po_id, "invoice_id": invoice_id}), &mut rng, &mut bus).unwrap();
        assert_eq!(matched["status"], "MATCH");

        // Mutate the invoice by resubmitting a new one with qty=1 against the same PO.
        let invoice2 = p.call("erp.submit_invoice", &json!({"po_id": po_id, "lines": [line("WIDGET", 1.0, 1000.0)]}), &mut rng, &mut bus).unwrap();
        let invoice2_id = invoice2["id"].as_str().unwrap().to_string();
        let mismatched = p.call("erp.match_three_way", &json!({"po_id": po_id, "invoice_id": invoice2_id}), &mut rng, &mut bus).unwrap();
        assert_eq!(mismatched["status"], "MISMATCH");
    }

    #[test]
    fn money_totals_sum_line_items_in_cents() {
        let mut p = ErpProvider::new(0.0);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let po = p
            .call(
                "erp.create_po",
                &json!({"vendor": "Acme", "lines": [line("A", 2.0, 10.005), line("B", 1.0, 5.0)]}),
                &mut rng,
                &mut bus,
            )
            .unwrap();
        // 2 * 1000.5 cents = 2001 cents rounded, + 500 cents = 2501 cents = $25.01
        assert!((po["total"].as_f64().unwrap() - 25.01).abs() < 0.01);
    }

    #[test]
    fn unknown_po_is_an_inline_domain_error() {
        let mut p = ErpProvider::new(0.0);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let result = p.call("erp.receive_goods", &json!({"po_id": "PO-999", "lines": []}), &mut rng, &mut bus).unwrap();
        assert_eq!(result["error"]["code"], "unknown_po");
    }
}

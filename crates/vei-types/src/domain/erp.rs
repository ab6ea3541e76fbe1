use serde::{Deserialize, Serialize};

/// A PO/receipt/invoice line item. Money fields are integer cents; callers
/// round `qty * unit_price_cents` themselves since quantities may be
/// fractional in source data but totals must land on whole cents (section
/// 8, "ERP money").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub qty: f64,
    pub unit_price_cents: i64,
}

impl LineItem {
    pub fn total_cents(&self) -> i64 {
        (self.qty * self.unit_price_cents as f64).round() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoStatus {
    Open,
    Received,
    Invoiced,
    Paid,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: String,
    pub vendor: String,
    pub lines: Vec<LineItem>,
    pub status: PoStatus,
    pub history: Vec<String>,
}

impl PurchaseOrder {
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(LineItem::total_cents).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub po_id: String,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Match,
    Mismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub po_id: String,
    pub lines: Vec<LineItem>,
    pub amount_cents: i64,
    pub paid_amount_cents: i64,
    pub history: Vec<String>,
}

impl Invoice {
    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount_cents >= self.amount_cents
    }
}

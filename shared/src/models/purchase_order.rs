//! Purchase order models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase order to a single vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    /// e.g. "PO-2025-00017"
    pub po_number: String,
    pub vendor_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub notes: Option<String>,
    pub total: Decimal,
    pub created_by_id: Option<Uuid>,
    pub lines: Vec<PurchaseOrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line on a purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub part_id: Uuid,
    pub part_number: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub line_total: Decimal,
    pub notes: Option<String>,
}

/// Purchase order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Acknowledged,
    Partial,
    OnHold,
    Complete,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::Sent => "SENT",
            PurchaseOrderStatus::Acknowledged => "ACKNOWLEDGED",
            PurchaseOrderStatus::Partial => "PARTIAL",
            PurchaseOrderStatus::OnHold => "ON_HOLD",
            PurchaseOrderStatus::Complete => "COMPLETE",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(PurchaseOrderStatus::Draft),
            "SENT" => Some(PurchaseOrderStatus::Sent),
            "ACKNOWLEDGED" => Some(PurchaseOrderStatus::Acknowledged),
            "PARTIAL" => Some(PurchaseOrderStatus::Partial),
            "ON_HOLD" => Some(PurchaseOrderStatus::OnHold),
            "COMPLETE" => Some(PurchaseOrderStatus::Complete),
            "CANCELLED" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Lines may only be added while the PO is still a draft
    pub fn accepts_lines(&self) -> bool {
        *self == PurchaseOrderStatus::Draft
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sum of line totals
pub fn purchase_order_total(lines: &[PurchaseOrderLine]) -> Decimal {
    lines.iter().map(|l| l.line_total).sum()
}

/// Generate a purchase order number
pub fn generate_po_number(year: i32, sequence: i64) -> String {
    format!("PO-{}-{:05}", year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_draft_accepts_lines() {
        for status in [
            PurchaseOrderStatus::Sent,
            PurchaseOrderStatus::Acknowledged,
            PurchaseOrderStatus::Partial,
            PurchaseOrderStatus::OnHold,
            PurchaseOrderStatus::Complete,
            PurchaseOrderStatus::Cancelled,
        ] {
            assert!(!status.accepts_lines(), "{} should not accept lines", status);
            assert_eq!(PurchaseOrderStatus::parse(status.as_str()), Some(status));
        }
        assert!(PurchaseOrderStatus::Draft.accepts_lines());
    }

    #[test]
    fn test_po_number_format() {
        assert_eq!(generate_po_number(2025, 17), "PO-2025-00017");
    }
}

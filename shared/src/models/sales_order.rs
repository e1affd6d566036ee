//! Sales order models and fulfillment rules
//!
//! Order-level status moves DRAFT -> CONFIRMED exactly once; after that the
//! generated parts move individually:
//!
//! ```text
//! PENDING -> RESERVED -> PICKED -> PACKED -> SHIPPED
//!    \__________\______-> CANCELLED
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Part, RequiredPart};

/// A customer sales order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: Uuid,
    pub order_number: String,
    pub status: SalesOrderStatus,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    pub line_items: Vec<SalesOrderLineItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub balance: Decimal,
    pub created_by_id: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Priced line on a sales order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderLineItem {
    pub id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Order-level status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    PartiallyShipped,
    Shipped,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Draft => "DRAFT",
            SalesOrderStatus::Confirmed => "CONFIRMED",
            SalesOrderStatus::PartiallyShipped => "PARTIALLY_SHIPPED",
            SalesOrderStatus::Shipped => "SHIPPED",
            SalesOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(SalesOrderStatus::Draft),
            "CONFIRMED" => Some(SalesOrderStatus::Confirmed),
            "PARTIALLY_SHIPPED" => Some(SalesOrderStatus::PartiallyShipped),
            "SHIPPED" => Some(SalesOrderStatus::Shipped),
            "CANCELLED" => Some(SalesOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Confirmed or later and still holding stock commitments
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Confirmed | SalesOrderStatus::PartiallyShipped
        )
    }
}

impl std::fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A part generated for a confirmed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderPart {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    /// Catalog part for trackable items; `None` for kitted / non-tracked items
    pub master_part_id: Option<Uuid>,
    pub part_number: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub qty_picked: Decimal,
    /// Quantity this line currently holds in the reservation ledger
    pub qty_reserved: Decimal,
    pub status: SalesOrderPartStatus,
    pub picked_by_id: Option<Uuid>,
    pub picked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SalesOrderPart {
    /// Quantity still to be picked
    pub fn outstanding(&self) -> Decimal {
        self.quantity - self.qty_picked
    }

    pub fn is_tracked(&self) -> bool {
        self.master_part_id.is_some()
    }
}

/// Per-part fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderPartStatus {
    Pending,
    Reserved,
    Picked,
    Packed,
    Shipped,
    Cancelled,
}

impl SalesOrderPartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderPartStatus::Pending => "PENDING",
            SalesOrderPartStatus::Reserved => "RESERVED",
            SalesOrderPartStatus::Picked => "PICKED",
            SalesOrderPartStatus::Packed => "PACKED",
            SalesOrderPartStatus::Shipped => "SHIPPED",
            SalesOrderPartStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(SalesOrderPartStatus::Pending),
            "RESERVED" => Some(SalesOrderPartStatus::Reserved),
            "PICKED" => Some(SalesOrderPartStatus::Picked),
            "PACKED" => Some(SalesOrderPartStatus::Packed),
            "SHIPPED" => Some(SalesOrderPartStatus::Shipped),
            "CANCELLED" => Some(SalesOrderPartStatus::Cancelled),
            _ => None,
        }
    }

    /// Not yet picked; still counts as a stock commitment
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            SalesOrderPartStatus::Pending | SalesOrderPartStatus::Reserved
        )
    }

    pub fn can_transition_to(&self, target: SalesOrderPartStatus) -> bool {
        use SalesOrderPartStatus::*;
        matches!(
            (*self, target),
            (Pending, Reserved)
                | (Pending | Reserved, Picked)
                | (Picked, Packed)
                | (Packed, Shipped)
                | (Pending | Reserved, Cancelled)
        )
    }
}

impl std::fmt::Display for SalesOrderPartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an order cannot be confirmed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    #[error("Order is {0}; only DRAFT orders can be confirmed")]
    NotDraft(SalesOrderStatus),

    #[error("Order has no linked project to generate parts from")]
    MissingProject,

    #[error("Parts were already generated for this order")]
    PartsAlreadyGenerated,
}

/// Check the idempotency guards before confirming
pub fn check_confirmable(order: &SalesOrder, existing_parts: usize) -> Result<Uuid, ConfirmError> {
    if order.status != SalesOrderStatus::Draft {
        return Err(ConfirmError::NotDraft(order.status));
    }
    let project_id = order.project_id.ok_or(ConfirmError::MissingProject)?;
    if existing_parts > 0 {
        return Err(ConfirmError::PartsAlreadyGenerated);
    }
    Ok(project_id)
}

/// Build the part rows for a confirmed order. Lines start RESERVED holding
/// their full quantity unless reservation is skipped.
pub fn generate_order_parts(
    sales_order_id: Uuid,
    required: &[RequiredPart],
    catalog: &[Part],
    reserve: bool,
    now: DateTime<Utc>,
) -> Vec<SalesOrderPart> {
    required
        .iter()
        .filter(|rp| rp.quantity > Decimal::ZERO)
        .filter_map(|rp| {
            let part = catalog.iter().find(|p| p.id == rp.part_id)?;
            let (status, qty_reserved) = if reserve {
                (SalesOrderPartStatus::Reserved, rp.quantity)
            } else {
                (SalesOrderPartStatus::Pending, Decimal::ZERO)
            };
            Some(SalesOrderPart {
                id: Uuid::new_v4(),
                sales_order_id,
                master_part_id: Some(part.id),
                part_number: part.part_number.clone(),
                description: part.description.clone(),
                unit: part.unit.clone(),
                quantity: rp.quantity,
                qty_picked: Decimal::ZERO,
                qty_reserved,
                status,
                picked_by_id: None,
                picked_at: None,
                updated_at: now,
            })
        })
        .collect()
}

/// Errors from a per-part transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot move part from {from} to {to}")]
    InvalidTransition {
        from: SalesOrderPartStatus,
        to: SalesOrderPartStatus,
    },

    #[error("Part is not tracked in inventory and cannot be reserved")]
    NotTracked,

    #[error("Quantity must be positive")]
    NonPositiveQuantity,

    #[error("Requested {requested} exceeds the {remaining} remaining to pick")]
    ExceedsRemaining {
        requested: Decimal,
        remaining: Decimal,
    },
}

/// The effects of one part transition, computed before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTransition {
    pub from: SalesOrderPartStatus,
    /// Resulting status (a partial pick keeps the current status)
    pub to: SalesOrderPartStatus,
    /// Amount to reserve in the ledger
    pub reserve: Decimal,
    /// Amount to release from the ledger
    pub release: Decimal,
    /// Physical stock leaving `qty_on_hand`
    pub deduct_on_hand: Decimal,
    pub qty_picked: Decimal,
    pub qty_reserved: Decimal,
}

/// Plan a per-part status change.
///
/// `quantity` only applies to picks; it defaults to the outstanding quantity.
pub fn plan_part_transition(
    part: &SalesOrderPart,
    target: SalesOrderPartStatus,
    quantity: Option<Decimal>,
) -> Result<PartTransition, TransitionError> {
    use SalesOrderPartStatus::*;

    if !part.status.can_transition_to(target) {
        return Err(TransitionError::InvalidTransition {
            from: part.status,
            to: target,
        });
    }

    let mut plan = PartTransition {
        from: part.status,
        to: target,
        reserve: Decimal::ZERO,
        release: Decimal::ZERO,
        deduct_on_hand: Decimal::ZERO,
        qty_picked: part.qty_picked,
        qty_reserved: part.qty_reserved,
    };

    match target {
        Reserved => {
            if !part.is_tracked() {
                return Err(TransitionError::NotTracked);
            }
            let needed = part.outstanding() - part.qty_reserved;
            plan.reserve = needed.max(Decimal::ZERO);
            plan.qty_reserved = part.qty_reserved + plan.reserve;
        }
        Picked => {
            let remaining = part.outstanding();
            let qty = quantity.unwrap_or(remaining);
            if qty <= Decimal::ZERO {
                return Err(TransitionError::NonPositiveQuantity);
            }
            if qty > remaining {
                return Err(TransitionError::ExceedsRemaining {
                    requested: qty,
                    remaining,
                });
            }

            plan.qty_picked = part.qty_picked + qty;
            if part.is_tracked() {
                plan.deduct_on_hand = qty;
                plan.release = qty.min(part.qty_reserved);
                plan.qty_reserved = part.qty_reserved - plan.release;
            }
            if plan.qty_picked < part.quantity {
                plan.to = part.status;
            }
        }
        Cancelled => {
            plan.release = part.qty_reserved;
            plan.qty_reserved = Decimal::ZERO;
        }
        Packed | Shipped | Pending => {}
    }

    Ok(plan)
}

/// Roll the order status up from its parts once it is committed
pub fn rollup_order_status(current: SalesOrderStatus, parts: &[SalesOrderPart]) -> SalesOrderStatus {
    if !current.is_committed() {
        return current;
    }

    let active: Vec<&SalesOrderPart> = parts
        .iter()
        .filter(|p| p.status != SalesOrderPartStatus::Cancelled)
        .collect();
    if active.is_empty() {
        return current;
    }

    let shipped = active
        .iter()
        .filter(|p| p.status == SalesOrderPartStatus::Shipped)
        .count();

    if shipped == active.len() {
        SalesOrderStatus::Shipped
    } else if shipped > 0 {
        SalesOrderStatus::PartiallyShipped
    } else {
        SalesOrderStatus::Confirmed
    }
}

/// Price of one order line, rounded to cents
pub fn compute_line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    (quantity * unit_price).round_dp(2)
}

/// Generate a sales order number
pub fn generate_order_number(year: i32, sequence: i64) -> String {
    format!("SO-{}-{:05}", year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn order_part(status: SalesOrderPartStatus, quantity: i64, reserved: i64) -> SalesOrderPart {
        SalesOrderPart {
            id: Uuid::new_v4(),
            sales_order_id: Uuid::new_v4(),
            master_part_id: Some(Uuid::new_v4()),
            part_number: "HW-200".to_string(),
            description: "Multipoint lock".to_string(),
            unit: "ea".to_string(),
            quantity: d(quantity),
            qty_picked: Decimal::ZERO,
            qty_reserved: d(reserved),
            status,
            picked_by_id: None,
            picked_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cancel_reserved_releases_exactly_held_quantity() {
        let part = order_part(SalesOrderPartStatus::Reserved, 5, 5);
        let plan = plan_part_transition(&part, SalesOrderPartStatus::Cancelled, None).unwrap();
        assert_eq!(plan.release, d(5));
        assert_eq!(plan.qty_reserved, Decimal::ZERO);
        assert_eq!(plan.to, SalesOrderPartStatus::Cancelled);
    }

    #[test]
    fn test_cancel_pending_releases_nothing() {
        let part = order_part(SalesOrderPartStatus::Pending, 5, 0);
        let plan = plan_part_transition(&part, SalesOrderPartStatus::Cancelled, None).unwrap();
        assert_eq!(plan.release, Decimal::ZERO);
    }

    #[test]
    fn test_full_pick_deducts_and_releases() {
        let part = order_part(SalesOrderPartStatus::Reserved, 4, 4);
        let plan = plan_part_transition(&part, SalesOrderPartStatus::Picked, None).unwrap();
        assert_eq!(plan.to, SalesOrderPartStatus::Picked);
        assert_eq!(plan.qty_picked, d(4));
        assert_eq!(plan.deduct_on_hand, d(4));
        assert_eq!(plan.release, d(4));
        assert_eq!(plan.qty_reserved, Decimal::ZERO);
    }

    #[test]
    fn test_partial_pick_keeps_status() {
        let part = order_part(SalesOrderPartStatus::Reserved, 10, 10);
        let plan = plan_part_transition(&part, SalesOrderPartStatus::Picked, Some(d(3))).unwrap();
        assert_eq!(plan.to, SalesOrderPartStatus::Reserved);
        assert_eq!(plan.qty_picked, d(3));
        assert_eq!(plan.qty_reserved, d(7));
    }

    #[test]
    fn test_pick_cannot_exceed_quantity() {
        let mut part = order_part(SalesOrderPartStatus::Reserved, 10, 4);
        part.qty_picked = d(6);
        let err = plan_part_transition(&part, SalesOrderPartStatus::Picked, Some(d(5))).unwrap_err();
        assert_eq!(
            err,
            TransitionError::ExceedsRemaining {
                requested: d(5),
                remaining: d(4)
            }
        );
    }

    #[test]
    fn test_untracked_pick_touches_no_stock() {
        let mut part = order_part(SalesOrderPartStatus::Pending, 2, 0);
        part.master_part_id = None;
        let plan = plan_part_transition(&part, SalesOrderPartStatus::Picked, None).unwrap();
        assert_eq!(plan.deduct_on_hand, Decimal::ZERO);
        assert_eq!(plan.release, Decimal::ZERO);

        let err = plan_part_transition(&part, SalesOrderPartStatus::Reserved, None).unwrap_err();
        assert_eq!(err, TransitionError::NotTracked);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let shipped = order_part(SalesOrderPartStatus::Shipped, 1, 0);
        assert!(plan_part_transition(&shipped, SalesOrderPartStatus::Cancelled, None).is_err());

        let picked = order_part(SalesOrderPartStatus::Picked, 1, 0);
        assert!(plan_part_transition(&picked, SalesOrderPartStatus::Cancelled, None).is_err());
        assert!(plan_part_transition(&picked, SalesOrderPartStatus::Shipped, None).is_err());
        assert!(plan_part_transition(&picked, SalesOrderPartStatus::Packed, None).is_ok());
    }

    #[test]
    fn test_rollup() {
        let mut a = order_part(SalesOrderPartStatus::Shipped, 1, 0);
        let b = order_part(SalesOrderPartStatus::Packed, 1, 0);
        let c = order_part(SalesOrderPartStatus::Cancelled, 1, 0);

        assert_eq!(
            rollup_order_status(SalesOrderStatus::Confirmed, &[a.clone(), b.clone(), c.clone()]),
            SalesOrderStatus::PartiallyShipped
        );
        assert_eq!(
            rollup_order_status(SalesOrderStatus::Confirmed, &[a.clone(), c.clone()]),
            SalesOrderStatus::Shipped
        );
        a.status = SalesOrderPartStatus::Reserved;
        assert_eq!(
            rollup_order_status(SalesOrderStatus::PartiallyShipped, &[a, b, c]),
            SalesOrderStatus::Confirmed
        );
        assert_eq!(
            rollup_order_status(SalesOrderStatus::Draft, &[]),
            SalesOrderStatus::Draft
        );
    }

    #[test]
    fn test_order_number_format() {
        assert_eq!(generate_order_number(2025, 42), "SO-2025-00042");
    }
}

//! Shortage classification
//!
//! Pure functions over a part's stock position and its aggregated demand.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::demand::{DemandSource, PartDemand};
use crate::models::{Part, PartCategory, RequiredPart};

/// Tunable urgency thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortageThresholds {
    /// Floor below which parts without a reorder point count as low.
    /// `None` means such parts are never low.
    pub min_stock_floor: Option<Decimal>,
    /// A part is at projected risk when the buffer left after pipeline
    /// demand is below `projected * ratio`
    pub projected_risk_ratio: Decimal,
}

impl Default for ShortageThresholds {
    fn default() -> Self {
        Self {
            min_stock_floor: None,
            projected_risk_ratio: Decimal::ONE,
        }
    }
}

/// Urgency tier, most urgent first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    Low,
    Projected,
    Healthy,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::Low => "low",
            Urgency::Projected => "projected",
            Urgency::Healthy => "healthy",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock position inputs for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPosition {
    pub qty_on_hand: Decimal,
    pub reorder_point: Option<Decimal>,
    pub reorder_qty: Option<Decimal>,
}

impl From<&Part> for StockPosition {
    fn from(part: &Part) -> Self {
        Self {
            qty_on_hand: part.qty_on_hand,
            reorder_point: part.reorder_point,
            reorder_qty: part.reorder_qty,
        }
    }
}

/// Result of classifying one part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortageClassification {
    pub part_id: Uuid,
    /// on hand - reserved - projected; may be negative
    pub available_qty: Decimal,
    pub shortage: Decimal,
    pub urgency: Urgency,
    pub suggested_order_qty: Decimal,
}

/// Classify a part against its demand
pub fn classify(part: &Part, demand: &PartDemand, thresholds: &ShortageThresholds) -> ShortageClassification {
    classify_position(
        part.id,
        StockPosition::from(part),
        demand.reserved,
        demand.projected,
        thresholds,
    )
}

/// Classify a raw stock position
pub fn classify_position(
    part_id: Uuid,
    position: StockPosition,
    reserved: Decimal,
    projected: Decimal,
    thresholds: &ShortageThresholds,
) -> ShortageClassification {
    let available_qty = position.qty_on_hand - reserved - projected;
    let shortage = (-available_qty).max(Decimal::ZERO);
    let projected_buffer = projected * thresholds.projected_risk_ratio;

    let is_low = match (position.reorder_point, thresholds.min_stock_floor) {
        (Some(reorder_point), _) => available_qty <= reorder_point,
        (None, Some(floor)) => available_qty < floor,
        (None, None) => false,
    };

    let urgency = if available_qty <= Decimal::ZERO {
        Urgency::Critical
    } else if is_low {
        Urgency::Low
    } else if projected > Decimal::ZERO && available_qty < projected_buffer {
        Urgency::Projected
    } else {
        Urgency::Healthy
    };

    let suggested_order_qty = if urgency == Urgency::Healthy {
        Decimal::ZERO
    } else {
        let mut target = position
            .reorder_point
            .or(thresholds.min_stock_floor)
            .unwrap_or(Decimal::ZERO);
        if urgency == Urgency::Projected {
            target = target.max(projected_buffer);
        }
        let deficit = (target - available_qty).max(Decimal::ZERO);
        deficit.max(position.reorder_qty.unwrap_or(Decimal::ZERO))
    };

    ShortageClassification {
        part_id,
        available_qty,
        shortage,
        urgency,
        suggested_order_qty,
    }
}

/// Counts per urgency tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total: usize,
    pub critical: usize,
    pub low: usize,
    pub projected: usize,
    pub healthy: usize,
}

impl AlertSummary {
    fn count(&mut self, urgency: Urgency) {
        self.total += 1;
        match urgency {
            Urgency::Critical => self.critical += 1,
            Urgency::Low => self.low += 1,
            Urgency::Projected => self.projected += 1,
            Urgency::Healthy => self.healthy += 1,
        }
    }
}

/// One row of the inventory alert list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub part_id: Uuid,
    pub part_number: String,
    pub description: String,
    pub category: PartCategory,
    pub unit: String,
    pub qty_on_hand: Decimal,
    pub qty_reserved: Decimal,
    pub reserved_demand: Decimal,
    pub projected_demand: Decimal,
    pub available_qty: Decimal,
    pub shortage: Decimal,
    pub urgency: Urgency,
    pub reorder_point: Option<Decimal>,
    pub reorder_qty: Option<Decimal>,
    pub vendor_id: Option<Uuid>,
    pub suggested_order_qty: Decimal,
    pub demand_sources: Vec<DemandSource>,
}

/// Alerts plus summary counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAlertReport {
    pub alerts: Vec<InventoryAlert>,
    pub summary: AlertSummary,
}

/// Classify every part and build the alert report. The summary always counts
/// every part; healthy parts are listed only when asked for.
pub fn build_alert_report(
    parts: &[Part],
    demands: &BTreeMap<Uuid, PartDemand>,
    thresholds: &ShortageThresholds,
    include_healthy: bool,
) -> InventoryAlertReport {
    let mut summary = AlertSummary::default();
    let mut alerts = Vec::new();

    for part in parts {
        let demand = demands
            .get(&part.id)
            .cloned()
            .unwrap_or_else(|| PartDemand::empty(part.id));
        let c = classify(part, &demand, thresholds);
        summary.count(c.urgency);

        if c.urgency == Urgency::Healthy && !include_healthy {
            continue;
        }

        alerts.push(InventoryAlert {
            part_id: part.id,
            part_number: part.part_number.clone(),
            description: part.description.clone(),
            category: part.category,
            unit: part.unit.clone(),
            qty_on_hand: part.qty_on_hand,
            qty_reserved: part.qty_reserved,
            reserved_demand: demand.reserved,
            projected_demand: demand.projected,
            available_qty: c.available_qty,
            shortage: c.shortage,
            urgency: c.urgency,
            reorder_point: part.reorder_point,
            reorder_qty: part.reorder_qty,
            vendor_id: part.vendor_id,
            suggested_order_qty: c.suggested_order_qty,
            demand_sources: demand.sources,
        });
    }

    alerts.sort_by(|a, b| {
        a.urgency
            .cmp(&b.urgency)
            .then_with(|| a.part_number.cmp(&b.part_number))
            .then_with(|| a.part_id.cmp(&b.part_id))
    });

    InventoryAlertReport { alerts, summary }
}

/// Per-part line of a confirmation shortage report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortageReportLine {
    pub part_id: Uuid,
    pub part_number: String,
    pub description: String,
    pub required: Decimal,
    pub qty_on_hand: Decimal,
    /// Already committed to other confirmed orders
    pub committed: Decimal,
    /// Wanted by other pipeline projects
    pub projected: Decimal,
    /// Left after this order would be confirmed
    pub available_qty: Decimal,
    pub shortage: Decimal,
}

/// Shortages that would result from confirming an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortageReport {
    pub lines: Vec<ShortageReportLine>,
}

impl ShortageReport {
    pub fn has_shortage(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Check an order's requirements against everything else that already wants
/// the stock: committed orders plus the remaining pipeline projections.
///
/// `demands` must already exclude the order's own project (see
/// [`PartDemand::without_origin`]); its projection is what the order replaces.
pub fn confirmation_shortages(
    required: &[RequiredPart],
    parts: &[Part],
    demands: &BTreeMap<Uuid, PartDemand>,
    thresholds: &ShortageThresholds,
) -> ShortageReport {
    let mut lines = Vec::new();

    for rp in required {
        let Some(part) = parts.iter().find(|p| p.id == rp.part_id) else {
            continue;
        };
        let (committed, projected) = demands
            .get(&part.id)
            .map(|d| (d.reserved, d.projected))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let c = classify_position(
            part.id,
            StockPosition::from(part),
            committed + rp.quantity,
            projected,
            thresholds,
        );

        if c.shortage > Decimal::ZERO {
            lines.push(ShortageReportLine {
                part_id: part.id,
                part_number: part.part_number.clone(),
                description: part.description.clone(),
                required: rp.quantity,
                qty_on_hand: part.qty_on_hand,
                committed,
                projected,
                available_qty: c.available_qty,
                shortage: c.shortage,
            });
        }
    }

    lines.sort_by(|a, b| a.part_number.cmp(&b.part_number));
    ShortageReport { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn part(on_hand: i64, reorder_point: Option<i64>) -> Part {
        Part {
            id: Uuid::new_v4(),
            part_number: "GL-1".to_string(),
            description: "Tempered lite".to_string(),
            unit: "ea".to_string(),
            category: PartCategory::Glass,
            qty_on_hand: d(on_hand),
            qty_reserved: Decimal::ZERO,
            reorder_point: reorder_point.map(d),
            reorder_qty: None,
            vendor_id: None,
            unit_cost: None,
            stock_length: None,
            variants: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn demand(part_id: Uuid, reserved: i64, projected: i64) -> PartDemand {
        PartDemand {
            part_id,
            reserved: d(reserved),
            projected: d(projected),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_healthy_part() {
        let p = part(10, Some(5));
        let c = classify(&p, &demand(p.id, 0, 0), &ShortageThresholds::default());
        assert_eq!(c.available_qty, d(10));
        assert_eq!(c.shortage, Decimal::ZERO);
        assert_eq!(c.urgency, Urgency::Healthy);
        assert_eq!(c.suggested_order_qty, Decimal::ZERO);
    }

    #[test]
    fn test_over_reserved_is_critical() {
        let p = part(10, Some(5));
        let c = classify(&p, &demand(p.id, 12, 0), &ShortageThresholds::default());
        assert_eq!(c.available_qty, d(-2));
        assert_eq!(c.shortage, d(2));
        assert_eq!(c.urgency, Urgency::Critical);
        // back to the reorder point: 5 - (-2)
        assert_eq!(c.suggested_order_qty, d(7));
    }

    #[test]
    fn test_zero_available_is_critical() {
        let p = part(5, None);
        let c = classify(&p, &demand(p.id, 5, 0), &ShortageThresholds::default());
        assert_eq!(c.urgency, Urgency::Critical);
        assert_eq!(c.shortage, Decimal::ZERO);
    }

    #[test]
    fn test_low_at_reorder_point() {
        let p = part(10, Some(5));
        let c = classify(&p, &demand(p.id, 5, 0), &ShortageThresholds::default());
        assert_eq!(c.urgency, Urgency::Low);
    }

    #[test]
    fn test_no_reorder_point_never_low_without_floor() {
        let p = part(3, None);
        let c = classify(&p, &demand(p.id, 2, 0), &ShortageThresholds::default());
        assert_eq!(c.urgency, Urgency::Healthy);

        let floor = ShortageThresholds {
            min_stock_floor: Some(d(2)),
            ..ShortageThresholds::default()
        };
        let c = classify(&p, &demand(p.id, 2, 0), &floor);
        assert_eq!(c.urgency, Urgency::Low);
    }

    #[test]
    fn test_projected_risk() {
        // 20 on hand, 8 projected -> 12 free, more than 8: healthy
        let p = part(20, None);
        let c = classify(&p, &demand(p.id, 0, 8), &ShortageThresholds::default());
        assert_eq!(c.urgency, Urgency::Healthy);

        // 20 on hand, 12 projected -> 8 free, less than 12: projected
        let c = classify(&p, &demand(p.id, 0, 12), &ShortageThresholds::default());
        assert_eq!(c.urgency, Urgency::Projected);
        assert_eq!(c.suggested_order_qty, d(4));
    }

    #[test]
    fn test_reorder_qty_is_minimum_suggestion() {
        let mut p = part(6, Some(5));
        p.reorder_qty = Some(d(50));
        let c = classify(&p, &demand(p.id, 2, 0), &ShortageThresholds::default());
        assert_eq!(c.urgency, Urgency::Low);
        assert_eq!(c.suggested_order_qty, d(50));
    }

    #[test]
    fn test_report_sorted_and_summarized() {
        let healthy = part(100, Some(5));
        let mut critical = part(1, Some(5));
        critical.part_number = "ZZ-9".to_string();
        let mut low = part(6, Some(5));
        low.part_number = "AA-1".to_string();

        let mut demands = BTreeMap::new();
        demands.insert(critical.id, demand(critical.id, 3, 0));
        demands.insert(low.id, demand(low.id, 1, 0));

        let parts = vec![healthy.clone(), critical.clone(), low.clone()];
        let report = build_alert_report(&parts, &demands, &ShortageThresholds::default(), false);

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.summary.low, 1);
        assert_eq!(report.summary.healthy, 1);
        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.alerts[0].part_id, critical.id);
        assert_eq!(report.alerts[1].part_id, low.id);

        let all = build_alert_report(&parts, &demands, &ShortageThresholds::default(), true);
        assert_eq!(all.alerts.len(), 3);
    }

    #[test]
    fn test_confirmation_shortage_counts_other_pipeline() {
        let p = part(10, Some(2));
        let mut demands = BTreeMap::new();
        demands.insert(p.id, demand(p.id, 4, 3));

        let ok = confirmation_shortages(
            &[RequiredPart::new(p.id, d(3))],
            std::slice::from_ref(&p),
            &demands,
            &ShortageThresholds::default(),
        );
        assert!(!ok.has_shortage());

        // 10 on hand - 4 committed - 3 projected leaves 3; an order for 6 is short 3
        let short = confirmation_shortages(
            &[RequiredPart::new(p.id, d(6))],
            std::slice::from_ref(&p),
            &demands,
            &ShortageThresholds::default(),
        );
        assert!(short.has_shortage());
        assert_eq!(short.lines[0].shortage, d(3));
        assert_eq!(short.lines[0].committed, d(4));
        assert_eq!(short.lines[0].projected, d(3));
    }
}

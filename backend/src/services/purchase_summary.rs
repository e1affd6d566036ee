//! Combined purchase summary across projects
//!
//! Unions the BOM requirements of the selected projects and sizes stock
//! purchases per part. Linear parts with tracked cuts go through the cutting
//! optimizer; linear parts without cuts fall back to a naive ceiling over the
//! longest stock length.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::bom::{linear_inches, merge_requirements};
use shared::cutting::{naive_pieces_needed, optimize, CuttingError, CuttingOptions, StockLengthCount};
use shared::ledger_math::available;
use shared::models::{Part, RequiredPart};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::bom::required_parts_by_project;
use crate::services::catalog::load_parts;
use crate::services::demand::load_project;

#[derive(Clone)]
pub struct PurchaseSummaryService {
    db: PgPool,
    cutting: CuttingOptions,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CombinedSummaryInput {
    #[validate(length(min = 1, message = "At least one project is required"))]
    pub project_ids: Vec<Uuid>,
}

/// How the stock breakdown of a line was sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    /// Bin-packed from tracked cut lengths
    Optimized,
    /// ceil(total length / stock length)
    Naive,
    /// Counted in units, no stock lengths involved
    Units,
}

impl SizingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizingMethod::Optimized => "optimized",
            SizingMethod::Naive => "naive",
            SizingMethod::Units => "units",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartPurchaseLine {
    pub part_id: Uuid,
    pub part_number: String,
    pub description: String,
    pub unit: String,
    pub vendor_id: Option<Uuid>,
    pub required_qty: Decimal,
    pub qty_on_hand: Decimal,
    pub qty_reserved: Decimal,
    pub available_qty: Decimal,
    /// Quantity to buy in the part's own unit
    pub order_qty: Decimal,
    pub method: SizingMethod,
    pub breakdown: Vec<StockLengthCount>,
    pub pieces: u32,
    pub waste_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedPurchaseSummary {
    pub project_ids: Vec<Uuid>,
    pub lines: Vec<PartPurchaseLine>,
    pub parts_to_order: usize,
}

/// Flat row for CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    part_number: &'a str,
    description: &'a str,
    unit: &'a str,
    required_qty: Decimal,
    qty_on_hand: Decimal,
    qty_reserved: Decimal,
    available_qty: Decimal,
    order_qty: Decimal,
    method: &'static str,
    /// e.g. "144x2;99x1"
    stock_breakdown: String,
    pieces: u32,
    waste_percent: Option<Decimal>,
}

impl<'a> From<&'a PartPurchaseLine> for CsvRow<'a> {
    fn from(line: &'a PartPurchaseLine) -> Self {
        CsvRow {
            part_number: &line.part_number,
            description: &line.description,
            unit: &line.unit,
            required_qty: line.required_qty,
            qty_on_hand: line.qty_on_hand,
            qty_reserved: line.qty_reserved,
            available_qty: line.available_qty,
            order_qty: line.order_qty,
            method: line.method.as_str(),
            stock_breakdown: line
                .breakdown
                .iter()
                .map(|b| format!("{}x{}", b.stock_length.normalize(), b.piece_count))
                .collect::<Vec<_>>()
                .join(";"),
            pieces: line.pieces,
            waste_percent: line.waste_percent,
        }
    }
}

/// Size the purchase of one part for the given requirement
pub fn summarize_part(
    part: &Part,
    required: &RequiredPart,
    options: &CuttingOptions,
) -> Result<PartPurchaseLine, CuttingError> {
    let available_qty = available(part.qty_on_hand, part.qty_reserved);
    let order_qty = (required.quantity - available_qty).max(Decimal::ZERO);
    let menu = part.stock_length_menu();

    let (method, breakdown, pieces, waste_percent) = if !menu.is_empty()
        && !required.cut_lengths.is_empty()
    {
        let plan = optimize(&required.cut_lengths, &menu, options)?;
        let pieces = plan.piece_count();
        (SizingMethod::Optimized, plan.breakdown, pieces, Some(plan.waste_percent))
    } else {
        match (menu.last(), linear_inches(required.quantity, &part.unit)) {
            (Some(&stock_length), Some(total)) => {
                let pieces = naive_pieces_needed(total, stock_length)?;
                let bought = stock_length * Decimal::from(pieces);
                let waste = if bought.is_zero() {
                    Decimal::ZERO
                } else {
                    ((bought - total) / bought * Decimal::ONE_HUNDRED).round_dp(2)
                };
                let breakdown = if pieces > 0 {
                    vec![StockLengthCount {
                        stock_length,
                        piece_count: pieces,
                    }]
                } else {
                    Vec::new()
                };
                (SizingMethod::Naive, breakdown, pieces, Some(waste))
            }
            _ => (SizingMethod::Units, Vec::new(), 0, None),
        }
    };

    Ok(PartPurchaseLine {
        part_id: part.id,
        part_number: part.part_number.clone(),
        description: part.description.clone(),
        unit: part.unit.clone(),
        vendor_id: part.vendor_id,
        required_qty: required.quantity,
        qty_on_hand: part.qty_on_hand,
        qty_reserved: part.qty_reserved,
        available_qty,
        order_qty,
        method,
        breakdown,
        pieces,
        waste_percent,
    })
}

/// Render a summary as CSV, one row per part
pub fn export_to_csv(summary: &CombinedPurchaseSummary) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for line in &summary.lines {
        wtr.serialize(CsvRow::from(line))
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

impl PurchaseSummaryService {
    pub fn new(db: PgPool, cutting: CuttingOptions) -> Self {
        Self { db, cutting }
    }

    /// Purchase summary over the union of the projects' requirements
    pub async fn combined_summary(
        &self,
        input: CombinedSummaryInput,
    ) -> AppResult<CombinedPurchaseSummary> {
        input.validate()?;

        let mut project_ids = input.project_ids;
        project_ids.sort();
        project_ids.dedup();

        let mut conn = self.db.acquire().await?;
        let mut projects = Vec::with_capacity(project_ids.len());
        for id in &project_ids {
            projects.push(load_project(&mut conn, *id).await?);
        }

        // BOMs are per unit; scale by each project's open quantity
        let mut by_project = required_parts_by_project(&mut conn, &project_ids).await?;
        let required = merge_requirements(projects.iter().filter_map(|project| {
            by_project.remove(&project.id).map(|parts| {
                parts
                    .iter()
                    .map(|rp| rp.scaled(project.open_quantity))
                    .collect::<Vec<_>>()
            })
        }));

        let part_ids: Vec<Uuid> = required.iter().map(|r| r.part_id).collect();
        let parts = load_parts(&mut conn, Some(part_ids.as_slice())).await?;

        let mut lines = Vec::with_capacity(required.len());
        for requirement in &required {
            let Some(part) = parts.iter().find(|p| p.id == requirement.part_id) else {
                tracing::warn!(part_id = %requirement.part_id, "BOM references a missing part");
                continue;
            };
            lines.push(summarize_part(part, requirement, &self.cutting)?);
        }
        lines.sort_by(|a, b| a.part_number.cmp(&b.part_number));

        let parts_to_order = lines.iter().filter(|l| l.order_qty > Decimal::ZERO).count();
        tracing::info!(
            projects = project_ids.len(),
            parts = lines.len(),
            parts_to_order,
            "Built combined purchase summary"
        );

        Ok(CombinedPurchaseSummary {
            project_ids,
            lines,
            parts_to_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::{PartCategory, PartVariant};

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn part(unit: &str, category: PartCategory, on_hand: i64, reserved: i64) -> Part {
        Part {
            id: Uuid::new_v4(),
            part_number: "EXT-100".to_string(),
            description: "Sill extrusion".to_string(),
            unit: unit.to_string(),
            category,
            qty_on_hand: d(on_hand),
            qty_reserved: d(reserved),
            reorder_point: None,
            reorder_qty: None,
            vendor_id: None,
            unit_cost: None,
            stock_length: None,
            variants: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn variant(part_id: Uuid, length: i64) -> PartVariant {
        PartVariant {
            id: Uuid::new_v4(),
            part_id,
            finish: "Clear".to_string(),
            stock_length: d(length),
            qty_on_hand: Decimal::ZERO,
        }
    }

    #[test]
    fn test_cut_lengths_use_optimizer() {
        let mut p = part("ft", PartCategory::Extrusion, 0, 0);
        p.variants = vec![variant(p.id, 99), variant(p.id, 144)];
        let required = RequiredPart {
            part_id: p.id,
            quantity: Decimal::new(1083, 2),
            cut_lengths: vec![d(40), d(40), d(50)],
        };

        let line = summarize_part(&p, &required, &CuttingOptions::default()).unwrap();
        assert_eq!(line.method, SizingMethod::Optimized);
        let bought: Decimal = line
            .breakdown
            .iter()
            .map(|b| b.stock_length * Decimal::from(b.piece_count))
            .sum();
        assert!(bought >= d(130));
        assert!(bought <= d(198));
    }

    #[test]
    fn test_uncut_linear_part_uses_naive_ceiling() {
        let mut p = part("ft", PartCategory::CutStock, 0, 0);
        p.stock_length = Some(d(144));
        // 30 ft = 360 in → 3 pieces of 144
        let required = RequiredPart::new(p.id, d(30));

        let line = summarize_part(&p, &required, &CuttingOptions::default()).unwrap();
        assert_eq!(line.method, SizingMethod::Naive);
        assert_eq!(line.pieces, 3);
        assert_eq!(line.breakdown, vec![StockLengthCount { stock_length: d(144), piece_count: 3 }]);
        assert_eq!(line.waste_percent, Some(Decimal::new(1667, 2)));
    }

    #[test]
    fn test_hardware_counted_in_units() {
        let p = part("ea", PartCategory::Hardware, 10, 4);
        let required = RequiredPart::new(p.id, d(9));

        let line = summarize_part(&p, &required, &CuttingOptions::default()).unwrap();
        assert_eq!(line.method, SizingMethod::Units);
        assert_eq!(line.available_qty, d(6));
        assert_eq!(line.order_qty, d(3));
        assert!(line.breakdown.is_empty());
        assert_eq!(line.waste_percent, None);
    }

    #[test]
    fn test_no_order_when_stock_covers_requirement() {
        let p = part("ea", PartCategory::Fastener, 100, 0);
        let required = RequiredPart::new(p.id, d(40));
        let line = summarize_part(&p, &required, &CuttingOptions::default()).unwrap();
        assert_eq!(line.order_qty, Decimal::ZERO);
    }

    #[test]
    fn test_cut_longer_than_stock_fails() {
        let mut p = part("ft", PartCategory::Extrusion, 0, 0);
        p.stock_length = Some(d(99));
        let required = RequiredPart {
            part_id: p.id,
            quantity: d(10),
            cut_lengths: vec![d(120)],
        };
        let err = summarize_part(&p, &required, &CuttingOptions::default()).unwrap_err();
        assert!(matches!(err, CuttingError::CutExceedsStock { .. }));
    }

    #[test]
    fn test_csv_export_flattens_breakdown() {
        let mut p = part("ft", PartCategory::CutStock, 0, 0);
        p.stock_length = Some(d(144));
        let line = summarize_part(&p, &RequiredPart::new(p.id, d(30)), &CuttingOptions::default())
            .unwrap();
        let summary = CombinedPurchaseSummary {
            project_ids: vec![Uuid::new_v4()],
            lines: vec![line],
            parts_to_order: 1,
        };

        let csv = export_to_csv(&summary).unwrap();
        let mut rows = csv.lines();
        let header = rows.next().unwrap();
        assert!(header.starts_with("part_number,description,unit,required_qty"));
        let row = rows.next().unwrap();
        assert!(row.starts_with("EXT-100,Sill extrusion,ft,30,"));
        assert!(row.contains(",naive,144x3,3,"));
    }
}

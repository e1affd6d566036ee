//! Part catalog repository
//!
//! Parts are read on the caller's connection so that services can load them
//! inside the same transaction that later reserves against them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{Part, PartCategory, PartVariant};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct PartRow {
    id: Uuid,
    part_number: String,
    description: String,
    unit: String,
    category: String,
    qty_on_hand: Decimal,
    qty_reserved: Decimal,
    reorder_point: Option<Decimal>,
    reorder_qty: Option<Decimal>,
    vendor_id: Option<Uuid>,
    unit_cost: Option<Decimal>,
    stock_length: Option<Decimal>,
    updated_at: DateTime<Utc>,
}

impl PartRow {
    fn into_part(self, variants: Vec<PartVariant>) -> AppResult<Part> {
        let category = PartCategory::parse(&self.category).ok_or_else(|| {
            AppError::Internal(format!(
                "Part {} has unknown category '{}'",
                self.part_number, self.category
            ))
        })?;

        Ok(Part {
            id: self.id,
            part_number: self.part_number,
            description: self.description,
            unit: self.unit,
            category,
            qty_on_hand: self.qty_on_hand,
            qty_reserved: self.qty_reserved,
            reorder_point: self.reorder_point,
            reorder_qty: self.reorder_qty,
            vendor_id: self.vendor_id,
            unit_cost: self.unit_cost,
            stock_length: self.stock_length,
            variants,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct VariantRow {
    id: Uuid,
    part_id: Uuid,
    finish: String,
    stock_length: Decimal,
    qty_on_hand: Decimal,
}

impl From<VariantRow> for PartVariant {
    fn from(row: VariantRow) -> Self {
        PartVariant {
            id: row.id,
            part_id: row.part_id,
            finish: row.finish,
            stock_length: row.stock_length,
            qty_on_hand: row.qty_on_hand,
        }
    }
}

const PART_COLUMNS: &str = r#"
    id, part_number, description, unit, category, qty_on_hand, qty_reserved,
    reorder_point, reorder_qty, vendor_id, unit_cost, stock_length, updated_at
"#;

/// Load parts with their variants. `None` loads the whole catalog.
pub async fn load_parts(conn: &mut PgConnection, ids: Option<&[Uuid]>) -> AppResult<Vec<Part>> {
    let rows = match ids {
        Some(ids) => {
            sqlx::query_as::<_, PartRow>(&format!(
                "SELECT {} FROM parts WHERE id = ANY($1) ORDER BY part_number",
                PART_COLUMNS
            ))
            .bind(ids)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, PartRow>(&format!(
                "SELECT {} FROM parts ORDER BY part_number",
                PART_COLUMNS
            ))
            .fetch_all(&mut *conn)
            .await?
        }
    };

    let part_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let variant_rows = sqlx::query_as::<_, VariantRow>(
        r#"
        SELECT id, part_id, finish, stock_length, qty_on_hand
        FROM part_variants
        WHERE part_id = ANY($1)
        ORDER BY part_id, stock_length, finish
        "#,
    )
    .bind(&part_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_part: HashMap<Uuid, Vec<PartVariant>> = HashMap::new();
    for row in variant_rows {
        by_part.entry(row.part_id).or_default().push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let variants = by_part.remove(&row.id).unwrap_or_default();
            row.into_part(variants)
        })
        .collect()
}

/// Load one part or fail with NotFound
pub async fn load_part(conn: &mut PgConnection, part_id: Uuid) -> AppResult<Part> {
    load_parts(conn, Some(&[part_id]))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("Part {}", part_id)))
}

//! Loads project panels and product BOMs and expands them into required parts

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::bom::{expand_bom, BomFormula, BomItem, Panel};
use shared::models::{Project, RequiredPart};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct PanelRow {
    project_id: Uuid,
    product_id: Uuid,
    width: Decimal,
    height: Decimal,
}

#[derive(Debug, FromRow)]
struct BomItemRow {
    product_id: Uuid,
    part_id: Uuid,
    quantity: Decimal,
    formula: Option<String>,
}

impl TryFrom<BomItemRow> for BomItem {
    type Error = AppError;

    fn try_from(row: BomItemRow) -> Result<Self, Self::Error> {
        let formula = match row.formula.as_deref() {
            None => None,
            Some(f) => Some(BomFormula::parse(f).ok_or_else(|| {
                AppError::Internal(format!("Unknown BOM formula '{}'", f))
            })?),
        };
        Ok(BomItem {
            product_id: row.product_id,
            part_id: row.part_id,
            quantity: row.quantity,
            formula,
        })
    }
}

/// Required parts per project for one unit of each project
pub async fn required_parts_by_project(
    conn: &mut PgConnection,
    project_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<RequiredPart>>> {
    let panel_rows = sqlx::query_as::<_, PanelRow>(
        r#"
        SELECT o.project_id, p.product_id, p.width, p.height
        FROM opening_panels p
        JOIN project_openings o ON o.id = p.opening_id
        WHERE o.project_id = ANY($1)
        ORDER BY o.project_id, o.name, p.id
        "#,
    )
    .bind(project_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut product_ids: Vec<Uuid> = panel_rows.iter().map(|p| p.product_id).collect();
    product_ids.sort();
    product_ids.dedup();

    let items: Vec<BomItem> = sqlx::query_as::<_, BomItemRow>(
        r#"
        SELECT product_id, part_id, quantity, formula
        FROM bom_items
        WHERE product_id = ANY($1)
        ORDER BY product_id, id
        "#,
    )
    .bind(&product_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(BomItem::try_from)
    .collect::<AppResult<_>>()?;

    let mut panels: HashMap<Uuid, Vec<Panel>> = HashMap::new();
    for row in panel_rows {
        panels.entry(row.project_id).or_default().push(Panel {
            product_id: row.product_id,
            width: row.width,
            height: row.height,
        });
    }

    Ok(project_ids
        .iter()
        .map(|id| {
            let required = panels
                .get(id)
                .map(|p| expand_bom(p, &items))
                .unwrap_or_default();
            (*id, required)
        })
        .collect())
}

/// Required parts for a project's whole open quantity
pub async fn compute_required_parts(
    conn: &mut PgConnection,
    project: &Project,
) -> AppResult<Vec<RequiredPart>> {
    let per_unit = required_parts_by_project(conn, &[project.id])
        .await?
        .remove(&project.id)
        .unwrap_or_default();

    Ok(per_unit
        .iter()
        .map(|rp| rp.scaled(project.open_quantity))
        .filter(|rp| rp.quantity > Decimal::ZERO)
        .collect())
}

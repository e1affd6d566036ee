//! Purchase order quick-create from inventory alerts
//!
//! Lines are only ever appended to DRAFT purchase orders. Quick-create reuses
//! the vendor's newest draft when there is one.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    compute_line_total, generate_po_number, purchase_order_total, Part, PurchaseOrder,
    PurchaseOrderLine, PurchaseOrderStatus,
};
use shared::validation::validate_positive_quantity;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::alerts::AlertService;
use crate::services::catalog::load_part;

#[derive(Clone)]
pub struct PurchasingService {
    db: PgPool,
    alerts: AlertService,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuickCreatePoInput {
    pub part_id: Uuid,
    /// Defaults to the suggested reorder quantity
    pub quantity: Option<Decimal>,
    /// Defaults to the part's preferred vendor
    pub vendor_id: Option<Uuid>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToExistingPoInput {
    pub po_id: Uuid,
    pub part_id: Uuid,
    pub quantity: Decimal,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuickCreateResult {
    pub purchase_order: PurchaseOrder,
    /// Whether a new draft was opened
    pub created: bool,
}

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    po_number: String,
    vendor_id: Uuid,
    status: String,
    notes: Option<String>,
    total: Decimal,
    created_by_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PurchaseOrderLineRow {
    id: Uuid,
    purchase_order_id: Uuid,
    part_id: Uuid,
    part_number: String,
    description: String,
    quantity: Decimal,
    unit_cost: Decimal,
    line_total: Decimal,
    notes: Option<String>,
}

impl From<PurchaseOrderLineRow> for PurchaseOrderLine {
    fn from(row: PurchaseOrderLineRow) -> Self {
        PurchaseOrderLine {
            id: row.id,
            purchase_order_id: row.purchase_order_id,
            part_id: row.part_id,
            part_number: row.part_number,
            description: row.description,
            quantity: row.quantity,
            unit_cost: row.unit_cost,
            line_total: row.line_total,
            notes: row.notes,
        }
    }
}

async fn load_purchase_order(
    conn: &mut PgConnection,
    po_id: Uuid,
    lock: bool,
) -> AppResult<PurchaseOrder> {
    let sql = format!(
        r#"
        SELECT id, po_number, vendor_id, status, notes, total, created_by_id, created_at, updated_at
        FROM purchase_orders
        WHERE id = $1{}
        "#,
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, PurchaseOrderRow>(&sql)
        .bind(po_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Purchase order {}", po_id)))?;

    let lines = sqlx::query_as::<_, PurchaseOrderLineRow>(
        r#"
        SELECT id, purchase_order_id, part_id, part_number, description, quantity,
               unit_cost, line_total, notes
        FROM purchase_order_lines
        WHERE purchase_order_id = $1
        ORDER BY created_at, part_number
        "#,
    )
    .bind(po_id)
    .fetch_all(&mut *conn)
    .await?;

    let status = PurchaseOrderStatus::parse(&row.status).ok_or_else(|| {
        AppError::Internal(format!("Unknown purchase order status '{}'", row.status))
    })?;

    Ok(PurchaseOrder {
        id: row.id,
        po_number: row.po_number,
        vendor_id: row.vendor_id,
        status,
        notes: row.notes,
        total: row.total,
        created_by_id: row.created_by_id,
        lines: lines.into_iter().map(PurchaseOrderLine::from).collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Add `quantity` of `part` to a draft PO; an existing line for the part grows
async fn append_line(
    conn: &mut PgConnection,
    po_id: Uuid,
    part: &Part,
    quantity: Decimal,
    notes: Option<&str>,
) -> AppResult<()> {
    let unit_cost = part.unit_cost.unwrap_or(Decimal::ZERO);

    let existing = sqlx::query_as::<_, (Uuid, Decimal, Decimal)>(
        r#"
        SELECT id, quantity, unit_cost FROM purchase_order_lines
        WHERE purchase_order_id = $1 AND part_id = $2
        FOR UPDATE
        "#,
    )
    .bind(po_id)
    .bind(part.id)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some((line_id, current_qty, line_cost)) => {
            let new_qty = current_qty + quantity;
            sqlx::query(
                r#"
                UPDATE purchase_order_lines
                SET quantity = $2, line_total = $3, notes = COALESCE($4, notes)
                WHERE id = $1
                "#,
            )
            .bind(line_id)
            .bind(new_qty)
            .bind(compute_line_total(new_qty, line_cost))
            .bind(notes)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_lines (
                    purchase_order_id, part_id, part_number, description,
                    quantity, unit_cost, line_total, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(po_id)
            .bind(part.id)
            .bind(&part.part_number)
            .bind(&part.description)
            .bind(quantity)
            .bind(unit_cost)
            .bind(compute_line_total(quantity, unit_cost))
            .bind(notes)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

/// Recompute the PO total from its lines and return the refreshed PO
async fn refresh_total(conn: &mut PgConnection, po_id: Uuid) -> AppResult<PurchaseOrder> {
    let mut po = load_purchase_order(conn, po_id, false).await?;
    let total = purchase_order_total(&po.lines);
    sqlx::query("UPDATE purchase_orders SET total = $2, updated_at = NOW() WHERE id = $1")
        .bind(po_id)
        .bind(total)
        .execute(&mut *conn)
        .await?;
    po.total = total;
    Ok(po)
}

impl PurchasingService {
    pub fn new(db: PgPool, alerts: AlertService) -> Self {
        Self { db, alerts }
    }

    /// Add a part to the vendor's newest draft PO, opening one if needed
    pub async fn quick_create_po(
        &self,
        user_id: Uuid,
        input: QuickCreatePoInput,
    ) -> AppResult<QuickCreateResult> {
        input.validate()?;

        let quantity = match input.quantity {
            Some(q) => q,
            None => self.alerts.classify_part(input.part_id).await?.suggested_order_qty,
        };
        validate_positive_quantity(quantity).map_err(|msg| {
            if input.quantity.is_none() {
                AppError::validation("quantity", "Part does not need reordering; give a quantity")
            } else {
                AppError::validation("quantity", msg)
            }
        })?;

        let mut tx = self.db.begin().await?;

        let part = load_part(&mut tx, input.part_id).await?;
        let vendor_id = input.vendor_id.or(part.vendor_id).ok_or_else(|| {
            AppError::validation("vendor_id", "Part has no preferred vendor; choose a vendor")
        })?;

        let vendor_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM vendors WHERE id = $1)")
                .bind(vendor_id)
                .fetch_one(&mut *tx)
                .await?;
        if !vendor_exists {
            return Err(AppError::NotFound(format!("Vendor {}", vendor_id)));
        }

        // Serialise quick-creates per vendor so two callers don't open two drafts
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(vendor_id.to_string())
            .execute(&mut *tx)
            .await?;

        let draft = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM purchase_orders
            WHERE vendor_id = $1 AND status = 'DRAFT'
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(vendor_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (po_id, created) = match draft {
            Some(id) => (id, false),
            None => {
                let sequence =
                    sqlx::query_scalar::<_, i64>("SELECT nextval('purchase_order_number_seq')")
                        .fetch_one(&mut *tx)
                        .await?;
                let po_number = generate_po_number(Utc::now().year(), sequence);
                let id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO purchase_orders (po_number, vendor_id, status, created_by_id)
                    VALUES ($1, $2, 'DRAFT', $3)
                    RETURNING id
                    "#,
                )
                .bind(&po_number)
                .bind(vendor_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                (id, true)
            }
        };

        append_line(&mut tx, po_id, &part, quantity, input.notes.as_deref()).await?;
        let purchase_order = refresh_total(&mut tx, po_id).await?;
        tx.commit().await?;

        tracing::info!(
            %po_id,
            po_number = %purchase_order.po_number,
            part_number = %part.part_number,
            %quantity,
            created,
            "Quick-created purchase order line"
        );

        Ok(QuickCreateResult {
            purchase_order,
            created,
        })
    }

    /// Append a part to a specific draft PO
    pub async fn add_to_existing_po(&self, input: AddToExistingPoInput) -> AppResult<PurchaseOrder> {
        input.validate()?;
        validate_positive_quantity(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg))?;

        let mut tx = self.db.begin().await?;

        let po = load_purchase_order(&mut tx, input.po_id, true).await?;
        if !po.status.accepts_lines() {
            return Err(AppError::StateConflict(format!(
                "Purchase order {} is {}; only DRAFT orders accept new lines",
                po.po_number, po.status
            )));
        }

        let part = load_part(&mut tx, input.part_id).await?;
        if let Some(preferred) = part.vendor_id {
            if preferred != po.vendor_id {
                return Err(AppError::validation(
                    "part_id",
                    format!(
                        "Part {} is bought from a different vendor than this purchase order",
                        part.part_number
                    ),
                ));
            }
        }

        append_line(&mut tx, po.id, &part, input.quantity, input.notes.as_deref()).await?;
        let purchase_order = refresh_total(&mut tx, po.id).await?;
        tx.commit().await?;

        tracing::info!(
            po_id = %po.id,
            part_number = %part.part_number,
            quantity = %input.quantity,
            "Added line to purchase order"
        );
        Ok(purchase_order)
    }

    /// Get a purchase order with its lines
    pub async fn get_purchase_order(&self, po_id: Uuid) -> AppResult<PurchaseOrder> {
        let mut conn = self.db.acquire().await?;
        load_purchase_order(&mut conn, po_id, false).await
    }
}

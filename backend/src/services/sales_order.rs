//! Sales order entry, confirmation and per-part fulfillment
//!
//! Confirmation is one transaction: lock the order, derive parts from the
//! project BOM, lock the part rows, check shortages against committed and
//! other pipeline demand, insert the parts, reserve through the ledger and
//! flip the order to CONFIRMED.
//!
//! The bookkeeping push happens after commit and is awaited before the
//! response, bounded by `bookkeeping.timeout_secs`. A failure or timeout only
//! adds a warning; the confirmation stands.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::demand::{DemandSourceType, PartDemand};
use shared::models::{
    check_confirmable, compute_line_total, generate_order_number, generate_order_parts,
    plan_part_transition, rollup_order_status, SalesOrder, SalesOrderLineItem,
    SalesOrderPart, SalesOrderPartStatus, SalesOrderStatus,
};
use shared::shortage::{confirmation_shortages, ShortageReport, ShortageThresholds};
use shared::types::Warning;
use shared::validation::{validate_positive_quantity, validate_price};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::bookkeeping::{BookkeepingClient, SalesOrderConfirmed};
use crate::services::bom::compute_required_parts;
use crate::services::catalog::load_parts;
use crate::services::demand::{load_all, load_project};
use crate::services::ledger;

/// Sales order service
#[derive(Clone)]
pub struct SalesOrderService {
    db: PgPool,
    thresholds: ShortageThresholds,
    bookkeeping: Option<BookkeepingClient>,
}

// ============================================================================
// Inputs and outputs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSalesOrderInput {
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmInput {
    /// Confirm even when the order would cause shortages
    #[serde(default)]
    pub force_confirm: bool,
    /// Generate parts as PENDING without touching the ledger
    #[serde(default)]
    pub skip_reservation: bool,
}

/// Result of a confirmation attempt
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    Confirmed {
        sales_order: SalesOrder,
        parts: Vec<SalesOrderPart>,
        /// Shortages accepted with `force_confirm`
        shortages: ShortageReport,
        warnings: Vec<Warning>,
    },
    /// Nothing was written
    Blocked { shortages: ShortageReport },
}

#[derive(Debug, Deserialize)]
pub struct UpdatePartStatusInput {
    pub status: SalesOrderPartStatus,
    /// Pick quantity; defaults to everything outstanding
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkPartUpdate {
    pub part_id: Uuid,
    pub status: SalesOrderPartStatus,
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkUpdateInput {
    #[validate(length(min = 1, message = "At least one update is required"))]
    pub updates: Vec<BulkPartUpdate>,
}

#[derive(Debug, Serialize)]
pub struct BulkItemResult {
    pub part_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SalesOrderPartStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateReport {
    pub results: Vec<BulkItemResult>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Order with its generated parts
#[derive(Debug, Serialize)]
pub struct SalesOrderDetail {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub parts: Vec<SalesOrderPart>,
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct SalesOrderRow {
    id: Uuid,
    order_number: String,
    status: String,
    customer_id: Uuid,
    project_id: Option<Uuid>,
    subtotal: Decimal,
    total: Decimal,
    balance: Decimal,
    created_by_id: Option<Uuid>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SalesOrderRow {
    fn into_order(self, line_items: Vec<SalesOrderLineItem>) -> AppResult<SalesOrder> {
        let status = SalesOrderStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown sales order status '{}'", self.status))
        })?;
        Ok(SalesOrder {
            id: self.id,
            order_number: self.order_number,
            status,
            customer_id: self.customer_id,
            project_id: self.project_id,
            line_items,
            subtotal: self.subtotal,
            total: self.total,
            balance: self.balance,
            created_by_id: self.created_by_id,
            confirmed_at: self.confirmed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: Uuid,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<LineItemRow> for SalesOrderLineItem {
    fn from(row: LineItemRow) -> Self {
        SalesOrderLineItem {
            id: row.id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderPartRow {
    id: Uuid,
    sales_order_id: Uuid,
    master_part_id: Option<Uuid>,
    part_number: String,
    description: String,
    unit: String,
    quantity: Decimal,
    qty_picked: Decimal,
    qty_reserved: Decimal,
    status: String,
    picked_by_id: Option<Uuid>,
    picked_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderPartRow> for SalesOrderPart {
    type Error = AppError;

    fn try_from(row: OrderPartRow) -> Result<Self, Self::Error> {
        let status = SalesOrderPartStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown sales order part status '{}'", row.status))
        })?;
        Ok(SalesOrderPart {
            id: row.id,
            sales_order_id: row.sales_order_id,
            master_part_id: row.master_part_id,
            part_number: row.part_number,
            description: row.description,
            unit: row.unit,
            quantity: row.quantity,
            qty_picked: row.qty_picked,
            qty_reserved: row.qty_reserved,
            status,
            picked_by_id: row.picked_by_id,
            picked_at: row.picked_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = r#"
    id, order_number, status, customer_id, project_id, subtotal, total, balance,
    created_by_id, confirmed_at, created_at, updated_at
"#;

const ORDER_PART_COLUMNS: &str = r#"
    id, sales_order_id, master_part_id, part_number, description, unit, quantity,
    qty_picked, qty_reserved, status, picked_by_id, picked_at, updated_at
"#;

async fn load_order(conn: &mut PgConnection, order_id: Uuid, lock: bool) -> AppResult<SalesOrder> {
    let sql = format!(
        "SELECT {} FROM sales_orders WHERE id = $1{}",
        ORDER_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, SalesOrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sales order {}", order_id)))?;

    let items = sqlx::query_as::<_, LineItemRow>(
        r#"
        SELECT id, description, quantity, unit_price, line_total
        FROM sales_order_line_items
        WHERE sales_order_id = $1
        ORDER BY position
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    row.into_order(items.into_iter().map(SalesOrderLineItem::from).collect())
}

async fn load_order_parts(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<SalesOrderPart>> {
    sqlx::query_as::<_, OrderPartRow>(&format!(
        "SELECT {} FROM sales_order_parts WHERE sales_order_id = $1 ORDER BY part_number, id",
        ORDER_PART_COLUMNS
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(SalesOrderPart::try_from)
    .collect()
}

async fn lock_order_part(
    conn: &mut PgConnection,
    order_id: Uuid,
    part_id: Uuid,
) -> AppResult<SalesOrderPart> {
    let row = sqlx::query_as::<_, OrderPartRow>(&format!(
        "SELECT {} FROM sales_order_parts WHERE id = $1 AND sales_order_id = $2 FOR UPDATE",
        ORDER_PART_COLUMNS
    ))
    .bind(part_id)
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Sales order part {}", part_id)))?;

    SalesOrderPart::try_from(row)
}

async fn insert_order_part(conn: &mut PgConnection, part: &SalesOrderPart) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales_order_parts (
            id, sales_order_id, master_part_id, part_number, description, unit,
            quantity, qty_picked, qty_reserved, status, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(part.id)
    .bind(part.sales_order_id)
    .bind(part.master_part_id)
    .bind(&part.part_number)
    .bind(&part.description)
    .bind(&part.unit)
    .bind(part.quantity)
    .bind(part.qty_picked)
    .bind(part.qty_reserved)
    .bind(part.status.as_str())
    .bind(part.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn validate_line_items(items: &[LineItemInput]) -> AppResult<()> {
    for (i, item) in items.iter().enumerate() {
        item.validate()?;
        validate_positive_quantity(item.quantity)
            .map_err(|msg| AppError::validation(&format!("line_items[{}].quantity", i), msg))?;
        validate_price(item.unit_price)
            .map_err(|msg| AppError::validation(&format!("line_items[{}].unit_price", i), msg))?;
    }
    Ok(())
}

impl SalesOrderService {
    pub fn new(
        db: PgPool,
        thresholds: ShortageThresholds,
        bookkeeping: Option<BookkeepingClient>,
    ) -> Self {
        Self {
            db,
            thresholds,
            bookkeeping,
        }
    }

    /// Create a DRAFT order
    pub async fn create_order(
        &self,
        user_id: Uuid,
        input: CreateSalesOrderInput,
    ) -> AppResult<SalesOrderDetail> {
        input.validate()?;
        validate_line_items(&input.line_items)?;

        let mut tx = self.db.begin().await?;

        let customer_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(input.customer_id)
                .fetch_one(&mut *tx)
                .await?;
        if !customer_exists {
            return Err(AppError::NotFound(format!("Customer {}", input.customer_id)));
        }
        if let Some(project_id) = input.project_id {
            load_project(&mut tx, project_id).await?;
        }

        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('sales_order_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let now = Utc::now();
        let order_number = generate_order_number(now.year(), sequence);

        let line_totals: Vec<Decimal> = input
            .line_items
            .iter()
            .map(|item| compute_line_total(item.quantity, item.unit_price))
            .collect();
        let subtotal: Decimal = line_totals.iter().sum();

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales_orders (
                order_number, status, customer_id, project_id, subtotal, total, balance,
                created_by_id, created_at, updated_at
            )
            VALUES ($1, 'DRAFT', $2, $3, $4, $4, 0, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(&order_number)
        .bind(input.customer_id)
        .bind(input.project_id)
        .bind(subtotal)
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (position, (item, line_total)) in input.line_items.iter().zip(&line_totals).enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sales_order_line_items (
                    sales_order_id, position, description, quantity, unit_price, line_total
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id)
            .bind(position as i32)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(*line_total)
            .execute(&mut *tx)
            .await?;
        }

        let order = load_order(&mut tx, order_id, false).await?;
        tx.commit().await?;

        tracing::info!(%order_id, order_number = %order.order_number, "Created sales order");
        Ok(SalesOrderDetail {
            order,
            parts: Vec::new(),
        })
    }

    /// Get an order with its generated parts
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<SalesOrderDetail> {
        let mut conn = self.db.acquire().await?;
        let order = load_order(&mut conn, order_id, false).await?;
        let parts = load_order_parts(&mut conn, order_id).await?;
        Ok(SalesOrderDetail { order, parts })
    }

    /// Confirm a DRAFT order
    pub async fn confirm(
        &self,
        order_id: Uuid,
        input: ConfirmInput,
        user_id: Uuid,
    ) -> AppResult<ConfirmOutcome> {
        let mut tx = self.db.begin().await?;

        let order = load_order(&mut tx, order_id, true).await?;
        let existing_parts =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales_order_parts WHERE sales_order_id = $1")
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await?;
        let project_id = check_confirmable(&order, existing_parts as usize)?;

        let project = load_project(&mut tx, project_id).await?;
        let required = compute_required_parts(&mut tx, &project).await?;

        let part_ids: Vec<Uuid> = required.iter().map(|rp| rp.part_id).collect();
        // Held until commit: a competing confirmation reads stock only after
        // this one's reservations are visible
        ledger::lock_parts(&mut tx, &part_ids).await?;
        let catalog = load_parts(&mut tx, Some(part_ids.as_slice())).await?;
        if let Some(missing) = part_ids.iter().find(|id| !catalog.iter().any(|p| p.id == **id)) {
            return Err(AppError::NotFound(format!("Part {}", missing)));
        }

        // The project's own projection is what this order replaces
        let demands: BTreeMap<Uuid, PartDemand> = load_all(&mut tx)
            .await?
            .into_iter()
            .map(|(part_id, demand)| {
                let own = demand.quantity_from(DemandSourceType::Projected, project_id);
                if !own.is_zero() {
                    tracing::debug!(%order_id, %part_id, %own, "Superseding project projection");
                }
                (part_id, demand.without_origin(project_id))
            })
            .collect();
        let shortages = confirmation_shortages(&required, &catalog, &demands, &self.thresholds);

        if shortages.has_shortage() && !input.force_confirm {
            tracing::info!(
                %order_id,
                short_parts = shortages.lines.len(),
                "Confirmation blocked by shortages"
            );
            return Ok(ConfirmOutcome::Blocked { shortages });
        }

        let now = Utc::now();
        let reserve = !input.skip_reservation;
        let parts = generate_order_parts(order_id, &required, &catalog, reserve, now);
        for part in &parts {
            insert_order_part(&mut tx, part).await?;
        }

        if reserve {
            let lines: Vec<(Uuid, Decimal)> = parts
                .iter()
                .filter_map(|p| p.master_part_id.map(|id| (id, p.qty_reserved)))
                .collect();
            ledger::reserve_all(&mut tx, &lines).await?;
        }

        sqlx::query(
            r#"
            UPDATE sales_orders
            SET status = 'CONFIRMED', balance = total, confirmed_at = $2, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let sales_order = load_order(&mut tx, order_id, false).await?;
        let parts = load_order_parts(&mut tx, order_id).await?;
        tx.commit().await?;

        tracing::info!(
            %order_id,
            %user_id,
            parts = parts.len(),
            reserved = reserve,
            forced = shortages.has_shortage(),
            "Confirmed sales order"
        );

        let warnings = self.notify_bookkeeping(&sales_order).await;

        Ok(ConfirmOutcome::Confirmed {
            sales_order,
            parts,
            shortages,
            warnings,
        })
    }

    async fn notify_bookkeeping(&self, order: &SalesOrder) -> Vec<Warning> {
        let Some(client) = &self.bookkeeping else {
            return Vec::new();
        };

        let event = SalesOrderConfirmed {
            sales_order_id: order.id,
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            total: order.total,
            balance: order.balance,
        };
        match client.notify_order_confirmed(&event).await {
            Ok(ack) => {
                tracing::debug!(order_id = %order.id, external_id = ?ack.external_id, "Bookkeeping notified");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Bookkeeping notification failed");
                vec![Warning::external_sync("bookkeeping", e.to_string())]
            }
        }
    }

    /// Move one order part to a new status in its own transaction
    pub async fn update_part_status(
        &self,
        order_id: Uuid,
        part_id: Uuid,
        input: UpdatePartStatusInput,
        user_id: Uuid,
    ) -> AppResult<SalesOrderPart> {
        let mut tx = self.db.begin().await?;

        let order = load_order(&mut tx, order_id, true).await?;
        if !order.status.is_committed() {
            return Err(AppError::StateConflict(format!(
                "Order {} is {}; parts can only change on confirmed orders",
                order.order_number, order.status
            )));
        }

        let part = lock_order_part(&mut tx, order_id, part_id).await?;
        let plan = plan_part_transition(&part, input.status, input.quantity)?;

        if let Some(master_part_id) = part.master_part_id {
            if plan.reserve > Decimal::ZERO {
                ledger::reserve(&mut tx, master_part_id, plan.reserve).await?;
            }
            if plan.release > Decimal::ZERO {
                ledger::release(&mut tx, master_part_id, plan.release).await?;
            }
            if plan.deduct_on_hand > Decimal::ZERO {
                ledger::deduct_on_hand(&mut tx, master_part_id, plan.deduct_on_hand).await?;
            }
        }

        let now = Utc::now();
        let picking = input.status == SalesOrderPartStatus::Picked;
        sqlx::query(
            r#"
            UPDATE sales_order_parts
            SET status = $2,
                qty_picked = $3,
                qty_reserved = $4,
                picked_by_id = CASE WHEN $5 THEN $6 ELSE picked_by_id END,
                picked_at = CASE WHEN $5 THEN $7 ELSE picked_at END,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(part_id)
        .bind(plan.to.as_str())
        .bind(plan.qty_picked)
        .bind(plan.qty_reserved)
        .bind(picking)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let parts = load_order_parts(&mut tx, order_id).await?;
        let rolled_up = rollup_order_status(order.status, &parts);
        if rolled_up != order.status {
            sqlx::query("UPDATE sales_orders SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(order_id)
                .bind(rolled_up.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            %order_id,
            %part_id,
            from = %plan.from,
            to = %plan.to,
            order_status = %rolled_up,
            "Updated sales order part"
        );

        parts
            .into_iter()
            .find(|p| p.id == part_id)
            .ok_or_else(|| AppError::Internal(format!("Sales order part {} vanished", part_id)))
    }

    /// Apply several part updates, each committed on its own
    pub async fn bulk_update_parts(
        &self,
        order_id: Uuid,
        input: BulkUpdateInput,
        user_id: Uuid,
    ) -> AppResult<BulkUpdateReport> {
        input.validate()?;

        let mut results = Vec::with_capacity(input.updates.len());
        for update in input.updates {
            let single = UpdatePartStatusInput {
                status: update.status,
                quantity: update.quantity,
            };
            let result = match self
                .update_part_status(order_id, update.part_id, single, user_id)
                .await
            {
                Ok(part) => BulkItemResult {
                    part_id: update.part_id,
                    success: true,
                    status: Some(part.status),
                    error: None,
                },
                Err(e) => {
                    tracing::debug!(part_id = %update.part_id, error = %e, "Bulk item failed");
                    BulkItemResult {
                        part_id: update.part_id,
                        success: false,
                        status: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Ok(BulkUpdateReport {
            results,
            succeeded,
            failed,
        })
    }
}

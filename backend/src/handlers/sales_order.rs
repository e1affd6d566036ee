//! HTTP handlers for sales order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::models::SalesOrderPart;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sales_order::{
    BulkUpdateInput, BulkUpdateReport, ConfirmInput, ConfirmOutcome, CreateSalesOrderInput,
    SalesOrderDetail, UpdatePartStatusInput,
};
use crate::services::SalesOrderService;
use crate::AppState;

fn service(state: AppState) -> SalesOrderService {
    SalesOrderService::new(
        state.db,
        state.config.inventory.thresholds(),
        state.bookkeeping,
    )
}

/// Create a DRAFT sales order
pub async fn create_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSalesOrderInput>,
) -> AppResult<(StatusCode, Json<SalesOrderDetail>)> {
    let order = service(state)
        .create_order(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get a sales order with its generated parts
pub async fn get_sales_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderDetail>> {
    let order = service(state).get_order(order_id).await?;
    Ok(Json(order))
}

/// Confirm a DRAFT order: generate parts and reserve stock.
///
/// A shortage block is a normal 200 response with `outcome: "blocked"`.
pub async fn confirm_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    input: Option<Json<ConfirmInput>>,
) -> AppResult<Json<ConfirmOutcome>> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let outcome = service(state)
        .confirm(order_id, input, current_user.0.user_id)
        .await?;
    Ok(Json(outcome))
}

/// Move one order part to a new status
pub async fn update_part_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((order_id, part_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdatePartStatusInput>,
) -> AppResult<Json<SalesOrderPart>> {
    let part = service(state)
        .update_part_status(order_id, part_id, input, current_user.0.user_id)
        .await?;
    Ok(Json(part))
}

/// Apply several part updates; each succeeds or fails independently
pub async fn bulk_update_parts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<BulkUpdateInput>,
) -> AppResult<Json<BulkUpdateReport>> {
    let report = service(state)
        .bulk_update_parts(order_id, input, current_user.0.user_id)
        .await?;
    Ok(Json(report))
}

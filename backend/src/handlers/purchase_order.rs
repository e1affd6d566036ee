//! HTTP handlers for purchase order endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::models::PurchaseOrder;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::purchasing::{AddToExistingPoInput, QuickCreatePoInput, QuickCreateResult};
use crate::services::{AlertService, PurchasingService};
use crate::AppState;

fn service(state: AppState) -> PurchasingService {
    let alerts = AlertService::new(
        state.db.clone(),
        state.config.inventory.thresholds(),
        state.config.inventory.include_healthy,
    );
    PurchasingService::new(state.db, alerts)
}

/// Add a part to the vendor's draft PO, creating the PO if needed
pub async fn quick_create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<QuickCreatePoInput>,
) -> AppResult<Json<QuickCreateResult>> {
    let result = service(state)
        .quick_create_po(current_user.0.user_id, input)
        .await?;
    Ok(Json(result))
}

/// Append a part to a chosen draft PO
pub async fn add_to_existing(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<AddToExistingPoInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let po = service(state).add_to_existing_po(input).await?;
    Ok(Json(po))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let po = service(state).get_purchase_order(po_id).await?;
    Ok(Json(po))
}

//! HTTP handlers for inventory alert endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::demand::PartDemand;
use shared::shortage::InventoryAlertReport;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{AlertService, DemandService};
use crate::AppState;

/// Classify every part against its demand
pub async fn get_inventory_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<InventoryAlertReport>> {
    let service = AlertService::new(
        state.db,
        state.config.inventory.thresholds(),
        state.config.inventory.include_healthy,
    );
    let report = service.inventory_alerts().await?;
    Ok(Json(report))
}

/// Demand attribution for one part
pub async fn get_part_demand(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<PartDemand>> {
    let service = DemandService::new(state.db);
    let demand = service.aggregate_demand(part_id).await?;
    Ok(Json(demand))
}

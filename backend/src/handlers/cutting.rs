//! Stand-alone cutting optimizer endpoint

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::cutting::{optimize, CuttingOptions, CuttingPlan};
use shared::validation::{validate_kerf, validate_stock_lengths};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OptimizeCutsInput {
    /// Cut lengths in inches
    pub required_lengths: Vec<Decimal>,
    /// Purchasable stock lengths in inches
    pub stock_lengths: Vec<Decimal>,
    /// Overrides the configured kerf
    pub kerf: Option<Decimal>,
}

/// Plan stock purchases for a list of cuts
pub async fn optimize_cuts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<OptimizeCutsInput>,
) -> AppResult<Json<CuttingPlan>> {
    validate_stock_lengths(&input.stock_lengths)
        .map_err(|msg| AppError::validation("stock_lengths", msg))?;

    let mut options: CuttingOptions = state.config.cutting.options();
    if let Some(kerf) = input.kerf {
        validate_kerf(kerf).map_err(|msg| AppError::validation("kerf", msg))?;
        options.kerf = kerf;
    }

    let plan = optimize(&input.required_lengths, &input.stock_lengths, &options)?;
    tracing::debug!(
        cuts = input.required_lengths.len(),
        pieces = plan.piece_count(),
        waste_percent = %plan.waste_percent,
        "Optimized cut list"
    );
    Ok(Json(plan))
}

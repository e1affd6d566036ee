//! HTTP handlers for purchase planning

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::types::ExportFormat;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::purchase_summary::{export_to_csv, CombinedSummaryInput};
use crate::services::PurchaseSummaryService;
use crate::AppState;

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// Combined purchase summary for a set of projects, as JSON or CSV
pub async fn combined_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ExportQuery>,
    Json(input): Json<CombinedSummaryInput>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseSummaryService::new(state.db, state.config.cutting.options());
    let summary = service.combined_summary(input).await?;

    match query.format {
        ExportFormat::Csv => {
            let csv = export_to_csv(&summary)?;
            Ok((
                [
                    (header::CONTENT_TYPE, ExportFormat::Csv.content_type()),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"combined_purchase_summary.csv\"",
                    ),
                ],
                csv,
            )
                .into_response())
        }
        ExportFormat::Json => Ok(Json(summary).into_response()),
    }
}

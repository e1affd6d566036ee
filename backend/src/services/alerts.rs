//! Inventory alerts: classify every part against its aggregated demand
//!
//! Parts and demand are read from one snapshot so that a pick committing
//! mid-report cannot be half observed.

use shared::demand::aggregate_demand;
use shared::shortage::{
    build_alert_report, classify, InventoryAlertReport, ShortageClassification,
    ShortageThresholds,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{load_part, load_parts};
use crate::services::demand::{begin_snapshot, committed_lines, load_all, pipeline_demand};

#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    thresholds: ShortageThresholds,
    include_healthy: bool,
}

impl AlertService {
    pub fn new(db: PgPool, thresholds: ShortageThresholds, include_healthy: bool) -> Self {
        Self {
            db,
            thresholds,
            include_healthy,
        }
    }

    /// Alert report for the whole catalog, most urgent first
    pub async fn inventory_alerts(&self) -> AppResult<InventoryAlertReport> {
        let mut tx = begin_snapshot(&self.db).await?;
        let parts = load_parts(&mut tx, None).await?;
        let demands = load_all(&mut tx).await?;
        tx.commit().await?;

        let report = build_alert_report(&parts, &demands, &self.thresholds, self.include_healthy);
        tracing::info!(
            total = report.summary.total,
            critical = report.summary.critical,
            low = report.summary.low,
            projected = report.summary.projected,
            "Built inventory alert report"
        );
        Ok(report)
    }

    /// Classification of a single part
    pub async fn classify_part(&self, part_id: Uuid) -> AppResult<ShortageClassification> {
        let mut tx = begin_snapshot(&self.db).await?;
        let part = load_part(&mut tx, part_id).await?;
        let committed = committed_lines(&mut tx, Some(part_id)).await?;
        let pipeline = pipeline_demand(&mut tx).await?;
        tx.commit().await?;

        let demand = aggregate_demand(part_id, &committed, &pipeline);
        Ok(classify(&part, &demand, &self.thresholds))
    }
}

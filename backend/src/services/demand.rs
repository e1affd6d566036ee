//! Demand snapshot loading
//!
//! Reads committed order lines and pipeline projects, then hands them to the
//! pure aggregator in `shared::demand`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::demand::{
    aggregate_all, aggregate_demand, pipeline_requirements, CommittedLine, PartDemand,
    PipelineRequirement,
};
use shared::models::{Project, ProjectStatus, SalesOrderPart, SalesOrderPartStatus, SalesOrderStatus};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::bom::required_parts_by_project;

#[derive(Clone)]
pub struct DemandService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct CommittedRow {
    id: Uuid,
    sales_order_id: Uuid,
    order_number: String,
    order_status: String,
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
    expected_date: Option<NaiveDate>,
}

impl CommittedRow {
    fn into_line(self) -> AppResult<Option<CommittedLine>> {
        let order_status = SalesOrderStatus::parse(&self.order_status).ok_or_else(|| {
            AppError::Internal(format!("Unknown sales order status '{}'", self.order_status))
        })?;
        let status = SalesOrderPartStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown sales order part status '{}'", self.status))
        })?;

        let part = SalesOrderPart {
            id: self.id,
            sales_order_id: self.sales_order_id,
            master_part_id: self.master_part_id,
            part_number: self.part_number,
            description: self.description,
            unit: self.unit,
            quantity: self.quantity,
            qty_picked: self.qty_picked,
            qty_reserved: self.qty_reserved,
            status,
            picked_by_id: self.picked_by_id,
            picked_at: self.picked_at,
            updated_at: self.updated_at,
        };

        Ok(CommittedLine::from_order_part(
            &self.order_number,
            order_status,
            &part,
            self.expected_date,
        ))
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    status: String,
    open_quantity: Decimal,
    expected_date: Option<NaiveDate>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let status = ProjectStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown project status '{}'", row.status))
        })?;
        Ok(Project {
            id: row.id,
            name: row.name,
            status,
            open_quantity: row.open_quantity,
            expected_date: row.expected_date,
        })
    }
}

/// Open lines of committed orders, optionally for a single part
pub async fn committed_lines(
    conn: &mut PgConnection,
    part_id: Option<Uuid>,
) -> AppResult<Vec<CommittedLine>> {
    let rows = sqlx::query_as::<_, CommittedRow>(
        r#"
        SELECT sop.id, sop.sales_order_id, so.order_number, so.status AS order_status,
               sop.master_part_id, sop.part_number, sop.description, sop.unit,
               sop.quantity, sop.qty_picked, sop.qty_reserved, sop.status,
               sop.picked_by_id, sop.picked_at, sop.updated_at,
               p.expected_date
        FROM sales_order_parts sop
        JOIN sales_orders so ON so.id = sop.sales_order_id
        LEFT JOIN projects p ON p.id = so.project_id
        WHERE so.status IN ('CONFIRMED', 'PARTIALLY_SHIPPED')
          AND sop.status IN ('PENDING', 'RESERVED')
          AND sop.master_part_id IS NOT NULL
          AND ($1::uuid IS NULL OR sop.master_part_id = $1)
        ORDER BY so.order_number, sop.id
        "#,
    )
    .bind(part_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(line) = row.into_line()? {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Load one project or fail with NotFound
pub async fn load_project(conn: &mut PgConnection, project_id: Uuid) -> AppResult<Project> {
    let row = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, name, status, open_quantity, expected_date FROM projects WHERE id = $1",
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Project {}", project_id)))?;

    Project::try_from(row)
}

/// Pipeline projects that have no confirmed (or later) sales order yet
pub async fn pipeline_projects(conn: &mut PgConnection) -> AppResult<Vec<Project>> {
    let pipeline: Vec<String> = ProjectStatus::all()
        .iter()
        .filter(|s| s.is_pipeline())
        .map(|s| s.as_str().to_string())
        .collect();

    sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT p.id, p.name, p.status, p.open_quantity, p.expected_date
        FROM projects p
        WHERE p.status = ANY($1)
          AND NOT EXISTS (
              SELECT 1 FROM sales_orders so
              WHERE so.project_id = p.id
                AND so.status IN ('CONFIRMED', 'PARTIALLY_SHIPPED', 'SHIPPED')
          )
        ORDER BY p.name, p.id
        "#,
    )
    .bind(&pipeline)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Project::try_from)
    .collect()
}

/// Projected requirements of every pipeline project
pub async fn pipeline_demand(conn: &mut PgConnection) -> AppResult<Vec<PipelineRequirement>> {
    let projects = pipeline_projects(conn).await?;
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    let required = required_parts_by_project(conn, &ids).await?;

    Ok(projects
        .iter()
        .flat_map(|project| {
            let parts = required.get(&project.id).map(Vec::as_slice).unwrap_or(&[]);
            pipeline_requirements(project, parts)
        })
        .collect())
}

/// Read-only transaction with one snapshot for every statement, so stock
/// levels and open order lines are observed at the same instant
pub async fn begin_snapshot(db: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

impl DemandService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Reserved and projected demand for one part with its source breakdown
    pub async fn aggregate_demand(&self, part_id: Uuid) -> AppResult<PartDemand> {
        let mut tx = begin_snapshot(&self.db).await?;
        let committed = committed_lines(&mut tx, Some(part_id)).await?;
        let pipeline = pipeline_demand(&mut tx).await?;
        tx.commit().await?;

        let demand = aggregate_demand(part_id, &committed, &pipeline);
        tracing::debug!(
            %part_id,
            reserved = %demand.reserved,
            projected = %demand.projected,
            sources = demand.sources.len(),
            "Aggregated part demand"
        );
        Ok(demand)
    }
}

/// Demand for every part that has any
pub async fn load_all(conn: &mut PgConnection) -> AppResult<BTreeMap<Uuid, PartDemand>> {
    let committed = committed_lines(conn, None).await?;
    let pipeline = pipeline_demand(conn).await?;
    Ok(aggregate_all(&committed, &pipeline))
}

//! Demand aggregation
//!
//! Total demand for a part is what confirmed orders still need (reserved)
//! plus what open pipeline projects imply through their BOMs (projected).
//! Every unit is attributed to exactly one origin, so
//! `sum(sources) == reserved + projected` always holds.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Project, RequiredPart, SalesOrderPart, SalesOrderStatus};

/// Where a unit of demand comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DemandSourceType {
    Reserved,
    Projected,
}

/// Demand attributed to one sales order or project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandSource {
    pub source_type: DemandSourceType,
    pub origin_id: Uuid,
    /// Order number or project name
    pub origin_label: String,
    pub quantity: Decimal,
    pub expected_date: Option<NaiveDate>,
}

/// Aggregated demand for one part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDemand {
    pub part_id: Uuid,
    pub reserved: Decimal,
    pub projected: Decimal,
    pub sources: Vec<DemandSource>,
}

impl PartDemand {
    pub fn empty(part_id: Uuid) -> Self {
        Self {
            part_id,
            reserved: Decimal::ZERO,
            projected: Decimal::ZERO,
            sources: Vec::new(),
        }
    }

    pub fn total(&self) -> Decimal {
        self.reserved + self.projected
    }

    /// Source breakdown sums to the totals
    pub fn reconciles(&self) -> bool {
        let sum: Decimal = self.sources.iter().map(|s| s.quantity).sum();
        sum == self.total()
    }

    /// Sum of the sources of one type for one origin
    pub fn quantity_from(&self, source_type: DemandSourceType, origin_id: Uuid) -> Decimal {
        self.sources
            .iter()
            .filter(|s| s.source_type == source_type && s.origin_id == origin_id)
            .map(|s| s.quantity)
            .sum()
    }

    /// Drop one origin's contribution (e.g. the project an order is being
    /// confirmed from)
    pub fn without_origin(&self, origin_id: Uuid) -> Self {
        let sources: Vec<DemandSource> = self
            .sources
            .iter()
            .filter(|s| s.origin_id != origin_id)
            .cloned()
            .collect();
        from_sources(self.part_id, sources)
    }
}

/// Outstanding commitment of one confirmed order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedLine {
    pub sales_order_id: Uuid,
    pub order_number: String,
    pub part_id: Uuid,
    pub quantity: Decimal,
    pub expected_date: Option<NaiveDate>,
}

impl CommittedLine {
    /// Only open, tracked lines of committed orders carry demand
    pub fn from_order_part(
        order_number: &str,
        order_status: SalesOrderStatus,
        part: &SalesOrderPart,
        expected_date: Option<NaiveDate>,
    ) -> Option<Self> {
        let part_id = part.master_part_id?;
        if !order_status.is_committed() || !part.status.is_open() {
            return None;
        }
        let quantity = part.outstanding();
        if quantity <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            sales_order_id: part.sales_order_id,
            order_number: order_number.to_string(),
            part_id,
            quantity,
            expected_date,
        })
    }
}

/// Requirement of a pipeline project for one part, already scaled by the
/// project's open quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequirement {
    pub project_id: Uuid,
    pub project_name: String,
    pub part_id: Uuid,
    pub quantity: Decimal,
    pub expected_date: Option<NaiveDate>,
}

/// Turn a project's per-unit BOM requirements into pipeline requirements.
/// Projects outside the pipeline yield nothing.
pub fn pipeline_requirements(project: &Project, required: &[RequiredPart]) -> Vec<PipelineRequirement> {
    if !project.status.is_pipeline() || project.open_quantity <= Decimal::ZERO {
        return Vec::new();
    }
    required
        .iter()
        .map(|rp| PipelineRequirement {
            project_id: project.id,
            project_name: project.name.clone(),
            part_id: rp.part_id,
            quantity: rp.quantity * project.open_quantity,
            expected_date: project.expected_date,
        })
        .filter(|r| r.quantity > Decimal::ZERO)
        .collect()
}

/// Aggregate demand for one part
pub fn aggregate_demand(
    part_id: Uuid,
    committed: &[CommittedLine],
    pipeline: &[PipelineRequirement],
) -> PartDemand {
    let reserved = committed.iter().filter(|c| c.part_id == part_id).map(|c| DemandSource {
        source_type: DemandSourceType::Reserved,
        origin_id: c.sales_order_id,
        origin_label: c.order_number.clone(),
        quantity: c.quantity,
        expected_date: c.expected_date,
    });
    let projected = pipeline.iter().filter(|p| p.part_id == part_id).map(|p| DemandSource {
        source_type: DemandSourceType::Projected,
        origin_id: p.project_id,
        origin_label: p.project_name.clone(),
        quantity: p.quantity,
        expected_date: p.expected_date,
    });

    from_sources(part_id, reserved.chain(projected).collect())
}

/// Aggregate demand for every part that has any
pub fn aggregate_all(
    committed: &[CommittedLine],
    pipeline: &[PipelineRequirement],
) -> BTreeMap<Uuid, PartDemand> {
    let mut part_ids: Vec<Uuid> = committed
        .iter()
        .map(|c| c.part_id)
        .chain(pipeline.iter().map(|p| p.part_id))
        .collect();
    part_ids.sort();
    part_ids.dedup();

    part_ids
        .into_iter()
        .map(|id| (id, aggregate_demand(id, committed, pipeline)))
        .collect()
}

/// Merge same-origin sources, drop empty ones and order them deterministically
fn from_sources(part_id: Uuid, raw: Vec<DemandSource>) -> PartDemand {
    let mut merged: BTreeMap<(DemandSourceType, Uuid), DemandSource> = BTreeMap::new();
    for source in raw {
        merged
            .entry((source.source_type, source.origin_id))
            .and_modify(|existing| {
                existing.quantity += source.quantity;
                existing.expected_date = match (existing.expected_date, source.expected_date) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            })
            .or_insert(source);
    }

    let mut sources: Vec<DemandSource> = merged
        .into_values()
        .filter(|s| !s.quantity.is_zero())
        .collect();
    sources.sort_by(|a, b| {
        a.source_type
            .cmp(&b.source_type)
            .then_with(|| match (a.expected_date, b.expected_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.origin_label.cmp(&b.origin_label))
            .then_with(|| a.origin_id.cmp(&b.origin_id))
    });

    let total_of = |t: DemandSourceType| -> Decimal {
        sources
            .iter()
            .filter(|s| s.source_type == t)
            .map(|s| s.quantity)
            .sum()
    };

    PartDemand {
        part_id,
        reserved: total_of(DemandSourceType::Reserved),
        projected: total_of(DemandSourceType::Projected),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn committed(order: Uuid, label: &str, part: Uuid, qty: i64) -> CommittedLine {
        CommittedLine {
            sales_order_id: order,
            order_number: label.to_string(),
            part_id: part,
            quantity: d(qty),
            expected_date: None,
        }
    }

    #[test]
    fn test_same_origin_lines_merge() {
        let part = Uuid::new_v4();
        let order = Uuid::new_v4();
        let lines = vec![
            committed(order, "SO-2025-00001", part, 4),
            committed(order, "SO-2025-00001", part, 6),
        ];

        let demand = aggregate_demand(part, &lines, &[]);
        assert_eq!(demand.reserved, d(10));
        assert_eq!(demand.sources.len(), 1);
        assert!(demand.reconciles());
    }

    #[test]
    fn test_reserved_and_projected_split() {
        let part = Uuid::new_v4();
        let project = Uuid::new_v4();
        let lines = vec![committed(Uuid::new_v4(), "SO-1", part, 12)];
        let pipeline = vec![PipelineRequirement {
            project_id: project,
            project_name: "Harbor Lofts".to_string(),
            part_id: part,
            quantity: d(5),
            expected_date: None,
        }];

        let demand = aggregate_demand(part, &lines, &pipeline);
        assert_eq!(demand.reserved, d(12));
        assert_eq!(demand.projected, d(5));
        assert_eq!(demand.sources[0].source_type, DemandSourceType::Reserved);
        assert_eq!(demand.quantity_from(DemandSourceType::Projected, project), d(5));

        let without = demand.without_origin(project);
        assert_eq!(without.projected, Decimal::ZERO);
        assert_eq!(without.reserved, d(12));
    }

    #[test]
    fn test_other_parts_ignored() {
        let part = Uuid::new_v4();
        let lines = vec![committed(Uuid::new_v4(), "SO-1", Uuid::new_v4(), 3)];
        let demand = aggregate_demand(part, &lines, &[]);
        assert_eq!(demand, PartDemand::empty(part));
    }

    #[test]
    fn test_pipeline_scaled_by_open_quantity() {
        let project = Project {
            id: Uuid::new_v4(),
            name: "Cedar Row".to_string(),
            status: ProjectStatus::QuoteSent,
            open_quantity: d(3),
            expected_date: None,
        };
        let part = Uuid::new_v4();
        let reqs = pipeline_requirements(&project, &[RequiredPart::new(part, d(4))]);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].quantity, d(12));

        let lost = Project {
            status: ProjectStatus::Lost,
            ..project
        };
        assert!(pipeline_requirements(&lost, &[RequiredPart::new(part, d(4))]).is_empty());
    }

    #[test]
    fn test_aggregate_all_covers_every_part() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = vec![committed(Uuid::new_v4(), "SO-1", a, 1)];
        let pipeline = vec![PipelineRequirement {
            project_id: Uuid::new_v4(),
            project_name: "P".to_string(),
            part_id: b,
            quantity: d(2),
            expected_date: None,
        }];

        let all = aggregate_all(&lines, &pipeline);
        assert_eq!(all.len(), 2);
        assert_eq!(all[&a].reserved, d(1));
        assert_eq!(all[&b].projected, d(2));
    }
}

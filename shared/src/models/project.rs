//! Project (pipeline) models

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer project; unconfirmed projects form the sales pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    /// Number of units of the project still open (multiplies its BOM)
    pub open_quantity: Decimal,
    pub expected_date: Option<NaiveDate>,
}

/// Project pipeline stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Lead,
    Staging,
    Approved,
    QuoteSent,
    Won,
    Lost,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Lead => "LEAD",
            ProjectStatus::Staging => "STAGING",
            ProjectStatus::Approved => "APPROVED",
            ProjectStatus::QuoteSent => "QUOTE_SENT",
            ProjectStatus::Won => "WON",
            ProjectStatus::Lost => "LOST",
            ProjectStatus::Archived => "ARCHIVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LEAD" => Some(ProjectStatus::Lead),
            "STAGING" => Some(ProjectStatus::Staging),
            "APPROVED" => Some(ProjectStatus::Approved),
            "QUOTE_SENT" => Some(ProjectStatus::QuoteSent),
            "WON" => Some(ProjectStatus::Won),
            "LOST" => Some(ProjectStatus::Lost),
            "ARCHIVED" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }

    /// Open pipeline stages contribute projected demand
    pub fn is_pipeline(&self) -> bool {
        !matches!(self, ProjectStatus::Lost | ProjectStatus::Archived)
    }

    pub fn all() -> &'static [ProjectStatus] {
        &[
            ProjectStatus::Lead,
            ProjectStatus::Staging,
            ProjectStatus::Approved,
            ProjectStatus::QuoteSent,
            ProjectStatus::Won,
            ProjectStatus::Lost,
            ProjectStatus::Archived,
        ]
    }
}

/// A part (and optionally its individual cut lengths) required by a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredPart {
    pub part_id: Uuid,
    pub quantity: Decimal,
    /// Individual cut lengths in inches, when tracked
    #[serde(default)]
    pub cut_lengths: Vec<Decimal>,
}

impl RequiredPart {
    pub fn new(part_id: Uuid, quantity: Decimal) -> Self {
        Self {
            part_id,
            quantity,
            cut_lengths: Vec::new(),
        }
    }

    /// Scale by a project's open quantity. Cut lists are only repeatable for
    /// whole-unit multipliers; fractional multipliers drop them.
    pub fn scaled(&self, multiplier: Decimal) -> Self {
        let whole_units = if multiplier.fract().is_zero() {
            multiplier.to_usize()
        } else {
            None
        };

        let cut_lengths = if let Some(times) = whole_units {
            let mut cuts = Vec::with_capacity(self.cut_lengths.len() * times);
            for _ in 0..times {
                cuts.extend_from_slice(&self.cut_lengths);
            }
            cuts
        } else {
            Vec::new()
        };

        Self {
            part_id: self.part_id,
            quantity: self.quantity * multiplier,
            cut_lengths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_statuses() {
        let pipeline: Vec<_> = ProjectStatus::all()
            .iter()
            .filter(|s| s.is_pipeline())
            .collect();
        assert_eq!(pipeline.len(), 5);
        assert!(!ProjectStatus::Lost.is_pipeline());
        assert!(!ProjectStatus::Archived.is_pipeline());
    }

    #[test]
    fn test_status_round_trip() {
        for status in ProjectStatus::all() {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(*status));
        }
    }

    #[test]
    fn test_scaled_repeats_cut_list_for_whole_units() {
        let rp = RequiredPart {
            part_id: Uuid::new_v4(),
            quantity: Decimal::from(10),
            cut_lengths: vec![Decimal::from(40), Decimal::from(50)],
        };

        let tripled = rp.scaled(Decimal::from(3));
        assert_eq!(tripled.quantity, Decimal::from(30));
        assert_eq!(tripled.cut_lengths.len(), 6);

        let fractional = rp.scaled(Decimal::new(15, 1));
        assert_eq!(fractional.quantity, Decimal::from(15));
        assert!(fractional.cut_lengths.is_empty());
    }
}

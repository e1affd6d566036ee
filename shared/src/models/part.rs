//! Part catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable / stockable part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: Uuid,
    /// Unique part number (e.g., "EXT-4512-BRZ")
    pub part_number: String,
    pub description: String,
    /// Unit of measure ("ea", "in", "ft", "sqft", ...)
    pub unit: String,
    pub category: PartCategory,
    pub qty_on_hand: Decimal,
    /// Written only by the reservation ledger
    pub qty_reserved: Decimal,
    pub reorder_point: Option<Decimal>,
    pub reorder_qty: Option<Decimal>,
    /// Preferred vendor
    pub vendor_id: Option<Uuid>,
    pub unit_cost: Option<Decimal>,
    /// Single configured stock length for linear parts without variants
    pub stock_length: Option<Decimal>,
    #[serde(default)]
    pub variants: Vec<PartVariant>,
    pub updated_at: DateTime<Utc>,
}

impl Part {
    /// Stock length menu for cutting: distinct variant lengths, falling back to
    /// the part's own stock length. Sorted ascending.
    pub fn stock_length_menu(&self) -> Vec<Decimal> {
        let mut menu: Vec<Decimal> = self
            .variants
            .iter()
            .map(|v| v.stock_length)
            .filter(|l| *l > Decimal::ZERO)
            .collect();

        if menu.is_empty() {
            if let Some(length) = self.stock_length.filter(|l| *l > Decimal::ZERO) {
                menu.push(length);
            }
        }

        menu.sort();
        menu.dedup();
        menu
    }

    /// Whether the part is bought as linear stock and cut to length
    pub fn is_linear(&self) -> bool {
        self.category.is_linear()
    }
}

/// A finish/color variant of a linear part, stocked independently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartVariant {
    pub id: Uuid,
    pub part_id: Uuid,
    /// Finish or color (e.g., "Bronze Anodized")
    pub finish: String,
    /// Purchasable length in inches
    pub stock_length: Decimal,
    pub qty_on_hand: Decimal,
}

/// Part category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartCategory {
    Extrusion,
    Hardware,
    Glass,
    Fastener,
    Option,
    CutStock,
}

impl PartCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartCategory::Extrusion => "extrusion",
            PartCategory::Hardware => "hardware",
            PartCategory::Glass => "glass",
            PartCategory::Fastener => "fastener",
            PartCategory::Option => "option",
            PartCategory::CutStock => "cut_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "extrusion" => Some(PartCategory::Extrusion),
            "hardware" => Some(PartCategory::Hardware),
            "glass" => Some(PartCategory::Glass),
            "fastener" => Some(PartCategory::Fastener),
            "option" => Some(PartCategory::Option),
            "cut_stock" => Some(PartCategory::CutStock),
            _ => None,
        }
    }

    /// Extrusions and cut stock are bought by the bar and cut down
    pub fn is_linear(&self) -> bool {
        matches!(self, PartCategory::Extrusion | PartCategory::CutStock)
    }
}

impl std::fmt::Display for PartCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartCategory::Extrusion => write!(f, "Extrusion"),
            PartCategory::Hardware => write!(f, "Hardware"),
            PartCategory::Glass => write!(f, "Glass"),
            PartCategory::Fastener => write!(f, "Fastener"),
            PartCategory::Option => write!(f, "Option"),
            PartCategory::CutStock => write!(f, "Cut Stock"),
        }
    }
}

//! Bill-of-materials expansion
//!
//! Turns a project's opening panels and the product BOMs behind them into the
//! list of parts (and cut lengths) the project requires. Dimension-driven BOM
//! items produce one cut per panel per unit of quantity; their demand is
//! expressed in linear feet.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RequiredPart;

const INCHES_PER_FOOT: i64 = 12;

/// A panel inside an opening; dimensions in inches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub product_id: Uuid,
    pub width: Decimal,
    pub height: Decimal,
}

/// One line of a product's BOM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomItem {
    pub product_id: Uuid,
    pub part_id: Uuid,
    pub quantity: Decimal,
    pub formula: Option<BomFormula>,
}

/// Dimension the BOM quantity is driven by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BomFormula {
    Width,
    Height,
    /// Two width cuts and two height cuts per unit
    Perimeter,
}

impl BomFormula {
    pub fn as_str(&self) -> &'static str {
        match self {
            BomFormula::Width => "WIDTH",
            BomFormula::Height => "HEIGHT",
            BomFormula::Perimeter => "PERIMETER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "WIDTH" => Some(BomFormula::Width),
            "HEIGHT" => Some(BomFormula::Height),
            "PERIMETER" => Some(BomFormula::Perimeter),
            _ => None,
        }
    }

    /// Cut lengths (inches) one unit of this item needs on the given panel
    pub fn cuts_for(&self, panel: &Panel) -> Vec<Decimal> {
        match self {
            BomFormula::Width => vec![panel.width],
            BomFormula::Height => vec![panel.height],
            BomFormula::Perimeter => vec![panel.width, panel.width, panel.height, panel.height],
        }
    }
}

/// Convert inches to feet
pub fn inches_to_feet(inches: Decimal) -> Decimal {
    inches / Decimal::from(INCHES_PER_FOOT)
}

/// Total linear inches represented by a quantity in the given unit, if the
/// unit is a length unit
pub fn linear_inches(quantity: Decimal, unit: &str) -> Option<Decimal> {
    match unit.to_ascii_lowercase().as_str() {
        "in" | "inch" | "inches" => Some(quantity),
        "ft" | "foot" | "feet" | "lf" => Some(quantity * Decimal::from(INCHES_PER_FOOT)),
        _ => None,
    }
}

/// Expand panels against product BOMs, merging requirements per part.
///
/// Items with a fractional quantity and a formula keep their linear demand but
/// only whole units produce tracked cuts.
pub fn expand_bom(panels: &[Panel], items: &[BomItem]) -> Vec<RequiredPart> {
    let mut merged: BTreeMap<Uuid, RequiredPart> = BTreeMap::new();

    for panel in panels {
        for item in items.iter().filter(|i| i.product_id == panel.product_id) {
            let entry = merged
                .entry(item.part_id)
                .or_insert_with(|| RequiredPart::new(item.part_id, Decimal::ZERO));

            match item.formula {
                Some(formula) => {
                    let unit_cuts = formula.cuts_for(panel);
                    let unit_inches: Decimal = unit_cuts.iter().sum();
                    entry.quantity += inches_to_feet(unit_inches * item.quantity);

                    let whole = item.quantity.trunc();
                    let mut n = Decimal::ZERO;
                    while n < whole {
                        entry.cut_lengths.extend_from_slice(&unit_cuts);
                        n += Decimal::ONE;
                    }
                }
                None => entry.quantity += item.quantity,
            }
        }
    }

    merged
        .into_values()
        .filter(|rp| rp.quantity > Decimal::ZERO)
        .collect()
}

/// Merge requirement lists (e.g. from several projects) per part
pub fn merge_requirements<I>(lists: I) -> Vec<RequiredPart>
where
    I: IntoIterator<Item = Vec<RequiredPart>>,
{
    let mut merged: BTreeMap<Uuid, RequiredPart> = BTreeMap::new();
    for list in lists {
        for rp in list {
            let entry = merged
                .entry(rp.part_id)
                .or_insert_with(|| RequiredPart::new(rp.part_id, Decimal::ZERO));
            entry.quantity += rp.quantity;
            entry.cut_lengths.extend(rp.cut_lengths);
        }
    }
    merged.into_values().collect()
}

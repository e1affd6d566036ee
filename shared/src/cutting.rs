//! Stock-cutting optimizer
//!
//! Packs required cut lengths into purchasable stock lengths. This is
//! first-fit-decreasing, not an exact solver, but every plan it returns is
//! feasible: each cut sits on a piece long enough to hold it.
//!
//! Candidate plans:
//! * mixed: FFD into the longest stock length, then each piece shrunk to the
//!   shortest menu length that still holds its cuts
//! * single-length: FFD using only one menu length (for every length that can
//!   hold the longest cut)
//!
//! The plan with the least purchased length wins; plans within the SKU
//! tolerance of it prefer fewer distinct stock lengths.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Optimizer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuttingOptions {
    /// Material lost to the saw blade between cuts
    pub kerf: Decimal,
    /// Plans within this percentage of the best total length count as
    /// comparable when preferring fewer distinct stock lengths
    pub sku_tolerance_percent: Decimal,
}

impl Default for CuttingOptions {
    fn default() -> Self {
        Self {
            kerf: Decimal::ZERO,
            sku_tolerance_percent: Decimal::from(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CuttingError {
    #[error("No stock lengths configured")]
    EmptyMenu,

    #[error("Stock length must be positive, got {0}")]
    InvalidStockLength(Decimal),

    #[error("Cut length must be positive, got {0}")]
    InvalidCutLength(Decimal),

    #[error("Cut of {cut} is longer than the longest stock length ({longest})")]
    CutExceedsStock { cut: Decimal, longest: Decimal },

    #[error("Kerf cannot be negative")]
    NegativeKerf,
}

/// One purchased piece and the cuts taken from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPiece {
    pub stock_length: Decimal,
    pub cuts: Vec<Decimal>,
    /// Unused remainder
    pub offcut: Decimal,
}

/// Number of pieces to buy at one stock length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLengthCount {
    pub stock_length: Decimal,
    pub piece_count: u32,
}

/// Purchase plan for one part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuttingPlan {
    pub breakdown: Vec<StockLengthCount>,
    pub pieces: Vec<StockPiece>,
    pub total_stock_length: Decimal,
    pub total_required_length: Decimal,
    pub waste_percent: Decimal,
}

impl CuttingPlan {
    pub fn piece_count(&self) -> u32 {
        self.breakdown.iter().map(|b| b.piece_count).sum()
    }

    pub fn distinct_lengths(&self) -> usize {
        self.breakdown.len()
    }

    fn empty() -> Self {
        Self {
            breakdown: Vec::new(),
            pieces: Vec::new(),
            total_stock_length: Decimal::ZERO,
            total_required_length: Decimal::ZERO,
            waste_percent: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct OpenPiece {
    stock_length: Decimal,
    cuts: Vec<Decimal>,
    used: Decimal,
}

impl OpenPiece {
    fn new(stock_length: Decimal) -> Self {
        Self {
            stock_length,
            cuts: Vec::new(),
            used: Decimal::ZERO,
        }
    }

    fn consumed_by(&self, cut: Decimal, kerf: Decimal) -> Decimal {
        if self.cuts.is_empty() {
            cut
        } else {
            kerf + cut
        }
    }

    fn fits(&self, cut: Decimal, kerf: Decimal) -> bool {
        self.used + self.consumed_by(cut, kerf) <= self.stock_length
    }

    fn push(&mut self, cut: Decimal, kerf: Decimal) {
        self.used += self.consumed_by(cut, kerf);
        self.cuts.push(cut);
    }
}

/// Plan stock purchases for a multiset of cut lengths
pub fn optimize(
    required_lengths: &[Decimal],
    stock_length_menu: &[Decimal],
    options: &CuttingOptions,
) -> Result<CuttingPlan, CuttingError> {
    if options.kerf < Decimal::ZERO {
        return Err(CuttingError::NegativeKerf);
    }
    if stock_length_menu.is_empty() {
        return Err(CuttingError::EmptyMenu);
    }
    if let Some(bad) = stock_length_menu.iter().find(|l| **l <= Decimal::ZERO) {
        return Err(CuttingError::InvalidStockLength(*bad));
    }
    if let Some(bad) = required_lengths.iter().find(|l| **l <= Decimal::ZERO) {
        return Err(CuttingError::InvalidCutLength(*bad));
    }

    // Longest first
    let mut menu = stock_length_menu.to_vec();
    menu.sort_by(|a, b| b.cmp(a));
    menu.dedup();
    let longest = menu[0];

    let mut cuts = required_lengths.to_vec();
    cuts.sort_by(|a, b| b.cmp(a));

    let Some(&longest_cut) = cuts.first() else {
        return Ok(CuttingPlan::empty());
    };
    if longest_cut > longest {
        return Err(CuttingError::CutExceedsStock {
            cut: longest_cut,
            longest,
        });
    }

    let mut candidates = vec![shrink(first_fit_decreasing(&cuts, longest, options.kerf), &menu)];
    for &length in menu.iter().filter(|l| **l >= longest_cut) {
        candidates.push(first_fit_decreasing(&cuts, length, options.kerf));
    }

    let plans: Vec<CuttingPlan> = candidates.into_iter().map(into_plan).collect();
    Ok(choose(plans, options.sku_tolerance_percent))
}

/// Pieces needed when only a single stock length is configured
pub fn stock_pieces_needed(
    required_lengths: &[Decimal],
    stock_length: Decimal,
    kerf: Decimal,
) -> Result<u32, CuttingError> {
    let options = CuttingOptions {
        kerf,
        ..CuttingOptions::default()
    };
    Ok(optimize(required_lengths, &[stock_length], &options)?.piece_count())
}

/// Fallback when individual cuts aren't tracked: ceil(total / stock length)
pub fn naive_pieces_needed(total_linear: Decimal, stock_length: Decimal) -> Result<u32, CuttingError> {
    if stock_length <= Decimal::ZERO {
        return Err(CuttingError::InvalidStockLength(stock_length));
    }
    if total_linear <= Decimal::ZERO {
        return Ok(0);
    }
    Ok((total_linear / stock_length).ceil().to_u32().unwrap_or(u32::MAX))
}

fn first_fit_decreasing(cuts_desc: &[Decimal], stock_length: Decimal, kerf: Decimal) -> Vec<OpenPiece> {
    let mut pieces: Vec<OpenPiece> = Vec::new();
    for &cut in cuts_desc {
        match pieces.iter_mut().find(|p| p.fits(cut, kerf)) {
            Some(piece) => piece.push(cut, kerf),
            None => {
                let mut piece = OpenPiece::new(stock_length);
                piece.push(cut, kerf);
                pieces.push(piece);
            }
        }
    }
    pieces
}

/// Swap each piece for the shortest menu length that still holds its cuts
fn shrink(mut pieces: Vec<OpenPiece>, menu_desc: &[Decimal]) -> Vec<OpenPiece> {
    for piece in &mut pieces {
        if let Some(shorter) = menu_desc.iter().rev().find(|l| **l >= piece.used) {
            piece.stock_length = *shorter;
        }
    }
    pieces
}

fn into_plan(pieces: Vec<OpenPiece>) -> CuttingPlan {
    let mut breakdown: Vec<StockLengthCount> = Vec::new();
    for piece in &pieces {
        match breakdown.iter_mut().find(|b| b.stock_length == piece.stock_length) {
            Some(entry) => entry.piece_count += 1,
            None => breakdown.push(StockLengthCount {
                stock_length: piece.stock_length,
                piece_count: 1,
            }),
        }
    }
    breakdown.sort_by(|a, b| a.stock_length.cmp(&b.stock_length));

    let total_stock_length: Decimal = pieces.iter().map(|p| p.stock_length).sum();
    let total_required_length: Decimal = pieces.iter().flat_map(|p| p.cuts.iter()).sum();
    let waste_percent = if total_stock_length.is_zero() {
        Decimal::ZERO
    } else {
        ((total_stock_length - total_required_length) / total_stock_length * Decimal::ONE_HUNDRED)
            .round_dp(2)
    };

    CuttingPlan {
        breakdown,
        pieces: pieces
            .into_iter()
            .map(|p| StockPiece {
                stock_length: p.stock_length,
                offcut: p.stock_length - p.used,
                cuts: p.cuts,
            })
            .collect(),
        total_stock_length,
        total_required_length,
        waste_percent,
    }
}

fn choose(plans: Vec<CuttingPlan>, sku_tolerance_percent: Decimal) -> CuttingPlan {
    let best_total = plans
        .iter()
        .map(|p| p.total_stock_length)
        .min()
        .unwrap_or(Decimal::ZERO);
    let allowance = best_total * sku_tolerance_percent / Decimal::ONE_HUNDRED;

    plans
        .into_iter()
        .filter(|p| p.total_stock_length <= best_total + allowance)
        .min_by(|a, b| {
            a.distinct_lengths()
                .cmp(&b.distinct_lengths())
                .then_with(|| a.total_stock_length.cmp(&b.total_stock_length))
                .then_with(|| a.piece_count().cmp(&b.piece_count()))
        })
        .unwrap_or_else(CuttingPlan::empty)
}

//! WebAssembly module for fabrication planning
//!
//! Provides client-side computation for:
//! - Cut list optimization against stock length menus
//! - Stock piece counts for a single stock length
//! - Shortage classification "what if" checks
//! - Reservation counter previews

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::cutting::{naive_pieces_needed, optimize, stock_pieces_needed, CuttingOptions};
use shared::ledger_math::{apply_release, apply_reserve};
use shared::shortage::{classify_position, ShortageThresholds, StockPosition};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

#[derive(Deserialize)]
struct OptimizeRequest {
    required_lengths: Vec<Decimal>,
    stock_lengths: Vec<Decimal>,
    #[serde(default)]
    kerf: Decimal,
    #[serde(default)]
    sku_tolerance_percent: Option<Decimal>,
}

#[derive(Deserialize)]
struct PiecesRequest {
    required_lengths: Vec<Decimal>,
    stock_length: Decimal,
    #[serde(default)]
    kerf: Decimal,
}

#[derive(Deserialize)]
struct ClassifyRequest {
    qty_on_hand: Decimal,
    #[serde(default)]
    reserved: Decimal,
    #[serde(default)]
    projected: Decimal,
    reorder_point: Option<Decimal>,
    reorder_qty: Option<Decimal>,
    min_stock_floor: Option<Decimal>,
    projected_risk_ratio: Option<Decimal>,
}

fn js_error(msg: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&msg.to_string())
}

fn parse_decimal(value: &str, field: &str) -> Result<Decimal, String> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| format!("Invalid {}: '{}'", field, value))
}

fn optimize_json(request_json: &str) -> Result<String, String> {
    let request: OptimizeRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid request JSON: {}", e))?;

    let mut options = CuttingOptions {
        kerf: request.kerf,
        ..CuttingOptions::default()
    };
    if let Some(tolerance) = request.sku_tolerance_percent {
        options.sku_tolerance_percent = tolerance;
    }

    let plan = optimize(&request.required_lengths, &request.stock_lengths, &options)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&plan).map_err(|e| e.to_string())
}

fn pieces_json(request_json: &str) -> Result<u32, String> {
    let request: PiecesRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid request JSON: {}", e))?;
    stock_pieces_needed(&request.required_lengths, request.stock_length, request.kerf)
        .map_err(|e| e.to_string())
}

fn classify_json(request_json: &str) -> Result<String, String> {
    let request: ClassifyRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid request JSON: {}", e))?;

    let defaults = ShortageThresholds::default();
    let thresholds = ShortageThresholds {
        min_stock_floor: request.min_stock_floor,
        projected_risk_ratio: request
            .projected_risk_ratio
            .unwrap_or(defaults.projected_risk_ratio),
    };
    let position = StockPosition {
        qty_on_hand: request.qty_on_hand,
        reorder_point: request.reorder_point,
        reorder_qty: request.reorder_qty,
    };

    let classification = classify_position(
        Uuid::nil(),
        position,
        request.reserved,
        request.projected,
        &thresholds,
    );
    serde_json::to_string(&classification).map_err(|e| e.to_string())
}

/// Optimize a cut list.
///
/// Takes `{required_lengths, stock_lengths, kerf?, sku_tolerance_percent?}`
/// and returns the cutting plan as JSON.
#[wasm_bindgen]
pub fn optimize_cuts(request_json: &str) -> Result<String, JsValue> {
    optimize_json(request_json).map_err(js_error)
}

/// Stock pieces of one length needed for a cut list.
///
/// Takes `{required_lengths, stock_length, kerf?}`.
#[wasm_bindgen]
pub fn stock_pieces_for_cuts(request_json: &str) -> Result<u32, JsValue> {
    pieces_json(request_json).map_err(js_error)
}

/// ceil(total linear inches / stock length)
#[wasm_bindgen]
pub fn naive_stock_pieces(total_inches: &str, stock_length: &str) -> Result<u32, JsValue> {
    let total = parse_decimal(total_inches, "total length").map_err(js_error)?;
    let length = parse_decimal(stock_length, "stock length").map_err(js_error)?;
    naive_pieces_needed(total, length).map_err(js_error)
}

/// Classify a stock position; returns the classification as JSON
#[wasm_bindgen]
pub fn classify_shortage(request_json: &str) -> Result<String, JsValue> {
    classify_json(request_json).map_err(js_error)
}

/// Reserved total after reserving `qty`
#[wasm_bindgen]
pub fn preview_reserve(qty_reserved: &str, qty: &str) -> Result<String, JsValue> {
    let held = parse_decimal(qty_reserved, "reserved quantity").map_err(js_error)?;
    let qty = parse_decimal(qty, "quantity").map_err(js_error)?;
    apply_reserve(held, qty).map(|d| d.to_string()).map_err(js_error)
}

/// Reserved total after releasing `qty`; fails when more is released than held
#[wasm_bindgen]
pub fn preview_release(qty_reserved: &str, qty: &str) -> Result<String, JsValue> {
    let held = parse_decimal(qty_reserved, "reserved quantity").map_err(js_error)?;
    let qty = parse_decimal(qty, "quantity").map_err(js_error)?;
    apply_release(held, qty).map(|d| d.to_string()).map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::cutting::CuttingPlan;
    use shared::shortage::{ShortageClassification, Urgency};

    #[test]
    fn test_optimize_json_covers_all_cuts() {
        let json = optimize_json(r#"{"required_lengths": [40, 40, 50], "stock_lengths": [99, 144]}"#)
            .unwrap();
        let plan: CuttingPlan = serde_json::from_str(&json).unwrap();
        let cuts: usize = plan.pieces.iter().map(|p| p.cuts.len()).sum();
        assert_eq!(cuts, 3);
        assert!(plan.total_stock_length >= Decimal::from(130));
    }

    #[test]
    fn test_optimize_json_rejects_oversized_cut() {
        let err = optimize_json(r#"{"required_lengths": [150], "stock_lengths": [144]}"#).unwrap_err();
        assert!(err.contains("150"));
    }

    #[test]
    fn test_pieces_json_counts_kerf() {
        assert_eq!(pieces_json(r#"{"required_lengths": [48, 48], "stock_length": 96}"#), Ok(1));
        assert_eq!(
            pieces_json(r#"{"required_lengths": [48, 48], "stock_length": 96, "kerf": 0.125}"#),
            Ok(2)
        );
        assert!(pieces_json(r#"{"required_lengths": [100], "stock_length": 96}"#).is_err());
    }

    #[test]
    fn test_classify_json_critical_when_over_reserved() {
        let json = classify_json(r#"{"qty_on_hand": 10, "reserved": 12, "reorder_point": 5}"#).unwrap();
        let result: ShortageClassification = serde_json::from_str(&json).unwrap();
        assert_eq!(result.available_qty, Decimal::from(-2));
        assert_eq!(result.shortage, Decimal::from(2));
        assert_eq!(result.urgency, Urgency::Critical);
    }

    #[test]
    fn test_classify_json_healthy() {
        let json = classify_json(r#"{"qty_on_hand": 10, "reorder_point": 5}"#).unwrap();
        let result: ShortageClassification = serde_json::from_str(&json).unwrap();
        assert_eq!(result.urgency, Urgency::Healthy);
        assert_eq!(result.suggested_order_qty, Decimal::ZERO);
    }

    #[test]
    fn test_release_guard() {
        assert!(parse_decimal("5", "q").is_ok());
        assert_eq!(apply_release(Decimal::from(5), Decimal::from(5)), Ok(Decimal::ZERO));
        assert!(apply_release(Decimal::from(3), Decimal::from(5)).is_err());
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(parse_decimal("ten", "quantity").is_err());
        assert_eq!(parse_decimal(" 2.5 ", "quantity"), Ok(Decimal::new(25, 1)));
    }
}

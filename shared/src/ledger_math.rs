//! Reservation counter arithmetic
//!
//! Mirrors the guarded updates the backend ledger runs in SQL. Reserving
//! never fails on availability; releasing never goes below zero.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("Cannot release {requested}: only {held} reserved")]
    ReleaseExceedsReserved { requested: Decimal, held: Decimal },
}

/// New reserved total after reserving `qty`
pub fn apply_reserve(qty_reserved: Decimal, qty: Decimal) -> Result<Decimal, LedgerError> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(qty));
    }
    Ok(qty_reserved + qty)
}

/// New reserved total after releasing `qty`
pub fn apply_release(qty_reserved: Decimal, qty: Decimal) -> Result<Decimal, LedgerError> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(qty));
    }
    if qty > qty_reserved {
        return Err(LedgerError::ReleaseExceedsReserved {
            requested: qty,
            held: qty_reserved,
        });
    }
    Ok(qty_reserved - qty)
}

/// Free stock after reservations; negative when over-reserved
pub fn available(qty_on_hand: Decimal, qty_reserved: Decimal) -> Decimal {
    qty_on_hand - qty_reserved
}

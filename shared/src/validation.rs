//! Validation utilities shared by the backend and the wasm tools

use rust_decimal::Decimal;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Quantities moved through the ledger, picked or ordered must be positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Prices and costs may be zero but never negative
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Stock length menu must be non-empty and strictly positive
pub fn validate_stock_lengths(lengths: &[Decimal]) -> Result<(), &'static str> {
    if lengths.is_empty() {
        return Err("At least one stock length is required");
    }
    if lengths.iter().any(|l| *l <= Decimal::ZERO) {
        return Err("Stock lengths must be greater than zero");
    }
    Ok(())
}

/// Kerf is a saw allowance; zero is allowed
pub fn validate_kerf(kerf: Decimal) -> Result<(), &'static str> {
    if kerf < Decimal::ZERO {
        return Err("Kerf cannot be negative");
    }
    if kerf > Decimal::ONE {
        return Err("Kerf must be at most 1 inch");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Quantity Validation Tests
    // ========================================================================

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(Decimal::ONE).is_ok());
        assert!(validate_positive_quantity(Decimal::new(5, 1)).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_stock_lengths() {
        assert!(validate_stock_lengths(&[Decimal::from(144), Decimal::from(99)]).is_ok());
        assert!(validate_stock_lengths(&[]).is_err());
        assert!(validate_stock_lengths(&[Decimal::from(144), Decimal::ZERO]).is_err());
    }

    #[test]
    fn test_kerf() {
        assert!(validate_kerf(Decimal::ZERO).is_ok());
        assert!(validate_kerf(Decimal::new(125, 3)).is_ok());
        assert!(validate_kerf(Decimal::from(2)).is_err());
    }
}

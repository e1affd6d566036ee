//! Reservation ledger
//!
//! The only code that writes `parts.qty_reserved`. Every mutation is a single
//! conditional `UPDATE ... RETURNING` run on the caller's connection, normally
//! inside a transaction, so Postgres row locks serialise concurrent callers.
//! Reservations are a counter, not an allocator: reserving more than is on
//! hand is allowed and shows up as negative availability.

use rust_decimal::Decimal;
use shared::ledger_math::LedgerError;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Increase a part's reserved quantity; returns the new total
pub async fn reserve(conn: &mut PgConnection, part_id: Uuid, qty: Decimal) -> AppResult<Decimal> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(qty).into());
    }

    let reserved = sqlx::query_scalar::<_, Decimal>(
        r#"
        UPDATE parts
        SET qty_reserved = qty_reserved + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING qty_reserved
        "#,
    )
    .bind(part_id)
    .bind(qty)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Part {}", part_id)))?;

    tracing::debug!(%part_id, %qty, %reserved, "Reserved stock");
    Ok(reserved)
}

/// Decrease a part's reserved quantity; returns the new total.
///
/// Never clamps: releasing more than is held fails and leaves the row as is.
pub async fn release(conn: &mut PgConnection, part_id: Uuid, qty: Decimal) -> AppResult<Decimal> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(qty).into());
    }

    let updated = sqlx::query_scalar::<_, Decimal>(
        r#"
        UPDATE parts
        SET qty_reserved = qty_reserved - $2, updated_at = NOW()
        WHERE id = $1 AND qty_reserved >= $2
        RETURNING qty_reserved
        "#,
    )
    .bind(part_id)
    .bind(qty)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(reserved) = updated {
        tracing::debug!(%part_id, %qty, %reserved, "Released stock");
        return Ok(reserved);
    }

    let held = sqlx::query_scalar::<_, Decimal>("SELECT qty_reserved FROM parts WHERE id = $1")
        .bind(part_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Part {}", part_id)))?;

    tracing::warn!(%part_id, %qty, %held, "Release exceeds reserved quantity");
    Err(LedgerError::ReleaseExceedsReserved {
        requested: qty,
        held,
    }
    .into())
}

/// Reserve a batch of lines in ascending part order. Lines for the same part
/// are combined so each row is locked once.
///
/// Run inside a transaction: the first failure aborts the batch and the
/// caller's rollback undoes anything already applied.
pub async fn reserve_all(conn: &mut PgConnection, lines: &[(Uuid, Decimal)]) -> AppResult<()> {
    for (part_id, qty) in lock_order(lines) {
        reserve(conn, part_id, qty).await?;
    }
    Ok(())
}

/// Lock part rows in ascending id order for the rest of the transaction.
///
/// Shortage checks that read stock and then reserve against it take these
/// locks first, so a competing confirmation waits and then sees the
/// reservations committed ahead of it.
pub async fn lock_parts(conn: &mut PgConnection, part_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let mut ids = part_ids.to_vec();
    ids.sort();
    ids.dedup();

    let locked = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM parts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    tracing::debug!(parts = locked.len(), "Locked part rows");
    Ok(locked)
}

/// Physically remove picked stock from on-hand
pub async fn deduct_on_hand(
    conn: &mut PgConnection,
    part_id: Uuid,
    qty: Decimal,
) -> AppResult<Decimal> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(qty).into());
    }

    let updated = sqlx::query_scalar::<_, Decimal>(
        r#"
        UPDATE parts
        SET qty_on_hand = qty_on_hand - $2, updated_at = NOW()
        WHERE id = $1 AND qty_on_hand >= $2
        RETURNING qty_on_hand
        "#,
    )
    .bind(part_id)
    .bind(qty)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(on_hand) => Ok(on_hand),
        None => {
            let on_hand =
                sqlx::query_scalar::<_, Decimal>("SELECT qty_on_hand FROM parts WHERE id = $1")
                    .bind(part_id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Part {}", part_id)))?;
            Err(AppError::InvariantViolation(format!(
                "Cannot pick {} of part {}: only {} on hand",
                qty, part_id, on_hand
            )))
        }
    }
}

/// Positive quantities merged per part, sorted by part id
pub fn lock_order(lines: &[(Uuid, Decimal)]) -> Vec<(Uuid, Decimal)> {
    let mut merged: std::collections::BTreeMap<Uuid, Decimal> = std::collections::BTreeMap::new();
    for (part_id, qty) in lines.iter().filter(|(_, q)| *q > Decimal::ZERO) {
        *merged.entry(*part_id).or_insert(Decimal::ZERO) += *qty;
    }
    merged.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_sorted_and_merged() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let lines = vec![
            (b, Decimal::from(2)),
            (a, Decimal::from(1)),
            (b, Decimal::from(3)),
            (a, Decimal::ZERO),
        ];

        assert_eq!(
            lock_order(&lines),
            vec![(a, Decimal::from(1)), (b, Decimal::from(5))]
        );
    }
}

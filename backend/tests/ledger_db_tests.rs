//! Reservation ledger tests against Postgres
//!
//! Ignored by default. Run with a scratch database:
//! `DATABASE_URL=postgres://... cargo test -p fabops-backend -- --ignored`

use std::str::FromStr;

use fabops_backend::error::AppError;
use fabops_backend::services::ledger::{release, reserve, reserve_all};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

async fn insert_part(pool: &PgPool, on_hand: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO parts (part_number, description, category, qty_on_hand)
        VALUES ($1, 'Ledger test part', 'hardware', $2)
        RETURNING id
        "#,
    )
    .bind(format!("T-{}", Uuid::new_v4().simple()))
    .bind(dec(on_hand))
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn reserved_of(pool: &PgPool, part_id: Uuid) -> Decimal {
    sqlx::query_scalar::<_, Decimal>("SELECT qty_reserved FROM parts WHERE id = $1")
        .bind(part_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_concurrent_reservations_are_not_lost() {
    let pool = pool().await;
    let part_id = insert_part(&pool, "10").await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = pool.begin().await.unwrap();
            reserve(&mut tx, part_id, dec("1.5")).await.unwrap();
            tx.commit().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // over-reservation is allowed
    assert_eq!(reserved_of(&pool, part_id).await, dec("24"));
}

#[tokio::test]
#[ignore]
async fn test_release_beyond_reserved_leaves_row_unchanged() {
    let pool = pool().await;
    let part_id = insert_part(&pool, "10").await;

    let mut conn = pool.acquire().await.unwrap();
    reserve(&mut conn, part_id, dec("3")).await.unwrap();

    let err = release(&mut conn, part_id, dec("5")).await.unwrap_err();
    assert!(matches!(err, AppError::InvariantViolation(_)));
    assert_eq!(reserved_of(&pool, part_id).await, dec("3"));

    assert_eq!(release(&mut conn, part_id, dec("3")).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
#[ignore]
async fn test_unknown_part_and_bad_quantity() {
    let pool = pool().await;
    let mut conn = pool.acquire().await.unwrap();

    let err = reserve(&mut conn, Uuid::new_v4(), dec("1")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let part_id = insert_part(&pool, "1").await;
    let err = reserve(&mut conn, part_id, Decimal::ZERO).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
#[ignore]
async fn test_reserve_all_rolls_back_as_a_unit() {
    let pool = pool().await;
    let known = insert_part(&pool, "5").await;

    let mut tx = pool.begin().await.unwrap();
    let result = reserve_all(&mut tx, &[(known, dec("2")), (Uuid::new_v4(), dec("1"))]).await;
    assert!(result.is_err());
    tx.rollback().await.unwrap();

    assert_eq!(reserved_of(&pool, known).await, Decimal::ZERO);
}

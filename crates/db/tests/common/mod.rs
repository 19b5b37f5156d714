//! Shared fixtures for repository tests.
//!
//! Each integration test binary compiles this module separately and uses a
//! different subset of the helpers.
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use courtside_core::types::DbId;
use sqlx::PgPool;

/// A match date comfortably outside the 24-hour cancellation window.
pub fn match_date() -> NaiveDate {
    (Utc::now() + Duration::days(3)).date_naive()
}

/// Default slot start: three days out, 18:00 UTC.
pub fn slot_start() -> DateTime<Utc> {
    (Utc::now() + Duration::days(3))
        .date_naive()
        .and_hms_opt(18, 0, 0)
        .unwrap()
        .and_utc()
}

pub async fn create_user(pool: &PgPool, email: &str, balance: f64) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO users (email, display_name, credit_balance) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email)
    .bind("Test Player")
    .bind(balance)
    .fetch_one(pool)
    .await
    .expect("Failed to create test user")
}

pub async fn create_slot(pool: &PgPool, court_id: DbId, unit_price: f64, capacity: i32) -> DbId {
    let start = slot_start();
    create_slot_at(pool, court_id, start, start + Duration::minutes(90), unit_price, capacity)
        .await
}

pub async fn create_slot_at(
    pool: &PgPool,
    court_id: DbId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    unit_price: f64,
    capacity: i32,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO court_slots (court_id, start_time, end_time, unit_price, capacity) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(court_id)
    .bind(start_time)
    .bind(end_time)
    .bind(unit_price)
    .bind(capacity)
    .fetch_one(pool)
    .await
    .expect("Failed to create test slot")
}

pub async fn create_reservation_row(
    pool: &PgPool,
    slot_id: DbId,
    date: NaiveDate,
    creator_user_id: DbId,
    reservation_type: i16,
    etat: i16,
    coder: &str,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO reservations \
             (slot_id, date, creator_user_id, reservation_type, etat, coder) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(slot_id)
    .bind(date)
    .bind(creator_user_id)
    .bind(reservation_type)
    .bind(etat)
    .bind(coder)
    .fetch_one(pool)
    .await
    .expect("Failed to create test reservation")
}

pub async fn cancel_reservation_row(pool: &PgPool, id: DbId) {
    sqlx::query("UPDATE reservations SET etat = 3, is_cancel = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to cancel test reservation");
}

pub async fn balance_of(pool: &PgPool, user_id: DbId) -> f64 {
    sqlx::query_scalar("SELECT credit_balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

pub async fn ledger_sum(pool: &PgPool, user_id: DbId) -> f64 {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION \
         FROM credit_transactions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("Failed to sum ledger")
}

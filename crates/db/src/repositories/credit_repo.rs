//! Repository for the `credit_transactions` ledger.
//!
//! The ledger is the only code that writes `users.credit_balance`. Every
//! method here expects to run inside the caller's transaction and locks the
//! affected user row before touching the balance.

use courtside_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::credit::CreditTransaction;

/// Column list for `credit_transactions` queries.
const COLUMNS: &str = "id, user_id, amount, type_key, created_at";

/// Result of a debit attempt.
#[derive(Debug)]
pub enum DebitOutcome {
    /// Balance decremented and a transaction appended.
    Applied(CreditTransaction),
    /// The locked balance is smaller than the charge.
    InsufficientFunds,
    /// Non-positive amounts are rejected.
    InvalidAmount,
}

/// Append-only ledger operations with idempotent refunds.
pub struct CreditLedgerRepo;

impl CreditLedgerRepo {
    /// Atomically decrement the user's balance and append a debit with
    /// `amount = -|amount|`.
    pub async fn debit(
        conn: &mut PgConnection,
        user_id: DbId,
        amount: f64,
        type_key: &str,
    ) -> Result<DebitOutcome, sqlx::Error> {
        if amount <= 0.0 {
            return Ok(DebitOutcome::InvalidAmount);
        }

        let balance: Option<f64> =
            sqlx::query_scalar("SELECT credit_balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *conn)
                .await?;
        let balance = balance.ok_or(sqlx::Error::RowNotFound)?;

        if balance < amount {
            return Ok(DebitOutcome::InsufficientFunds);
        }

        sqlx::query(
            "UPDATE users SET credit_balance = credit_balance - $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "INSERT INTO credit_transactions (user_id, amount, type_key) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let tx_row = sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(user_id)
            .bind(-amount)
            .bind(type_key)
            .fetch_one(&mut *conn)
            .await?;

        tracing::info!(user_id, amount, type_key, "Ledger debit applied");
        Ok(DebitOutcome::Applied(tx_row))
    }

    /// Increment the user's balance and append a refund with
    /// `amount = +|amount|`, unless a transaction with the same
    /// `(user, type_key)` already exists.
    ///
    /// Returns whether a refund actually occurred. This is the sole
    /// idempotence gate; every refund path must pass a stable key.
    pub async fn refund(
        conn: &mut PgConnection,
        user_id: DbId,
        amount: f64,
        type_key: &str,
    ) -> Result<bool, sqlx::Error> {
        if amount <= 0.0 {
            return Ok(false);
        }

        // Lock the user row first so concurrent refunds with the same key
        // serialize here instead of racing to the unique constraint.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM credit_transactions WHERE user_id = $1 AND type_key = $2",
        )
        .bind(user_id)
        .bind(type_key)
        .fetch_optional(&mut *conn)
        .await?;
        if exists.is_some() {
            tracing::debug!(user_id, type_key, "Refund skipped, key already used");
            return Ok(false);
        }

        sqlx::query(
            "UPDATE users SET credit_balance = credit_balance + $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut *conn)
        .await?;

        sqlx::query("INSERT INTO credit_transactions (user_id, amount, type_key) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(amount)
            .bind(type_key)
            .execute(&mut *conn)
            .await?;

        tracing::info!(user_id, amount, type_key, "Ledger refund applied");
        Ok(true)
    }

    /// Locate the most recent debit of this user for this reservation,
    /// matching either the creator key or any join key.
    ///
    /// Cancellation uses this to refund exactly what was paid, not the
    /// slot's current price. Returns `None` when nothing was ever debited
    /// (on-site payment, infinity tier).
    pub async fn find_debit_for(
        conn: &mut PgConnection,
        user_id: DbId,
        reservation_id: DbId,
    ) -> Result<Option<CreditTransaction>, sqlx::Error> {
        let creator_key = courtside_core::ledger::creator_debit_key(reservation_id, user_id);
        let join_pattern = courtside_core::ledger::join_debit_pattern(reservation_id, user_id);

        let query = format!(
            "SELECT {COLUMNS} FROM credit_transactions \
             WHERE user_id = $1 AND amount < 0 \
               AND (type_key = $2 OR type_key LIKE $3) \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(user_id)
            .bind(&creator_key)
            .bind(&join_pattern)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Current balance for a user (read-only).
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<Option<f64>, sqlx::Error> {
        sqlx::query_scalar("SELECT credit_balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Recent ledger entries for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<CreditTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM credit_transactions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

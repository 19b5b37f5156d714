//! Repository for the `users` table.

use courtside_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, email, display_name, rating, reliability, credit_balance, \
    membership_tier, created_at, updated_at";

/// Provides lookups and the rating/reliability writes for users.
///
/// Balance mutations are the ledger's business and never happen here.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a user row for the duration of the caller's transaction.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Persist a new rating for a user. Runs in its own short transaction on
    /// the pool; the rating task never holds booking locks.
    pub async fn update_rating(pool: &PgPool, id: DbId, rating: f64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET rating = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Persist a new reliability percentage (0..100) for a user.
    pub async fn update_reliability(
        pool: &PgPool,
        id: DbId,
        reliability: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET reliability = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(reliability)
            .execute(pool)
            .await?;
        Ok(())
    }
}

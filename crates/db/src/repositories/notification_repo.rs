//! Repository for the `notifications` outbox.
//!
//! Rows are inserted on the caller's transaction so a rolled-back booking
//! never leaves a stray notification behind. Reads and the read-marking
//! endpoints go through the pool.

use courtside_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::notification::{NewNotification, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, recipient_id, reservation_id, submitter_id, kind, title, message, \
    data, is_read, read_at, created_at";

/// Outbox writes and per-user notification reads.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Enqueue a notification, returning the generated ID.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewNotification,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notifications \
                 (recipient_id, reservation_id, submitter_id, kind, title, message, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(input.recipient_id)
        .bind(input.reservation_id)
        .bind(input.submitter_id)
        .bind(input.kind)
        .bind(&input.title)
        .bind(&input.message)
        .bind(&input.data)
        .fetch_one(&mut *conn)
        .await
    }

    /// Find a notification by primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only notifications with
    /// `is_read = false` are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = FALSE"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE recipient_id = $1 {filter} \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `true` if the notification was found for the given user and
    /// updated, `false` otherwise.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = TRUE, read_at = NOW() \
             WHERE id = $1 AND recipient_id = $2 AND is_read = FALSE",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Device tokens registered for a user, for the push collaborator.
    pub async fn push_tokens_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT token FROM push_tokens WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Number of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}

//! Repository for the `participants` table.

use courtside_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::participant::{NewParticipant, Participant};

/// Column list for `participants` queries.
const COLUMNS: &str =
    "id, reservation_id, user_id, is_creator, payment_state, payment_channel, team, created_at";

/// Participant rows: one per occupied seat.
pub struct ParticipantRepo;

impl ParticipantRepo {
    /// Insert a participant, returning the created row.
    ///
    /// The unique constraints reject a second row for the same user or the
    /// same team seat on one reservation.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let query = format!(
            "INSERT INTO participants \
                 (reservation_id, user_id, is_creator, payment_state, payment_channel, team) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(input.reservation_id)
            .bind(input.user_id)
            .bind(input.is_creator)
            .bind(input.payment_state)
            .bind(input.payment_channel)
            .bind(input.team)
            .fetch_one(&mut *conn)
            .await
    }

    /// List the participants of a reservation, by seat order.
    pub async fn list_for_reservation(
        pool: &PgPool,
        reservation_id: DbId,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants WHERE reservation_id = $1 ORDER BY team"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(reservation_id)
            .fetch_all(pool)
            .await
    }

    /// Lock and return the participants of a reservation, by seat order.
    pub async fn lock_for_reservation(
        conn: &mut PgConnection,
        reservation_id: DbId,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants \
             WHERE reservation_id = $1 \
             ORDER BY id \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(reservation_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Find one user's seat on a reservation.
    pub async fn find(
        conn: &mut PgConnection,
        reservation_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants WHERE reservation_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(reservation_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Delete all participants of a reservation, returning how many were
    /// removed.
    pub async fn delete_for_reservation(
        conn: &mut PgConnection,
        reservation_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM participants WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete one user's seat, returning the removed row when it existed.
    pub async fn delete_one(
        conn: &mut PgConnection,
        reservation_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "DELETE FROM participants WHERE reservation_id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(reservation_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Remaining seat count on a reservation.
    pub async fn count_for_reservation(
        conn: &mut PgConnection,
        reservation_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE reservation_id = $1")
                .bind(reservation_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(count.unwrap_or(0))
    }

    /// Team seats already occupied on a reservation.
    pub async fn taken_teams(
        conn: &mut PgConnection,
        reservation_id: DbId,
    ) -> Result<Vec<i16>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT team FROM participants WHERE reservation_id = $1 ORDER BY team",
        )
        .bind(reservation_id)
        .fetch_all(&mut *conn)
        .await
    }
}

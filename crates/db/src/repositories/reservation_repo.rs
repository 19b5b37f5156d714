//! Repository for the `reservations` table.
//!
//! State transitions are validated against the core state machine before
//! being persisted; booking-path methods run on the caller's transaction.

use chrono::{DateTime, Utc};
use courtside_core::reservation::state_machine;
use courtside_core::types::{CalendarDate, DbId};
use sqlx::{PgConnection, PgPool};

use crate::models::reservation::{NewReservation, Reservation};

/// Column list for `reservations` queries.
const COLUMNS: &str = "id, slot_id, date, creator_user_id, reservation_type, etat, is_cancel, \
    coder, unit_total_price, is_prepaid_for_all, min_rating, max_rating, \
    set1_a, set1_b, set2_a, set2_b, set3_a, set3_b, super_tiebreak, teamwin, score_status, \
    last_score_submitter_id, last_score_update_at, confirmed_at, created_at, updated_at";

/// Reservation rows and their lifecycle writes.
pub struct ReservationRepo;

impl ReservationRepo {
    /// Insert a new reservation, returning the created row.
    ///
    /// Fails with a unique violation on `uq_reservations_coder` when the
    /// booking code collides; the booking engine retries with a fresh code.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewReservation,
    ) -> Result<Reservation, sqlx::Error> {
        let query = format!(
            "INSERT INTO reservations \
                 (slot_id, date, creator_user_id, reservation_type, etat, coder, \
                  unit_total_price, is_prepaid_for_all, min_rating, max_rating) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(input.slot_id)
            .bind(input.date)
            .bind(input.creator_user_id)
            .bind(input.reservation_type)
            .bind(input.etat)
            .bind(&input.coder)
            .bind(input.unit_total_price)
            .bind(input.is_prepaid_for_all)
            .bind(input.min_rating)
            .bind(input.max_rating)
            .fetch_one(&mut *conn)
            .await
    }

    /// Whether a booking code is already taken.
    pub async fn coder_exists(conn: &mut PgConnection, coder: &str) -> Result<bool, sqlx::Error> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM reservations WHERE coder = $1")
            .bind(coder)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }

    /// Find a reservation by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a reservation row for the duration of the caller's transaction.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// List a user's reservations (created or joined), newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT r.{} FROM reservations r \
             LEFT JOIN participants p ON p.reservation_id = r.id \
             WHERE r.creator_user_id = $1 OR p.user_id = $1 \
             ORDER BY r.date DESC, r.id DESC \
             LIMIT $2 OFFSET $3",
            COLUMNS.replace(", ", ", r."),
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Lock and return live reservations in a given state on any of the
    /// given slots for a date, ascending id order.
    pub async fn in_state_on_slots_locked(
        conn: &mut PgConnection,
        slot_ids: &[DbId],
        date: CalendarDate,
        etat: i16,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations \
             WHERE slot_id = ANY($1) AND date = $2 AND etat = $3 AND is_cancel = FALSE \
             ORDER BY id \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(slot_ids)
            .bind(date)
            .bind(etat)
            .fetch_all(&mut *conn)
            .await
    }

    /// Validated state transition between live states (pending/valid).
    pub async fn transition_state(
        conn: &mut PgConnection,
        id: DbId,
        from: i16,
        to: i16,
    ) -> Result<Reservation, sqlx::Error> {
        state_machine::validate_transition(from, to).map_err(sqlx::Error::Protocol)?;
        let query = format!(
            "UPDATE reservations SET etat = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(to)
            .fetch_one(&mut *conn)
            .await
    }

    /// Cancel a reservation: `is_cancel = true, etat = 3`.
    pub async fn mark_cancelled(
        conn: &mut PgConnection,
        id: DbId,
        from: i16,
    ) -> Result<Reservation, sqlx::Error> {
        state_machine::validate_transition(from, 3).map_err(sqlx::Error::Protocol)?;
        let query = format!(
            "UPDATE reservations SET etat = 3, is_cancel = TRUE, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Persist one score submission: all set fields, winner, status, and
    /// submitter bookkeeping.
    #[allow(clippy::too_many_arguments)]
    pub async fn persist_score(
        conn: &mut PgConnection,
        id: DbId,
        sets: [Option<i16>; 6],
        super_tiebreak: bool,
        teamwin: i16,
        score_status: i16,
        submitter_id: DbId,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<Reservation, sqlx::Error> {
        let query = format!(
            "UPDATE reservations \
             SET set1_a = $2, set1_b = $3, set2_a = $4, set2_b = $5, set3_a = $6, set3_b = $7, \
                 super_tiebreak = $8, teamwin = $9, score_status = $10, \
                 last_score_submitter_id = $11, last_score_update_at = NOW(), \
                 confirmed_at = $12, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(sets[0])
            .bind(sets[1])
            .bind(sets[2])
            .bind(sets[3])
            .bind(sets[4])
            .bind(sets[5])
            .bind(super_tiebreak)
            .bind(teamwin)
            .bind(score_status)
            .bind(submitter_id)
            .bind(confirmed_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Lock and return reservations with a pending score proposal older
    /// than `cutoff`, for the background finalizer.
    pub async fn stale_pending_scores_locked(
        conn: &mut PgConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations \
             WHERE score_status = 0 \
               AND last_score_submitter_id IS NOT NULL \
               AND last_score_update_at < $1 \
             ORDER BY id \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(cutoff)
            .fetch_all(&mut *conn)
            .await
    }

    /// Finalizer transition: pending proposal -> auto-confirmed.
    pub async fn mark_auto_confirmed(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE reservations \
             SET score_status = 2, confirmed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND score_status = 0",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Count the creator's live reservations on a calendar date, used to
    /// rate-limit the infinity membership tier.
    pub async fn creator_count_on_date(
        conn: &mut PgConnection,
        user_id: DbId,
        date: CalendarDate,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations \
             WHERE creator_user_id = $1 AND date = $2 AND is_cancel = FALSE",
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count.unwrap_or(0))
    }
}

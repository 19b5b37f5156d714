//! Repository for the `court_slots` table and the capacity arbiter.
//!
//! Sibling slots share `(court_id, start_time, end_time)` and pool their
//! capacity per date. All capacity decisions re-count VALID reservations
//! under row locks; the `available` column is only ever a hint.

use courtside_core::types::{CalendarDate, DbId};
use sqlx::{PgConnection, PgPool};

use crate::models::slot::{CourtSlot, SlotAvailability};

/// Column list for `court_slots` queries.
const COLUMNS: &str =
    "id, court_id, start_time, end_time, unit_price, capacity, available, created_at, updated_at";

/// Slot lookups plus the lock-disciplined capacity arbiter.
pub struct SlotRepo;

impl SlotRepo {
    /// Find a slot by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CourtSlot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM court_slots WHERE id = $1");
        sqlx::query_as::<_, CourtSlot>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a slot row for the duration of the caller's transaction.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<CourtSlot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM court_slots WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, CourtSlot>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Lock and return the siblings of a slot (same court and time bounds,
    /// excluding the slot itself), in ascending id order.
    ///
    /// The ordering is the workspace-wide lock order for slots; concurrent
    /// creators racing on the same time acquire locks in the same sequence.
    pub async fn lock_siblings(
        conn: &mut PgConnection,
        slot: &CourtSlot,
    ) -> Result<Vec<CourtSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM court_slots \
             WHERE court_id = $1 AND start_time = $2 AND end_time = $3 AND id <> $4 \
             ORDER BY id \
             FOR UPDATE"
        );
        sqlx::query_as::<_, CourtSlot>(&query)
            .bind(slot.court_id)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(slot.id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Lock and return the whole sibling group of a slot, itself included,
    /// in ascending id order.
    pub async fn lock_sibling_group(
        conn: &mut PgConnection,
        slot: &CourtSlot,
    ) -> Result<Vec<CourtSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM court_slots \
             WHERE court_id = $1 AND start_time = $2 AND end_time = $3 \
             ORDER BY id \
             FOR UPDATE"
        );
        sqlx::query_as::<_, CourtSlot>(&query)
            .bind(slot.court_id)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .fetch_all(&mut *conn)
            .await
    }

    /// Count VALID reservations on `(slot, date)` while locking the counted
    /// rows, so no concurrent transaction can add a VALID reservation the
    /// caller has not seen.
    ///
    /// Pending reservations hold no capacity and are not counted.
    pub async fn valid_count_locked(
        conn: &mut PgConnection,
        slot_id: DbId,
        date: CalendarDate,
    ) -> Result<i64, sqlx::Error> {
        // FOR UPDATE cannot be combined with aggregates; lock the ids and
        // count client-side.
        let ids: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM reservations \
             WHERE slot_id = $1 AND date = $2 AND etat = 1 AND is_cancel = FALSE \
             ORDER BY id \
             FOR UPDATE",
        )
        .bind(slot_id)
        .bind(date)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids.len() as i64)
    }

    /// Whether the slot still has room for one more VALID reservation on
    /// the given date. Locks the slot row and the counted reservations.
    pub async fn has_available_capacity(
        conn: &mut PgConnection,
        slot_id: DbId,
        date: CalendarDate,
    ) -> Result<bool, sqlx::Error> {
        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT capacity FROM court_slots WHERE id = $1 FOR UPDATE")
                .bind(slot_id)
                .fetch_optional(&mut *conn)
                .await?;
        let capacity = i64::from(capacity.unwrap_or(1).max(0));

        let active = Self::valid_count_locked(conn, slot_id, date).await?;
        Ok(active < capacity)
    }

    /// Find the first sibling of `slot` with free capacity on `date`,
    /// locking every row inspected.
    pub async fn find_free_sibling(
        conn: &mut PgConnection,
        slot: &CourtSlot,
        date: CalendarDate,
    ) -> Result<Option<CourtSlot>, sqlx::Error> {
        let siblings = Self::lock_siblings(conn, slot).await?;
        for sibling in siblings {
            if Self::has_available_capacity(conn, sibling.id, date).await? {
                return Ok(Some(sibling));
            }
        }
        Ok(None)
    }

    /// Update the availability hint.
    pub async fn set_available(
        conn: &mut PgConnection,
        slot_id: DbId,
        available: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE court_slots SET available = $2, updated_at = NOW() WHERE id = $1")
            .bind(slot_id)
            .bind(available)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Read-only listing of a court's slots with availability computed for
    /// one date. Bypasses locks; booking re-checks under lock anyway.
    pub async fn list_for_court_date(
        pool: &PgPool,
        court_id: DbId,
        date: CalendarDate,
    ) -> Result<Vec<SlotAvailability>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM court_slots \
             WHERE court_id = $1 \
             ORDER BY start_time, id"
        );
        let slots = sqlx::query_as::<_, CourtSlot>(&query)
            .bind(court_id)
            .fetch_all(pool)
            .await?;

        let ids: Vec<DbId> = slots.iter().map(|s| s.id).collect();
        let counts: Vec<(DbId, i64)> = sqlx::query_as(
            "SELECT slot_id, COUNT(*) FROM reservations \
             WHERE slot_id = ANY($1) AND date = $2 AND etat = 1 AND is_cancel = FALSE \
             GROUP BY slot_id",
        )
        .bind(&ids)
        .bind(date)
        .fetch_all(pool)
        .await?;

        Ok(slots
            .into_iter()
            .map(|slot| {
                let valid = counts
                    .iter()
                    .find(|(id, _)| *id == slot.id)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                let has_capacity = valid < i64::from(slot.capacity);
                SlotAvailability {
                    slot,
                    valid_reservations: valid,
                    has_capacity,
                }
            })
            .collect())
    }
}

//! Periodic auto-confirmation of stale score proposals.
//!
//! A proposal the other players neither confirmed nor disputed within 24
//! hours is taken at face value: the finalizer flips it to auto-confirmed,
//! notifies the match, and triggers the same rating task as a manual
//! confirmation. Runs on a fixed interval until cancelled.

use std::time::Duration;

use chrono::Utc;
use courtside_core::reservation::ScoreStatus;
use courtside_core::types::DbId;
use courtside_db::models::notification::{kinds, NewNotification};
use courtside_db::repositories::{NotificationRepo, ParticipantRepo, ReservationRepo};
use courtside_events::bus::{event_types, BookingEvent};
use sqlx::PgConnection;
use tokio_util::sync::CancellationToken;

use crate::engine::scores;
use crate::state::AppState;

/// Proposals older than this are auto-confirmed.
const AUTO_CONFIRM_AFTER_HOURS: i64 = 24;

/// Run the score finalizer loop until `cancel` is triggered.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let interval_secs = state.config.finalizer_interval_secs;
    tracing::info!(
        interval_secs,
        threshold_hours = AUTO_CONFIRM_AFTER_HOURS,
        "Score finalizer started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Score finalizer stopping");
                break;
            }
            _ = interval.tick() => {
                match finalize_stale_scores(&state).await {
                    Ok(0) => tracing::debug!("Score finalizer: nothing to confirm"),
                    Ok(confirmed) => {
                        tracing::info!(confirmed, "Score finalizer: auto-confirmed stale proposals");
                    }
                    Err(e) => tracing::error!(error = %e, "Score finalizer cycle failed"),
                }
            }
        }
    }
}

/// One finalizer cycle. Returns how many reservations were auto-confirmed.
pub async fn finalize_stale_scores(state: &AppState) -> Result<usize, sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::hours(AUTO_CONFIRM_AFTER_HOURS);

    let mut tx = state.pool.begin().await?;
    let conn: &mut PgConnection = &mut tx;

    let stale = ReservationRepo::stale_pending_scores_locked(conn, cutoff).await?;
    let mut confirmed: Vec<(DbId, Vec<DbId>)> = Vec::new();

    for reservation in &stale {
        ReservationRepo::mark_auto_confirmed(conn, reservation.id).await?;

        let mut notification_ids = Vec::new();
        for p in ParticipantRepo::lock_for_reservation(conn, reservation.id).await? {
            let id = NotificationRepo::create(
                conn,
                &NewNotification {
                    recipient_id: p.user_id,
                    reservation_id: Some(reservation.id),
                    submitter_id: reservation.last_score_submitter_id,
                    kind: kinds::MATCH_STATUS_CHANGED,
                    title: Some("Score auto-confirmed".into()),
                    message: format!(
                        "The score of match {} was confirmed automatically after 24 hours",
                        reservation.coder
                    ),
                    data: None,
                },
            )
            .await?;
            notification_ids.push(id);
        }

        tracing::info!(
            reservation_id = reservation.id,
            status = ScoreStatus::AutoConfirmed.id(),
            "Stale score proposal auto-confirmed"
        );
        confirmed.push((reservation.id, notification_ids));
    }

    tx.commit().await?;

    for (reservation_id, notification_ids) in &confirmed {
        state.event_bus.publish(
            BookingEvent::new(event_types::SCORE_CONFIRMED)
                .with_reservation(*reservation_id)
                .with_notifications(notification_ids.clone()),
        );
        scores::spawn_rating_update(state, *reservation_id);
    }

    Ok(confirmed.len())
}

/// Spawn the finalizer as a background task.
pub fn spawn(state: AppState, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(state, cancel).await;
    })
}

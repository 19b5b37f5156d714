//! Score confirmation protocol.
//!
//! Two participants submit independently; a second, identical submission
//! from a different player confirms the score, a mismatch flags a conflict,
//! and anything else restarts the proposal. Confirmed scores are locked and
//! trigger the rating task in the background.

use chrono::Utc;
use courtside_core::error::CoreError;
use courtside_core::reservation::{score_machine, ScoreStatus};
use courtside_core::scoring::{self, ScoreSheet, SetScore};
use courtside_core::types::DbId;
use courtside_db::models::notification::{kinds, NewNotification};
use courtside_db::models::reservation::{Reservation, ScoreUpdate};
use courtside_db::repositories::{NotificationRepo, ParticipantRepo, ReservationRepo};
use courtside_events::bus::{event_types, BookingEvent};
use sqlx::PgConnection;

use crate::engine::ratings;
use crate::error::AppResult;
use crate::state::AppState;

/// Submit one player's score for a reservation.
///
/// Returns the updated reservation. When the submission confirms the score,
/// the rating update runs as a detached task; its failures never surface
/// here.
pub async fn update_score(
    state: &AppState,
    reservation_id: DbId,
    submission: ScoreUpdate,
    submitter_id: DbId,
) -> AppResult<Reservation> {
    let sheet = sheet_from_submission(&submission);
    let winner = scoring::derive_winner(&sheet)?;

    let mut tx = state.pool.begin().await?;
    let conn: &mut PgConnection = &mut tx;

    let reservation = ReservationRepo::lock_by_id(conn, reservation_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Reservation",
            id: reservation_id,
        })?;

    let current_status = ScoreStatus::from_id(reservation.score_status)
        .ok_or_else(|| CoreError::Internal(format!(
            "reservation {reservation_id} has unknown score status {}",
            reservation.score_status
        )))?;
    if current_status.is_locked() {
        return Err(CoreError::ScoreLocked.into());
    }

    let participants = ParticipantRepo::lock_for_reservation(conn, reservation.id).await?;
    if !participants.iter().any(|p| p.user_id == submitter_id) {
        return Err(
            CoreError::Validation("submitter is not a participant of this match".into()).into(),
        );
    }

    // Second opinion: a different player already has a proposal on record.
    let previous_submitter = reservation.last_score_submitter_id;
    let new_status = match (current_status, previous_submitter) {
        (ScoreStatus::Pending, Some(previous)) if previous != submitter_id => {
            let stored = reservation.score_sheet();
            let identical = stored.as_ref() == Some(&sheet)
                && reservation.teamwin == Some(i16::from(winner));
            if identical {
                ScoreStatus::Confirmed
            } else {
                ScoreStatus::Conflict
            }
        }
        _ => ScoreStatus::Pending,
    };

    score_machine::validate_transition(current_status.id(), new_status.id())
        .map_err(CoreError::Internal)?;

    let sets = sets_array(&sheet);
    let confirmed_at = (new_status == ScoreStatus::Confirmed).then(Utc::now);
    let updated = ReservationRepo::persist_score(
        conn,
        reservation.id,
        sets,
        sheet.super_tiebreak,
        i16::from(winner),
        new_status.id(),
        submitter_id,
        confirmed_at,
    )
    .await?;

    // Notify the rest of the match.
    let (kind, title) = match new_status {
        ScoreStatus::Confirmed => (kinds::SCORE_CONFIRMED, "Score confirmed"),
        ScoreStatus::Conflict => (kinds::SCORE_CONFLICT, "Score submissions disagree"),
        _ => (kinds::SCORE_PROPOSAL, "Score submitted"),
    };
    let mut notification_ids = Vec::new();
    for p in participants.iter().filter(|p| {
        p.user_id != submitter_id
            && (new_status != ScoreStatus::Confirmed || Some(p.user_id) != previous_submitter)
    }) {
        let id = NotificationRepo::create(
            conn,
            &NewNotification {
                recipient_id: p.user_id,
                reservation_id: Some(reservation.id),
                submitter_id: Some(submitter_id),
                kind,
                title: Some(title.into()),
                message: format!("Match {}: {}", reservation.coder, score_line(&sheet)),
                data: None,
            },
        )
        .await?;
        notification_ids.push(id);
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id,
        submitter_id,
        status = new_status.id(),
        teamwin = winner,
        "Score submission persisted"
    );

    let event_type = match new_status {
        ScoreStatus::Confirmed => event_types::SCORE_CONFIRMED,
        ScoreStatus::Conflict => event_types::SCORE_CONFLICT,
        _ => event_types::SCORE_SUBMITTED,
    };
    state.event_bus.publish(
        BookingEvent::new(event_type)
            .with_reservation(reservation_id)
            .with_actor(submitter_id)
            .with_notifications(notification_ids),
    );

    if new_status == ScoreStatus::Confirmed {
        spawn_rating_update(state, reservation_id);
    }

    Ok(updated)
}

/// Run the rating task detached; log failures instead of surfacing them.
pub fn spawn_rating_update(state: &AppState, reservation_id: DbId) {
    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(e) = ratings::update_player_ratings(&pool, reservation_id).await {
            tracing::error!(
                reservation_id,
                error = %e,
                "Background rating update failed"
            );
        }
    });
}

/// Build the domain score sheet from a wire submission.
fn sheet_from_submission(submission: &ScoreUpdate) -> ScoreSheet {
    let mut sets = vec![
        SetScore::new(submission.set1_a, submission.set1_b),
        SetScore::new(submission.set2_a, submission.set2_b),
    ];
    if let (Some(a), Some(b)) = (submission.set3_a, submission.set3_b) {
        sets.push(SetScore::new(a, b));
    }
    ScoreSheet {
        sets,
        super_tiebreak: submission.super_tiebreak,
    }
}

/// Flatten a sheet into the six set columns.
fn sets_array(sheet: &ScoreSheet) -> [Option<i16>; 6] {
    let third = sheet.sets.get(2);
    [
        Some(sheet.sets[0].a),
        Some(sheet.sets[0].b),
        Some(sheet.sets[1].a),
        Some(sheet.sets[1].b),
        third.map(|s| s.a),
        third.map(|s| s.b),
    ]
}

/// Human-readable score line for notifications, e.g. `6-4 4-6 10-7`.
fn score_line(sheet: &ScoreSheet) -> String {
    sheet
        .sets
        .iter()
        .map(|s| format!("{}-{}", s.a, s.b))
        .collect::<Vec<_>>()
        .join(" ")
}

//! Background rating and reliability updates after a confirmed score.
//!
//! Reads its inputs from a committed snapshot and writes each player's new
//! numbers in short standalone statements. Any inconsistency (missing
//! seats, missing score) aborts silently with a warning: score confirmation
//! must never depend on this task.

use courtside_core::rating::{self, RatingInputs};
use courtside_core::reliability::{self, ReliabilityInputs};
use courtside_core::scoring;
use courtside_core::types::DbId;
use courtside_db::models::user::User;
use courtside_db::repositories::{ParticipantRepo, ReservationRepo, UserRepo};
use courtside_db::DbPool;

use crate::error::AppResult;

/// Seats 0/1 vs 2/3.
const TEAM_A_SEATS: [i16; 2] = [0, 1];
const TEAM_B_SEATS: [i16; 2] = [2, 3];

/// Recompute and persist ratings and reliabilities for all four players of
/// a confirmed match.
pub async fn update_player_ratings(pool: &DbPool, reservation_id: DbId) -> AppResult<()> {
    let Some(reservation) = ReservationRepo::find_by_id(pool, reservation_id).await? else {
        tracing::warn!(reservation_id, "Rating update skipped, reservation not found");
        return Ok(());
    };

    let Some(sheet) = reservation.score_sheet() else {
        tracing::warn!(reservation_id, "Rating update skipped, no stored score");
        return Ok(());
    };
    let (games_a, games_b) = scoring::games_totals(&sheet);

    let participants = ParticipantRepo::list_for_reservation(pool, reservation_id).await?;
    let seat = |wanted: i16| participants.iter().find(|p| p.team == wanted);

    let seats: Vec<_> = TEAM_A_SEATS
        .iter()
        .chain(TEAM_B_SEATS.iter())
        .map(|&t| seat(t))
        .collect();
    if seats.iter().any(|s| s.is_none()) {
        tracing::warn!(
            reservation_id,
            participant_count = participants.len(),
            "Rating update skipped, match is missing seats"
        );
        return Ok(());
    }
    let seats: Vec<_> = seats.into_iter().flatten().collect();

    // Load all four up front so every player's update sees the same
    // pre-match numbers.
    let mut snapshot: Vec<User> = Vec::with_capacity(4);
    for p in &seats {
        let Some(user) = UserRepo::find_by_id(pool, p.user_id).await? else {
            tracing::warn!(
                reservation_id,
                user_id = p.user_id,
                "Rating update skipped, participant user missing"
            );
            return Ok(());
        };
        snapshot.push(user);
    }
    let team_a_sum = snapshot[0].rating + snapshot[1].rating;
    let team_b_sum = snapshot[2].rating + snapshot[3].rating;

    let winner_is_a = match reservation.teamwin {
        Some(1) => true,
        Some(2) => false,
        other => {
            tracing::warn!(reservation_id, ?other, "Rating update skipped, no winner recorded");
            return Ok(());
        }
    };
    let (winner_sum, loser_sum) = if winner_is_a {
        (team_a_sum, team_b_sum)
    } else {
        (team_b_sum, team_a_sum)
    };

    for (idx, player) in snapshot.iter().enumerate() {
        let on_team_a = idx < 2;
        let teammate = &snapshot[if on_team_a { 1 - idx } else { 5 - idx }];
        let (opp1, opp2) = if on_team_a {
            (&snapshot[2], &snapshot[3])
        } else {
            (&snapshot[0], &snapshot[1])
        };

        let inputs = RatingInputs {
            player_rating: player.rating,
            teammate_rating: teammate.rating,
            opponent1_rating: opp1.rating,
            opponent2_rating: opp2.rating,
            games_won: if on_team_a { games_a } else { games_b },
            teammate_reliability: teammate.reliability_coefficient(),
            opponent1_reliability: opp1.reliability_coefficient(),
            opponent2_reliability: opp2.reliability_coefficient(),
        };

        let new_rating = match rating::next_rating(&inputs) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    reservation_id,
                    user_id = player.id,
                    error = %e,
                    "Rating engine rejected inputs"
                );
                continue;
            }
        };
        UserRepo::update_rating(pool, player.id, new_rating).await?;

        let reliability_inputs = ReliabilityInputs {
            current: player.reliability_coefficient(),
            winner_team_sum: winner_sum,
            loser_team_sum: loser_sum,
            other_reliabilities: [
                teammate.reliability_coefficient(),
                opp1.reliability_coefficient(),
                opp2.reliability_coefficient(),
            ],
        };
        match reliability::next_reliability(&reliability_inputs) {
            Ok(f) => {
                let pct = (f * 100.0).round() as i32;
                UserRepo::update_reliability(pool, player.id, pct).await?;
            }
            Err(e) => {
                tracing::warn!(
                    reservation_id,
                    user_id = player.id,
                    error = %e,
                    "Reliability engine rejected inputs"
                );
            }
        }

        tracing::info!(
            reservation_id,
            user_id = player.id,
            old_rating = player.rating,
            new_rating,
            "Player rating updated"
        );
    }

    Ok(())
}

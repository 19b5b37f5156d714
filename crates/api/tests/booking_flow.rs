//! End-to-end booking flows through the engine: creation, pricing, sibling
//! fallback, joins, promotion sweeps, and refund-exact cancellation.

mod common;

use common::*;
use courtside_api::engine::booking::{
    self, CancelReservation, CreateReservation, JoinReservation,
};
use courtside_api::error::AppError;
use courtside_core::error::CoreError;
use courtside_core::types::DbId;
use sqlx::PgPool;

fn private_credit(slot_id: DbId, user_id: DbId) -> CreateReservation {
    CreateReservation {
        slot_id,
        date: match_date(),
        user_id,
        reservation_type: 1,
        payment_channel: 1,
        pay_for_all: false,
        min_rating: None,
        max_rating: None,
    }
}

fn open_credit(slot_id: DbId, user_id: DbId) -> CreateReservation {
    CreateReservation {
        reservation_type: 2,
        ..private_credit(slot_id, user_id)
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn private_credit_reservation_is_valid_and_debited(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "creator@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1200.0, 1).await;

    let reservation = booking::create_reservation(&state, private_credit(slot, creator))
        .await
        .unwrap();

    assert_eq!(reservation.etat, 1);
    assert!(!reservation.is_cancel);
    assert_eq!(reservation.unit_total_price, 1200.0);
    assert_eq!(reservation.coder.len(), 8);
    assert_eq!(balance_of(&pool, creator).await, 3800.0);

    // Creator holds seat 0 and is marked paid.
    let (team, paid, is_creator): (i16, i16, bool) = sqlx::query_as(
        "SELECT team, payment_state, is_creator FROM participants WHERE reservation_id = $1",
    )
    .bind(reservation.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(team, 0);
    assert_eq!(paid, 1);
    assert!(is_creator);

    // The slot hint flips off for a confirmed private match.
    let available: bool = sqlx::query_scalar("SELECT available FROM court_slots WHERE id = $1")
        .bind(slot)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!available);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn open_reservation_starts_pending(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "open@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let mut req = open_credit(slot, creator);
    req.min_rating = Some(2.0);
    req.max_rating = Some(4.0);
    let reservation = booking::create_reservation(&state, req).await.unwrap();

    assert_eq!(reservation.etat, 0);
    assert_eq!(reservation.min_rating, Some(2.0));
    assert_eq!(reservation.max_rating, Some(4.0));
    // The creator still pays their own seat up front.
    assert_eq!(balance_of(&pool, creator).await, 4000.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inverted_rating_window_is_rejected(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "window@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let mut req = open_credit(slot, creator);
    req.min_rating = Some(5.0);
    req.max_rating = Some(2.0);
    let err = booking::create_reservation(&state, req).await.unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::InvalidRange(_))));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_slot_without_siblings_fails_slot_full(pool: PgPool) {
    let state = test_state(pool.clone());
    let holder = create_user(&pool, "holder@test.local", 5000.0).await;
    let creator = create_user(&pool, "late@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    create_reservation_row(&pool, slot, match_date(), holder, 1, 1, "HELDSLOT").await;

    let err = booking::create_reservation(&state, private_credit(slot, creator))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::SlotFull)));
    // The loser was never charged.
    assert_eq!(balance_of(&pool, creator).await, 5000.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_slot_reassigns_to_free_sibling(pool: PgPool) {
    let state = test_state(pool.clone());
    let holder = create_user(&pool, "holder2@test.local", 5000.0).await;
    let creator = create_user(&pool, "moved@test.local", 5000.0).await;

    let start = slot_start();
    let end = start + chrono::Duration::minutes(90);
    let requested = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let sibling = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;

    create_reservation_row(&pool, requested, match_date(), holder, 1, 1, "HELDREQ1").await;

    let reservation = booking::create_reservation(&state, private_credit(requested, creator))
        .await
        .unwrap();
    assert_eq!(reservation.slot_id, sibling);
    assert_eq!(reservation.etat, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sequential_race_on_capacity_one_slot(pool: PgPool) {
    let state = test_state(pool.clone());
    let first = create_user(&pool, "race1@test.local", 5000.0).await;
    let second = create_user(&pool, "race2@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    booking::create_reservation(&state, private_credit(slot, first))
        .await
        .unwrap();
    let err = booking::create_reservation(&state, private_credit(slot, second))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::SlotFull)));

    // Exactly one debit exists, for the winner.
    let debits: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE amount < 0")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(debits, 1);
    assert_eq!(balance_of(&pool, first).await, 4000.0);
    assert_eq!(balance_of(&pool, second).await, 5000.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn insufficient_funds_rolls_back_the_reservation(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "broke@test.local", 100.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let err = booking::create_reservation(&state, private_credit(slot, creator))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::InsufficientFunds)));

    let reservations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(reservations, 0);
    assert_eq!(balance_of(&pool, creator).await, 100.0);
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn discount_tier_takes_flat_amount_off(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_player(&pool, "member@test.local", 5000.0, 0.5, 20, 2).await;
    let slot = create_slot(&pool, 1, 1200.0, 1).await;

    booking::create_reservation(&state, private_credit(slot, creator))
        .await
        .unwrap();
    assert_eq!(balance_of(&pool, creator).await, 5000.0 - 900.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn infinity_tier_is_free_once_per_date(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_player(&pool, "infinity@test.local", 5000.0, 0.5, 20, 4).await;
    let slot_a = create_slot(&pool, 1, 1200.0, 1).await;
    let slot_b = create_slot(&pool, 2, 1200.0, 1).await;

    // First booking of the day is free: no debit at all, seat still paid.
    booking::create_reservation(&state, private_credit(slot_a, creator))
        .await
        .unwrap();
    assert_eq!(balance_of(&pool, creator).await, 5000.0);

    // Second booking the same date falls back to the full price.
    booking::create_reservation(&state, private_credit(slot_b, creator))
        .await
        .unwrap();
    assert_eq!(balance_of(&pool, creator).await, 5000.0 - 1200.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pay_for_all_charges_creator_for_four_seats(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "payall@test.local", 10000.0).await;
    let joiner = create_user(&pool, "guest@test.local", 500.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let mut req = private_credit(slot, creator);
    req.pay_for_all = true;
    let reservation = booking::create_reservation(&state, req).await.unwrap();

    assert_eq!(balance_of(&pool, creator).await, 10000.0 - 4000.0);
    assert_eq!(reservation.unit_total_price, 4000.0);
    assert!(reservation.is_prepaid_for_all);

    // Joiners ride on the prepaid seats.
    booking::join_reservation(
        &state,
        reservation.id,
        JoinReservation {
            user_id: joiner,
            team: 1,
        },
    )
    .await
    .unwrap();
    assert_eq!(balance_of(&pool, joiner).await, 500.0);
}

// ---------------------------------------------------------------------------
// Joining and promotion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn fourth_join_promotes_open_match(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "p0@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    let reservation = booking::create_reservation(&state, open_credit(slot, creator))
        .await
        .unwrap();
    assert_eq!(reservation.etat, 0);

    for (i, team) in [1i16, 2, 3].iter().enumerate() {
        let user = create_user(&pool, &format!("p{}@test.local", i + 1), 5000.0).await;
        booking::join_reservation(
            &state,
            reservation.id,
            JoinReservation {
                user_id: user,
                team: *team,
            },
        )
        .await
        .unwrap();
    }

    let etat: i16 = sqlx::query_scalar("SELECT etat FROM reservations WHERE id = $1")
        .bind(reservation.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(etat, 1);

    // Everyone paid their own seat.
    let debits: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE amount < 0")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(debits, 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn join_rejects_taken_seat_and_double_join(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "seat0@test.local", 5000.0).await;
    let joiner = create_user(&pool, "seat1@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    let reservation = booking::create_reservation(&state, open_credit(slot, creator))
        .await
        .unwrap();

    // Seat 0 belongs to the creator.
    let err = booking::join_reservation(
        &state,
        reservation.id,
        JoinReservation {
            user_id: joiner,
            team: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::Conflict(_))));

    booking::join_reservation(
        &state,
        reservation.id,
        JoinReservation {
            user_id: joiner,
            team: 1,
        },
    )
    .await
    .unwrap();
    let err = booking::join_reservation(
        &state,
        reservation.id,
        JoinReservation {
            user_id: joiner,
            team: 2,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::Conflict(_))));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn join_enforces_the_rating_window(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_player(&pool, "host@test.local", 5000.0, 3.0, 20, 0).await;
    let weak = create_player(&pool, "weak@test.local", 5000.0, 1.0, 20, 0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let mut req = open_credit(slot, creator);
    req.min_rating = Some(2.5);
    req.max_rating = Some(4.5);
    let reservation = booking::create_reservation(&state, req).await.unwrap();

    let err = booking::join_reservation(
        &state,
        reservation.id,
        JoinReservation {
            user_id: weak,
            team: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::Validation(_))));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn promotion_cancels_valid_open_sibling_and_spares_pending(pool: PgPool) {
    let state = test_state(pool.clone());
    let rival = create_user(&pool, "rival@test.local", 5000.0).await;
    let bystander = create_user(&pool, "bystander@test.local", 5000.0).await;
    let creator = create_user(&pool, "winner0@test.local", 5000.0).await;

    let start = slot_start();
    let end = start + chrono::Duration::minutes(90);
    let slot_a = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let slot_b = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;

    // A competing valid open match and an innocent pending bid on the sibling.
    let valid_rival =
        create_reservation_row(&pool, slot_b, match_date(), rival, 2, 1, "RIVALVAL").await;
    let pending_bid =
        create_reservation_row(&pool, slot_b, match_date(), bystander, 2, 0, "BYSTAND1").await;

    let reservation = booking::create_reservation(&state, open_credit(slot_a, creator))
        .await
        .unwrap();
    for (i, team) in [1i16, 2, 3].iter().enumerate() {
        let user = create_user(&pool, &format!("winner{}@test.local", i + 1), 5000.0).await;
        booking::join_reservation(
            &state,
            reservation.id,
            JoinReservation {
                user_id: user,
                team: *team,
            },
        )
        .await
        .unwrap();
    }

    let (rival_etat, rival_cancel): (i16, bool) =
        sqlx::query_as("SELECT etat, is_cancel FROM reservations WHERE id = $1")
            .bind(valid_rival)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rival_etat, 3);
    assert!(rival_cancel);

    // Pending bids are never swept by a promotion.
    let (bid_etat, bid_cancel): (i16, bool) =
        sqlx::query_as("SELECT etat, is_cancel FROM reservations WHERE id = $1")
            .bind(pending_bid)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(bid_etat, 0);
    assert!(!bid_cancel);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn private_creation_cancels_losing_pending_bids(pool: PgPool) {
    let state = test_state(pool.clone());
    let bidder = create_user(&pool, "bidder@test.local", 5000.0).await;
    let creator = create_user(&pool, "sniper@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    // An open bid holds no capacity but has paid its creator seat.
    let bid = booking::create_reservation(&state, open_credit(slot, bidder))
        .await
        .unwrap();
    assert_eq!(balance_of(&pool, bidder).await, 4000.0);

    // A private credit booking takes the slot outright.
    booking::create_reservation(&state, private_credit(slot, creator))
        .await
        .unwrap();

    let (bid_etat, bid_cancel): (i16, bool) =
        sqlx::query_as("SELECT etat, is_cancel FROM reservations WHERE id = $1")
            .bind(bid.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(bid_etat, 3);
    assert!(bid_cancel);

    // The losing bidder got their money back.
    assert_eq!(balance_of(&pool, bidder).await, 5000.0);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn creator_cancel_refunds_every_paid_seat(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "organizer@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let reservation = booking::create_reservation(&state, private_credit(slot, creator))
        .await
        .unwrap();

    let mut joiners = Vec::new();
    for (i, team) in [1i16, 2, 3].iter().enumerate() {
        let user = create_user(&pool, &format!("mate{}@test.local", i + 1), 2000.0).await;
        booking::join_reservation(
            &state,
            reservation.id,
            JoinReservation {
                user_id: user,
                team: *team,
            },
        )
        .await
        .unwrap();
        joiners.push(user);
    }
    for &j in &joiners {
        assert_eq!(balance_of(&pool, j).await, 1000.0);
    }

    let cancelled = booking::cancel_reservation(
        &state,
        reservation.id,
        CancelReservation { user_id: creator },
    )
    .await
    .unwrap();

    assert_eq!(cancelled.etat, 3);
    assert!(cancelled.is_cancel);

    // Everyone got back exactly what they were debited.
    assert_eq!(balance_of(&pool, creator).await, 5000.0);
    for &j in &joiners {
        assert_eq!(balance_of(&pool, j).await, 2000.0);
    }

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE reservation_id = $1")
            .bind(reservation.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);

    let available: bool = sqlx::query_scalar("SELECT available FROM court_slots WHERE id = $1")
        .bind(slot)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(available);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn leaving_participant_reverts_valid_match_to_pending(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "stay0@test.local", 5000.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    let reservation = booking::create_reservation(&state, open_credit(slot, creator))
        .await
        .unwrap();

    let mut joiners = Vec::new();
    for (i, team) in [1i16, 2, 3].iter().enumerate() {
        let user = create_user(&pool, &format!("stay{}@test.local", i + 1), 2000.0).await;
        booking::join_reservation(
            &state,
            reservation.id,
            JoinReservation {
                user_id: user,
                team: *team,
            },
        )
        .await
        .unwrap();
        joiners.push(user);
    }

    let leaver = joiners[2];
    let updated = booking::cancel_reservation(
        &state,
        reservation.id,
        CancelReservation { user_id: leaver },
    )
    .await
    .unwrap();

    assert_eq!(updated.etat, 0);
    assert!(!updated.is_cancel);
    assert_eq!(balance_of(&pool, leaver).await, 2000.0);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE reservation_id = $1")
            .bind(reservation.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancellation_inside_24h_window_is_rejected(pool: PgPool) {
    let state = test_state(pool.clone());
    let creator = create_user(&pool, "latecancel@test.local", 5000.0).await;

    // Slot starting two hours from now, booked for today.
    let start = chrono::Utc::now() + chrono::Duration::hours(2);
    let slot = create_slot_at(&pool, 1, start, start + chrono::Duration::minutes(90), 1000.0, 1)
        .await;

    let mut req = private_credit(slot, creator);
    req.date = start.date_naive();
    let reservation = booking::create_reservation(&state, req).await.unwrap();

    let err = booking::cancel_reservation(
        &state,
        reservation.id,
        CancelReservation { user_id: creator },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::TooLateToCancel)));
}

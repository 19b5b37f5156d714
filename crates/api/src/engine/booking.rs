//! Reservation state machine: create, join, cancel.
//!
//! Lock order inside every transaction: creator/acting user, target slot,
//! sibling slots in ascending id, then reservation and participant rows.
//! Capacity is always recomputed under lock; the slot's `available` column
//! is maintained as a hint only.

use chrono::Utc;
use courtside_core::error::CoreError;
use courtside_core::types::{CalendarDate, DbId};
use courtside_core::{coder, ledger, pricing};
use courtside_core::reservation::{
    PaymentChannel, PaymentState, ReservationKind, ReservationState, SEATS_PER_MATCH,
};
use courtside_db::models::notification::{kinds, NewNotification};
use courtside_db::models::participant::{NewParticipant, Participant};
use courtside_db::models::reservation::{NewReservation, Reservation};
use courtside_db::models::slot::CourtSlot;
use courtside_db::repositories::{
    CreditLedgerRepo, DebitOutcome, NotificationRepo, ParticipantRepo, ReservationRepo, SlotRepo,
    UserRepo,
};
use courtside_events::bus::{event_types, BookingEvent};
use serde::Deserialize;
use sqlx::PgConnection;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Hours before match start after which cancellation is refused.
const CANCEL_WINDOW_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Payload for `POST /reservations`.
#[derive(Debug, Deserialize)]
pub struct CreateReservation {
    pub slot_id: DbId,
    pub date: CalendarDate,
    pub user_id: DbId,
    /// 1 = private, 2 = open.
    #[serde(rename = "type")]
    pub reservation_type: i16,
    /// 1 = credit, 2 = on site.
    pub payment_channel: i16,
    /// Creator prepays all four seats.
    #[serde(default)]
    pub pay_for_all: bool,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

/// Payload for `POST /reservations/{id}/join`.
#[derive(Debug, Deserialize)]
pub struct JoinReservation {
    pub user_id: DbId,
    /// Seat 0..=3; 0/1 team A, 2/3 team B.
    pub team: i16,
}

/// Payload for `POST /reservations/{id}/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelReservation {
    pub user_id: DbId,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Book a slot for a creator, falling back to a free sibling when the
/// requested slot is full.
pub async fn create_reservation(
    state: &AppState,
    req: CreateReservation,
) -> AppResult<Reservation> {
    let kind = ReservationKind::from_id(req.reservation_type)
        .ok_or_else(|| CoreError::Validation("unknown reservation type".into()))?;
    let channel = PaymentChannel::from_id(req.payment_channel)
        .ok_or_else(|| CoreError::Validation("unknown payment channel".into()))?;

    validate_rating_window(kind, req.min_rating, req.max_rating)?;

    let mut tx = state.pool.begin().await?;
    let conn: &mut PgConnection = &mut tx;

    let creator = UserRepo::lock_by_id(conn, req.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: req.user_id,
        })?;

    let requested = SlotRepo::lock_by_id(conn, req.slot_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "CourtSlot",
            id: req.slot_id,
        })?;

    // Capacity check on the requested slot, sibling fallback on failure.
    let slot = if SlotRepo::has_available_capacity(conn, requested.id, req.date).await? {
        requested
    } else {
        match SlotRepo::find_free_sibling(conn, &requested, req.date).await? {
            Some(sibling) => {
                tracing::info!(
                    requested_slot_id = requested.id,
                    sibling_slot_id = sibling.id,
                    "Requested slot full, reassigned to sibling"
                );
                sibling
            }
            None => return Err(CoreError::SlotFull.into()),
        }
    };

    // Effective charge for the creator.
    let infinity_available = creator.membership_tier == pricing::TIER_INFINITY
        && ReservationRepo::creator_count_on_date(conn, creator.id, req.date).await? == 0;
    let seat_price = pricing::creator_seat_price(
        slot.unit_price,
        creator.membership_tier,
        infinity_available,
    );
    let skip_deduction = pricing::should_skip_deduction(kind, channel);
    let charge = if skip_deduction {
        0.0
    } else {
        pricing::creator_charge(seat_price, slot.unit_price, req.pay_for_all)
    };

    // Private matches paid by credit are valid immediately; everything else
    // starts pending.
    let etat = if kind == ReservationKind::Private && channel == PaymentChannel::Credit {
        ReservationState::Valid
    } else {
        ReservationState::Pending
    };

    let reservation = insert_with_fresh_coder(
        conn,
        NewReservation {
            slot_id: slot.id,
            date: req.date,
            creator_user_id: creator.id,
            reservation_type: kind.id(),
            etat: etat.id(),
            coder: String::new(),
            unit_total_price: if req.pay_for_all { charge } else { seat_price },
            is_prepaid_for_all: req.pay_for_all,
            min_rating: if kind == ReservationKind::Open { req.min_rating } else { None },
            max_rating: if kind == ReservationKind::Open { req.max_rating } else { None },
        },
    )
    .await?;

    let mut notification_ids = Vec::new();

    if charge > 0.0 {
        let key = ledger::creator_debit_key(reservation.id, creator.id);
        match CreditLedgerRepo::debit(conn, creator.id, charge, &key).await? {
            DebitOutcome::Applied(_) => {
                let id = NotificationRepo::create(
                    conn,
                    &NewNotification {
                        recipient_id: creator.id,
                        reservation_id: Some(reservation.id),
                        submitter_id: None,
                        kind: kinds::CREDIT_DEDUCTION,
                        title: Some("Credit charged".into()),
                        message: format!("{charge:.0} credits charged for booking {}", reservation.coder),
                        data: None,
                    },
                )
                .await?;
                notification_ids.push(id);
            }
            DebitOutcome::InsufficientFunds => return Err(CoreError::InsufficientFunds.into()),
            DebitOutcome::InvalidAmount => return Err(CoreError::InvalidAmount.into()),
        }
    }

    // Re-check capacity on the finally selected slot: a concurrent inserter
    // may have slipped in between the first check and now. Our own row is
    // already inserted, so a valid reservation may fill the last seat but
    // never exceed capacity.
    let valid_count = SlotRepo::valid_count_locked(conn, slot.id, req.date).await?;
    let capacity = i64::from(slot.capacity);
    let over = if etat == ReservationState::Valid {
        valid_count > capacity
    } else {
        valid_count >= capacity
    };
    if over {
        return Err(CoreError::SlotJustTaken.into());
    }

    // A private credit booking confirms the match on the spot; pending bids
    // on a fully-booked sibling group lose and are refunded.
    if etat == ReservationState::Valid {
        cancel_excess_pending(conn, &slot, req.date, &mut notification_ids).await?;
    }

    // Availability hint.
    let at_capacity = valid_count >= capacity;
    if etat == ReservationState::Valid || at_capacity {
        SlotRepo::set_available(conn, slot.id, false).await?;
    }

    ParticipantRepo::insert(
        conn,
        &NewParticipant {
            reservation_id: reservation.id,
            user_id: creator.id,
            is_creator: true,
            payment_state: if skip_deduction {
                PaymentState::Unpaid.id()
            } else {
                PaymentState::Paid.id()
            },
            payment_channel: channel.id(),
            team: 0,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        reservation_id = reservation.id,
        slot_id = reservation.slot_id,
        creator_id = reservation.creator_user_id,
        etat = reservation.etat,
        charge,
        "Reservation created"
    );

    state.event_bus.publish(
        BookingEvent::new(event_types::RESERVATION_CREATED)
            .with_reservation(reservation.id)
            .with_actor(reservation.creator_user_id)
            .with_notifications(notification_ids)
            .with_payload(serde_json::json!({ "coder": reservation.coder })),
    );

    Ok(reservation)
}

/// Insert the reservation under a freshly generated booking code, retrying
/// a bounded number of times when the code is already taken.
async fn insert_with_fresh_coder(
    conn: &mut PgConnection,
    mut input: NewReservation,
) -> AppResult<Reservation> {
    for _ in 0..coder::MAX_CODER_ATTEMPTS {
        let candidate = {
            let mut rng = rand::thread_rng();
            coder::generate(&mut rng)
        };
        if ReservationRepo::coder_exists(conn, &candidate).await? {
            continue;
        }
        input.coder = candidate;
        return Ok(ReservationRepo::insert(conn, &input).await?);
    }
    Err(CoreError::SlotContention.into())
}

/// Open matches advertise a rating window; reject inverted or non-finite
/// bounds up front.
fn validate_rating_window(
    kind: ReservationKind,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), CoreError> {
    if kind != ReservationKind::Open {
        return Ok(());
    }
    match (min, max) {
        (None, None) => Ok(()),
        (Some(min), Some(max)) => {
            if !min.is_finite() || !max.is_finite() {
                return Err(CoreError::InvalidRange("bounds must be finite".into()));
            }
            if min > max {
                return Err(CoreError::InvalidRange(format!(
                    "min {min} exceeds max {max}"
                )));
            }
            Ok(())
        }
        _ => Err(CoreError::InvalidRange(
            "both bounds are required when a window is set".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Take a seat on an open pending reservation. Filling the fourth seat
/// promotes the match to valid and displaces competing valid siblings.
pub async fn join_reservation(
    state: &AppState,
    reservation_id: DbId,
    req: JoinReservation,
) -> AppResult<Participant> {
    if !(0..=3).contains(&req.team) {
        return Err(CoreError::Validation("team seat must be 0..=3".into()).into());
    }

    let mut tx = state.pool.begin().await?;
    let conn: &mut PgConnection = &mut tx;

    let user = UserRepo::lock_by_id(conn, req.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: req.user_id,
        })?;

    let reservation = ReservationRepo::lock_by_id(conn, reservation_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Reservation",
            id: reservation_id,
        })?;

    let is_open = reservation.reservation_type == ReservationKind::Open.id();
    let joinable_state = ReservationState::from_id(reservation.etat)
        .is_some_and(|s| !s.is_cancelled());
    if reservation.is_cancel || !joinable_state {
        return Err(CoreError::Conflict("reservation is not joinable".into()).into());
    }

    // Rating window advertised by open matches.
    if is_open {
        if let (Some(min), Some(max)) = (reservation.min_rating, reservation.max_rating) {
            if user.rating < min || user.rating > max {
                return Err(CoreError::Validation(format!(
                    "rating {} outside the advertised window [{min}, {max}]",
                    user.rating
                ))
                .into());
            }
        }
    }

    let slot = SlotRepo::lock_by_id(conn, reservation.slot_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "CourtSlot",
            id: reservation.slot_id,
        })?;

    if ParticipantRepo::find(conn, reservation.id, user.id).await?.is_some() {
        return Err(CoreError::Conflict("user already holds a seat".into()).into());
    }
    let taken = ParticipantRepo::taken_teams(conn, reservation.id).await?;
    if taken.contains(&req.team) {
        return Err(CoreError::Conflict(format!("seat {} is taken", req.team)).into());
    }

    // Joiners pay the full seat price by credit unless the creator prepaid.
    if !reservation.is_prepaid_for_all && slot.unit_price > 0.0 {
        let key = ledger::join_debit_key(reservation.id, user.id, req.team);
        match CreditLedgerRepo::debit(conn, user.id, slot.unit_price, &key).await? {
            DebitOutcome::Applied(_) => {}
            DebitOutcome::InsufficientFunds => return Err(CoreError::InsufficientFunds.into()),
            DebitOutcome::InvalidAmount => return Err(CoreError::InvalidAmount.into()),
        }
    }

    let participant = ParticipantRepo::insert(
        conn,
        &NewParticipant {
            reservation_id: reservation.id,
            user_id: user.id,
            is_creator: false,
            payment_state: PaymentState::Paid.id(),
            payment_channel: PaymentChannel::Credit.id(),
            team: req.team,
        },
    )
    .await?;

    let mut notification_ids = Vec::new();
    let mut promoted = false;

    // Only open matches wait for their fourth player; a private match is
    // already valid (credit) or stays pending until paid on site.
    let seats = ParticipantRepo::count_for_reservation(conn, reservation.id).await?;
    if is_open && reservation.etat == ReservationState::Pending.id() && seats == SEATS_PER_MATCH {
        // Pending bids hold no capacity; the promotion is the moment this
        // match claims a seat on the slot, and it may find none left.
        if !SlotRepo::has_available_capacity(conn, slot.id, reservation.date).await? {
            return Err(CoreError::SlotFull.into());
        }
        ReservationRepo::transition_state(
            conn,
            reservation.id,
            ReservationState::Pending.id(),
            ReservationState::Valid.id(),
        )
        .await?;
        promoted = true;

        cancel_valid_siblings(conn, &reservation, &slot, &mut notification_ids).await?;

        if !SlotRepo::has_available_capacity(conn, slot.id, reservation.date).await? {
            SlotRepo::set_available(conn, slot.id, false).await?;
        }

        // Everyone on the match hears that it is confirmed.
        for p in ParticipantRepo::lock_for_reservation(conn, reservation.id).await? {
            let id = NotificationRepo::create(
                conn,
                &NewNotification {
                    recipient_id: p.user_id,
                    reservation_id: Some(reservation.id),
                    submitter_id: None,
                    kind: kinds::RESERVATION_CONFIRMED,
                    title: Some("Match confirmed".into()),
                    message: format!("Match {} has all four players", reservation.coder),
                    data: None,
                },
            )
            .await?;
            notification_ids.push(id);
        }
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id = reservation.id,
        user_id = user.id,
        team = req.team,
        promoted,
        "Participant joined"
    );

    state.event_bus.publish(
        BookingEvent::new(if promoted {
            event_types::RESERVATION_VALIDATED
        } else {
            event_types::PARTICIPANT_JOINED
        })
        .with_reservation(reservation.id)
        .with_actor(user.id)
        .with_notifications(notification_ids),
    );

    Ok(participant)
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// Cancel a reservation, either wholesale (creator) or a single seat
/// (participant). Refunds exactly what the ledger says was debited.
pub async fn cancel_reservation(
    state: &AppState,
    reservation_id: DbId,
    req: CancelReservation,
) -> AppResult<Reservation> {
    let mut tx = state.pool.begin().await?;
    let conn: &mut PgConnection = &mut tx;

    let reservation = ReservationRepo::lock_by_id(conn, reservation_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Reservation",
            id: reservation_id,
        })?;

    if reservation.is_cancel
        || ReservationState::from_id(reservation.etat).is_some_and(|s| s.is_cancelled())
    {
        return Err(CoreError::Conflict("reservation is already cancelled".into()).into());
    }

    let slot = SlotRepo::lock_by_id(conn, reservation.slot_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "CourtSlot",
            id: reservation.slot_id,
        })?;

    // The 24-hour window is measured against the match start on the
    // reservation's calendar date, at the slot's time of day.
    let match_start = reservation
        .date
        .and_time(slot.start_time.time())
        .and_utc();
    if Utc::now() + chrono::Duration::hours(CANCEL_WINDOW_HOURS) > match_start {
        return Err(CoreError::TooLateToCancel.into());
    }

    let participants = ParticipantRepo::lock_for_reservation(conn, reservation.id).await?;
    let mut notification_ids = Vec::new();

    let is_creator = reservation.creator_user_id == req.user_id;

    let cancelled = if is_creator {
        // Refund every paid seat exactly what its debit says.
        for p in &participants {
            if p.payment_state == PaymentState::Paid.id() {
                refund_from_debit(
                    conn,
                    p.user_id,
                    reservation.id,
                    &ledger::participant_refund_key(reservation.id, p.user_id, p.id),
                )
                .await?;
            }
        }

        let cancelled = ReservationRepo::mark_cancelled(conn, reservation.id, reservation.etat).await?;
        ParticipantRepo::delete_for_reservation(conn, reservation.id).await?;

        for p in participants.iter().filter(|p| p.user_id != req.user_id) {
            let id = NotificationRepo::create(
                conn,
                &NewNotification {
                    recipient_id: p.user_id,
                    reservation_id: Some(reservation.id),
                    submitter_id: Some(req.user_id),
                    kind: kinds::RESERVATION_CANCELLED,
                    title: Some("Reservation cancelled".into()),
                    message: format!("Match {} was cancelled by its organizer", reservation.coder),
                    data: None,
                },
            )
            .await?;
            notification_ids.push(id);
        }

        if SlotRepo::has_available_capacity(conn, slot.id, reservation.date).await? {
            SlotRepo::set_available(conn, slot.id, true).await?;
        }

        cancelled
    } else {
        // A participant leaves their seat.
        let leaving = participants
            .iter()
            .find(|p| p.user_id == req.user_id)
            .ok_or_else(|| {
                CoreError::Validation("user is not a participant of this reservation".into())
            })?;

        if leaving.payment_state == PaymentState::Paid.id() {
            refund_from_debit(
                conn,
                leaving.user_id,
                reservation.id,
                &ledger::participant_refund_key(reservation.id, leaving.user_id, leaving.id),
            )
            .await?;
        }

        ParticipantRepo::delete_one(conn, reservation.id, leaving.user_id).await?;
        let remaining = ParticipantRepo::count_for_reservation(conn, reservation.id).await?;

        let reverted = reservation.etat == ReservationState::Valid.id()
            && remaining < SEATS_PER_MATCH;
        let result = if reverted {
            let updated = ReservationRepo::transition_state(
                conn,
                reservation.id,
                ReservationState::Valid.id(),
                ReservationState::Pending.id(),
            )
            .await?;
            SlotRepo::set_available(conn, slot.id, true).await?;
            updated
        } else {
            reservation.clone()
        };

        for p in participants.iter().filter(|p| p.user_id != req.user_id) {
            let (kind, message) = if reverted {
                (
                    kinds::MATCH_STATUS_CHANGED,
                    format!("Match {} is pending again, a player left", reservation.coder),
                )
            } else {
                (
                    kinds::PARTICIPANT_LEFT,
                    format!("A player left match {}", reservation.coder),
                )
            };
            let id = NotificationRepo::create(
                conn,
                &NewNotification {
                    recipient_id: p.user_id,
                    reservation_id: Some(reservation.id),
                    submitter_id: Some(req.user_id),
                    kind,
                    title: None,
                    message,
                    data: None,
                },
            )
            .await?;
            notification_ids.push(id);
        }

        result
    };

    tx.commit().await?;

    tracing::info!(
        reservation_id,
        user_id = req.user_id,
        is_creator,
        etat = cancelled.etat,
        "Reservation cancellation processed"
    );

    state.event_bus.publish(
        BookingEvent::new(if is_creator {
            event_types::RESERVATION_CANCELLED
        } else {
            event_types::PARTICIPANT_LEFT
        })
        .with_reservation(reservation_id)
        .with_actor(req.user_id)
        .with_notifications(notification_ids),
    );

    Ok(cancelled)
}

// ---------------------------------------------------------------------------
// Sibling sweeps
// ---------------------------------------------------------------------------

/// When a sibling group has no capacity left for more valid matches, every
/// pending bid on that time has lost: refund and drop them.
async fn cancel_excess_pending(
    conn: &mut PgConnection,
    slot: &CourtSlot,
    date: CalendarDate,
    notification_ids: &mut Vec<DbId>,
) -> AppResult<()> {
    let group = SlotRepo::lock_sibling_group(conn, slot).await?;
    let group_ids: Vec<DbId> = group.iter().map(|s| s.id).collect();

    let total_capacity: i64 = group.iter().map(|s| i64::from(s.capacity)).sum();
    let mut valid_total = 0;
    for id in &group_ids {
        valid_total += SlotRepo::valid_count_locked(conn, *id, date).await?;
    }
    if valid_total < total_capacity {
        return Ok(());
    }

    let pendings = ReservationRepo::in_state_on_slots_locked(
        conn,
        &group_ids,
        date,
        ReservationState::Pending.id(),
    )
    .await?;

    for pending in pendings {
        tracing::info!(
            reservation_id = pending.id,
            slot_id = pending.slot_id,
            "Cancelling pending bid, sibling group is at capacity"
        );
        cancel_reservation_system(conn, &pending, notification_ids).await?;
    }
    Ok(())
}

/// A newly-valid match displaces competing valid reservations on sibling
/// slots: open matches displace only other open ones, private matches
/// displace anything. Pending bids always survive this sweep.
async fn cancel_valid_siblings(
    conn: &mut PgConnection,
    new_reservation: &Reservation,
    slot: &CourtSlot,
    notification_ids: &mut Vec<DbId>,
) -> AppResult<()> {
    let siblings = SlotRepo::lock_siblings(conn, slot).await?;
    if siblings.is_empty() {
        return Ok(());
    }
    let sibling_ids: Vec<DbId> = siblings.iter().map(|s| s.id).collect();

    let valids = ReservationRepo::in_state_on_slots_locked(
        conn,
        &sibling_ids,
        new_reservation.date,
        ReservationState::Valid.id(),
    )
    .await?;

    let new_is_open = new_reservation.reservation_type == ReservationKind::Open.id();
    for valid in valids {
        if valid.id == new_reservation.id {
            continue;
        }
        if new_is_open && valid.reservation_type != ReservationKind::Open.id() {
            continue;
        }
        tracing::info!(
            reservation_id = valid.id,
            displaced_by = new_reservation.id,
            "Cancelling valid sibling reservation"
        );
        cancel_reservation_system(conn, &valid, notification_ids).await?;
        SlotRepo::set_available(conn, valid.slot_id, true).await?;
    }
    Ok(())
}

/// System-side cancellation of a whole reservation: refund every paid seat
/// from its ledger debit, notify, drop the participants, mark cancelled.
async fn cancel_reservation_system(
    conn: &mut PgConnection,
    reservation: &Reservation,
    notification_ids: &mut Vec<DbId>,
) -> AppResult<()> {
    let participants = ParticipantRepo::lock_for_reservation(conn, reservation.id).await?;

    let refund_key = ledger::system_cancel_refund_key(reservation.id);
    for p in &participants {
        if p.payment_state == PaymentState::Paid.id() {
            refund_from_debit(conn, p.user_id, reservation.id, &refund_key).await?;
        }
        let id = NotificationRepo::create(
            conn,
            &NewNotification {
                recipient_id: p.user_id,
                reservation_id: Some(reservation.id),
                submitter_id: None,
                kind: kinds::RESERVATION_CANCELLED,
                title: Some("Reservation cancelled".into()),
                message: format!(
                    "Match {} was cancelled, the slot went to a confirmed match",
                    reservation.coder
                ),
                data: None,
            },
        )
        .await?;
        notification_ids.push(id);
    }

    ParticipantRepo::delete_for_reservation(conn, reservation.id).await?;
    ReservationRepo::mark_cancelled(conn, reservation.id, reservation.etat).await?;
    Ok(())
}

/// Refund a user exactly the absolute amount of their recorded debit for
/// this reservation. Users who never paid by credit (on-site, infinity
/// tier) have no debit and get nothing.
async fn refund_from_debit(
    conn: &mut PgConnection,
    user_id: DbId,
    reservation_id: DbId,
    refund_key: &str,
) -> Result<(), AppError> {
    let Some(debit) = CreditLedgerRepo::find_debit_for(conn, user_id, reservation_id).await? else {
        tracing::debug!(user_id, reservation_id, "No debit on record, nothing to refund");
        return Ok(());
    };
    let refunded =
        CreditLedgerRepo::refund(conn, user_id, debit.amount.abs(), refund_key).await?;
    if !refunded {
        tracing::debug!(user_id, reservation_id, refund_key, "Refund already issued");
    }
    Ok(())
}

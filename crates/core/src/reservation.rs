//! Reservation and score status enums and their state machines.
//!
//! Each enum variant's discriminant matches the SMALLINT value persisted in
//! the corresponding column (`reservations.etat`, `reservations.score_status`,
//! `participants.payment_state`, ...). The legacy platform stored these as
//! bare integers; the wire contract keeps the numeric values.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Seats per match: two teams of two.
pub const SEATS_PER_MATCH: i64 = 4;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Parse a database status ID back into the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Reservation type.
    ///
    /// `Private` matches are booked whole by the creator; `Open` matches
    /// advertise free seats and become valid once four players are in.
    ReservationKind {
        Private = 1,
        Open = 2,
    }
}

define_status_enum! {
    /// Reservation lifecycle state (`etat` column).
    ///
    /// `CancelledLegacy` (-1) exists only in rows imported from the previous
    /// platform; new cancellations always write `Cancelled` (3).
    ReservationState {
        CancelledLegacy = -1,
        Pending = 0,
        Valid = 1,
        Cancelled = 3,
    }
}

define_status_enum! {
    /// Participant payment state.
    PaymentState {
        Unpaid = 0,
        Paid = 1,
    }
}

define_status_enum! {
    /// How a participant pays their seat.
    PaymentChannel {
        Credit = 1,
        OnSite = 2,
    }
}

define_status_enum! {
    /// Score confirmation state.
    ScoreStatus {
        Pending = 0,
        Confirmed = 1,
        AutoConfirmed = 2,
        Conflict = 3,
    }
}

impl ReservationState {
    /// Whether this state counts as cancelled (covers the legacy value).
    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled | Self::CancelledLegacy)
    }
}

impl ScoreStatus {
    /// Once confirmed (manually or by the finalizer) the score never
    /// transitions again.
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Confirmed | Self::AutoConfirmed)
    }
}

/// Reservation lifecycle state machine.
///
/// Valid reservations may revert to pending when a participant leaves and
/// the seat count drops below four; both live states may be cancelled.
pub mod state_machine {
    use super::{ReservationState, StatusId};

    /// Returns the set of valid target states reachable from `from`.
    ///
    /// Cancelled states are terminal.
    pub fn valid_transitions(from: StatusId) -> &'static [StatusId] {
        match from {
            // Pending -> Valid, Cancelled
            0 => &[1, 3],
            // Valid -> Pending (player left), Cancelled
            1 => &[0, 3],
            // Cancelled (legacy and current): terminal
            -1 | 3 => &[],
            // Unknown state: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: StatusId, to: StatusId) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: StatusId, to: StatusId) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid reservation transition: {} ({from}) -> {} ({to})",
                state_name(from),
                state_name(to)
            ))
        }
    }

    /// Human-readable name for a state ID (for error messages).
    fn state_name(id: StatusId) -> &'static str {
        match ReservationState::from_id(id) {
            Some(ReservationState::Pending) => "Pending",
            Some(ReservationState::Valid) => "Valid",
            Some(ReservationState::Cancelled) => "Cancelled",
            Some(ReservationState::CancelledLegacy) => "CancelledLegacy",
            None => "Unknown",
        }
    }
}

/// Score confirmation state machine.
///
/// A second, matching submission confirms; a mismatching one conflicts; any
/// later submission on a conflicted score starts the comparison over from
/// pending. Confirmed states are locked.
pub mod score_machine {
    use super::{ScoreStatus, StatusId};

    /// Returns the set of valid target statuses reachable from `from`.
    pub fn valid_transitions(from: StatusId) -> &'static [StatusId] {
        match from {
            // Pending -> Pending (new proposal), Confirmed, AutoConfirmed, Conflict
            0 => &[0, 1, 2, 3],
            // Conflict -> Pending (a fresh submission restarts the protocol)
            3 => &[0],
            // Confirmed / AutoConfirmed: locked
            1 | 2 => &[],
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: StatusId, to: StatusId) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a score status transition.
    pub fn validate_transition(from: StatusId, to: StatusId) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid score transition: {} ({from}) -> {} ({to})",
                status_name(from),
                status_name(to)
            ))
        }
    }

    fn status_name(id: StatusId) -> &'static str {
        match ScoreStatus::from_id(id) {
            Some(ScoreStatus::Pending) => "Pending",
            Some(ScoreStatus::Confirmed) => "Confirmed",
            Some(ScoreStatus::AutoConfirmed) => "AutoConfirmed",
            Some(ScoreStatus::Conflict) => "Conflict",
            None => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Status IDs match the persisted values
    // -----------------------------------------------------------------------

    #[test]
    fn reservation_kind_ids() {
        assert_eq!(ReservationKind::Private.id(), 1);
        assert_eq!(ReservationKind::Open.id(), 2);
    }

    #[test]
    fn reservation_state_ids() {
        assert_eq!(ReservationState::Pending.id(), 0);
        assert_eq!(ReservationState::Valid.id(), 1);
        assert_eq!(ReservationState::Cancelled.id(), 3);
        assert_eq!(ReservationState::CancelledLegacy.id(), -1);
    }

    #[test]
    fn payment_ids() {
        assert_eq!(PaymentState::Unpaid.id(), 0);
        assert_eq!(PaymentState::Paid.id(), 1);
        assert_eq!(PaymentChannel::Credit.id(), 1);
        assert_eq!(PaymentChannel::OnSite.id(), 2);
    }

    #[test]
    fn score_status_ids() {
        assert_eq!(ScoreStatus::Pending.id(), 0);
        assert_eq!(ScoreStatus::Confirmed.id(), 1);
        assert_eq!(ScoreStatus::AutoConfirmed.id(), 2);
        assert_eq!(ScoreStatus::Conflict.id(), 3);
    }

    #[test]
    fn from_id_round_trips() {
        assert_eq!(ReservationState::from_id(3), Some(ReservationState::Cancelled));
        assert_eq!(ReservationState::from_id(-1), Some(ReservationState::CancelledLegacy));
        assert_eq!(ReservationState::from_id(7), None);
        assert_eq!(ScoreStatus::from_id(2), Some(ScoreStatus::AutoConfirmed));
    }

    #[test]
    fn cancelled_covers_legacy_value() {
        assert!(ReservationState::Cancelled.is_cancelled());
        assert!(ReservationState::CancelledLegacy.is_cancelled());
        assert!(!ReservationState::Pending.is_cancelled());
        assert!(!ReservationState::Valid.is_cancelled());
    }

    // -----------------------------------------------------------------------
    // Reservation state machine
    // -----------------------------------------------------------------------

    #[test]
    fn pending_to_valid() {
        assert!(state_machine::can_transition(0, 1));
    }

    #[test]
    fn valid_back_to_pending() {
        assert!(state_machine::can_transition(1, 0));
    }

    #[test]
    fn live_states_can_cancel() {
        assert!(state_machine::can_transition(0, 3));
        assert!(state_machine::can_transition(1, 3));
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(state_machine::valid_transitions(3).is_empty());
        assert!(state_machine::valid_transitions(-1).is_empty());
    }

    #[test]
    fn validate_transition_reports_names() {
        let err = state_machine::validate_transition(3, 1).unwrap_err();
        assert!(err.contains("Cancelled"));
        assert!(err.contains("Valid"));
    }

    // -----------------------------------------------------------------------
    // Score state machine
    // -----------------------------------------------------------------------

    #[test]
    fn pending_score_can_confirm_or_conflict() {
        assert!(score_machine::can_transition(0, 1));
        assert!(score_machine::can_transition(0, 2));
        assert!(score_machine::can_transition(0, 3));
        assert!(score_machine::can_transition(0, 0));
    }

    #[test]
    fn conflict_restarts_from_pending() {
        assert!(score_machine::can_transition(3, 0));
        assert!(!score_machine::can_transition(3, 1));
    }

    #[test]
    fn confirmed_scores_are_locked() {
        assert!(score_machine::valid_transitions(1).is_empty());
        assert!(score_machine::valid_transitions(2).is_empty());
        assert!(ScoreStatus::Confirmed.is_locked());
        assert!(ScoreStatus::AutoConfirmed.is_locked());
        assert!(!ScoreStatus::Pending.is_locked());
        assert!(!ScoreStatus::Conflict.is_locked());
    }
}

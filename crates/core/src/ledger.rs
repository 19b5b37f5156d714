//! Ledger idempotency keys.
//!
//! Every credit movement carries a structured `type_key`; together with the
//! user id it forms the unique constraint that makes refunds idempotent.
//! All key construction lives here so the patterns stay in one place.

use crate::types::DbId;

/// Key for the creator's booking debit.
pub fn creator_debit_key(reservation_id: DbId, user_id: DbId) -> String {
    format!("debit:reservation:R{reservation_id}:U{user_id}:creator")
}

/// Key for a joiner's seat debit.
pub fn join_debit_key(reservation_id: DbId, user_id: DbId, team: i16) -> String {
    format!("debit:join:R{reservation_id}:U{user_id}:T{team}")
}

/// SQL LIKE pattern matching any join debit of this user on this reservation.
pub fn join_debit_pattern(reservation_id: DbId, user_id: DbId) -> String {
    format!("debit:join:R{reservation_id}:U{user_id}:%")
}

/// Key for refunding one participant when a reservation is cancelled by a
/// user.
pub fn participant_refund_key(reservation_id: DbId, user_id: DbId, participant_id: DbId) -> String {
    format!("refund:R{reservation_id}:U{user_id}:P{participant_id}")
}

/// Key for refunds issued when the system cancels a whole reservation
/// (losing pending bids, displaced valid siblings). Uniqueness is per
/// `(user, key)`, so one key covers all participants of the reservation.
pub fn system_cancel_refund_key(reservation_id: DbId) -> String {
    format!("refund:cancel:R{reservation_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_debit_key_shape() {
        assert_eq!(
            creator_debit_key(12, 7),
            "debit:reservation:R12:U7:creator"
        );
    }

    #[test]
    fn join_debit_key_shape() {
        assert_eq!(join_debit_key(12, 7, 2), "debit:join:R12:U7:T2");
    }

    #[test]
    fn join_pattern_matches_any_seat() {
        assert_eq!(join_debit_pattern(12, 7), "debit:join:R12:U7:%");
    }

    #[test]
    fn refund_keys_are_distinct_per_participant() {
        let a = participant_refund_key(12, 7, 100);
        let b = participant_refund_key(12, 7, 101);
        assert_ne!(a, b);
        assert_eq!(a, "refund:R12:U7:P100");
    }

    #[test]
    fn system_cancel_key_is_reservation_scoped() {
        assert_eq!(system_cancel_refund_key(12), "refund:cancel:R12");
    }
}

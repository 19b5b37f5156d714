use crate::types::DbId;

/// Domain-level error taxonomy.
///
/// Contention variants (`SlotFull`, `SlotJustTaken`, `SlotContention`) are
/// retryable by the caller; business variants (`TooLateToCancel`,
/// `ScoreLocked`) are not. The HTTP layer maps each variant to a status code
/// and a stable machine-readable code string.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid rating range: {0}")]
    InvalidRange(String),

    /// The requested slot and all of its siblings are at capacity.
    #[error("No capacity left on the requested time slot")]
    SlotFull,

    /// The slot filled up between the initial capacity check and the final
    /// re-check inside the booking transaction.
    #[error("The slot was taken by a concurrent booking")]
    SlotJustTaken,

    /// Lock acquisition failed (deadlock or serialization failure).
    #[error("The slot is being booked concurrently, retry")]
    SlotContention,

    #[error("Insufficient credit balance")]
    InsufficientFunds,

    /// Ledger operations reject non-positive amounts.
    #[error("Ledger amount must be strictly positive")]
    InvalidAmount,

    #[error("Reservations can only be cancelled more than 24 hours before start")]
    TooLateToCancel,

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    /// The score was already confirmed and can no longer change.
    #[error("Score is locked")]
    ScoreLocked,

    /// The submitted sets do not produce a best-of-three winner.
    #[error("Submitted sets do not decide the match")]
    MatchUndecided,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::InvalidRange(_) => "INVALID_RANGE",
            CoreError::SlotFull => "SLOT_FULL",
            CoreError::SlotJustTaken => "SLOT_JUST_TAKEN",
            CoreError::SlotContention => "SLOT_CONTENTION",
            CoreError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            CoreError::InvalidAmount => "INVALID_AMOUNT",
            CoreError::TooLateToCancel => "TOO_LATE_TO_CANCEL",
            CoreError::InvalidScore(_) => "INVALID_SCORE",
            CoreError::ScoreLocked => "SCORE_LOCKED",
            CoreError::MatchUndecided => "MATCH_UNDECIDED",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contention_codes_are_stable() {
        assert_eq!(CoreError::SlotFull.code(), "SLOT_FULL");
        assert_eq!(CoreError::SlotJustTaken.code(), "SLOT_JUST_TAKEN");
        assert_eq!(CoreError::SlotContention.code(), "SLOT_CONTENTION");
    }

    #[test]
    fn business_codes_are_stable() {
        assert_eq!(CoreError::TooLateToCancel.code(), "TOO_LATE_TO_CANCEL");
        assert_eq!(CoreError::ScoreLocked.code(), "SCORE_LOCKED");
        assert_eq!(CoreError::MatchUndecided.code(), "MATCH_UNDECIDED");
        assert_eq!(CoreError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "Reservation",
            id: 42,
        };
        assert_eq!(err.to_string(), "Entity not found: Reservation with id 42");
    }
}

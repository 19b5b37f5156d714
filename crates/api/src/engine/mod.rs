//! Business engines orchestrating the repositories.
//!
//! Each entry point runs one transaction with explicit row locks, writes its
//! outbox rows on the same transaction, and publishes an event after commit.

pub mod booking;
pub mod ratings;
pub mod scores;

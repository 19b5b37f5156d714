//! Courtside domain core.
//!
//! Pure booking/scoring logic with zero internal dependencies so it can be
//! used by the repository layer, the API server, and any future CLI tooling:
//! status enums and their state machines, the rating and reliability
//! engines, set-score validation, pricing, and ledger key construction.

pub mod coder;
pub mod error;
pub mod ledger;
pub mod pricing;
pub mod rating;
pub mod reliability;
pub mod reservation;
pub mod scoring;
pub mod types;

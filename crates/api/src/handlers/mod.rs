//! HTTP handlers, one module per resource.

pub mod credits;
pub mod health;
pub mod notifications;
pub mod reservations;
pub mod scores;
pub mod slots;

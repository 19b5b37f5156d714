//! Delivery-boundary contracts.
//!
//! Push and email transport are external collaborators; only their input
//! contract lives here. The logging implementations stand in wherever no
//! real transport is configured (local development, tests).

pub mod email;
pub mod push;

pub use email::{EmailDispatcher, LogEmailDispatcher, OutgoingMail};
pub use push::{LogPushDispatcher, PushDispatcher};

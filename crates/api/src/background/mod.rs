//! Long-lived background tasks spawned at startup.

pub mod score_finalizer;

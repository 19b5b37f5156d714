//! Booking code generation.
//!
//! Every reservation carries a short human-readable code (`coder`) used at
//! the front desk. Codes are random; the caller retries on the rare unique
//! collision.

use rand::Rng;

/// Length of a booking code.
pub const CODER_LEN: usize = 8;

/// How many times the booking flow retries on a code collision before
/// giving up with a contention error.
pub const MAX_CODER_ATTEMPTS: u32 = 10;

/// Unambiguous uppercase alphabet: no 0/O, 1/I.
const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate one random booking code.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODER_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

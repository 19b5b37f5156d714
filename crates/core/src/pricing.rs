//! Charge computation for reservation creation.
//!
//! The membership ladder applies to the creator's own seat only; when the
//! creator prepays for everyone, the three other seats are charged at the
//! slot's full unit price.

use crate::reservation::{PaymentChannel, ReservationKind};

/// Flat discount for membership tiers 1 through 3.
pub const MEMBER_FLAT_DISCOUNT: f64 = 300.0;

/// Tier granting free reservations, limited to one per calendar date.
pub const TIER_INFINITY: i16 = 4;

/// Number of seats covered beyond the creator's when prepaying for all.
const PREPAID_EXTRA_SEATS: f64 = 3.0;

/// Whether a tier gets the flat discount.
pub fn is_discount_tier(tier: i16) -> bool {
    (1..=3).contains(&tier)
}

/// Effective price of the creator's seat after the membership ladder.
///
/// `infinity_available` reflects the one-free-reservation-per-date limit:
/// when the tier-4 allowance is already used up for the date, the creator
/// falls back to the undiscounted price.
pub fn creator_seat_price(unit_price: f64, tier: i16, infinity_available: bool) -> f64 {
    if tier == TIER_INFINITY {
        if infinity_available {
            0.0
        } else {
            unit_price
        }
    } else if is_discount_tier(tier) {
        (unit_price - MEMBER_FLAT_DISCOUNT).max(0.0)
    } else {
        unit_price
    }
}

/// Total charge debited from the creator at booking time.
pub fn creator_charge(seat_price: f64, unit_price: f64, pay_for_all: bool) -> f64 {
    if pay_for_all {
        seat_price + PREPAID_EXTRA_SEATS * unit_price
    } else {
        seat_price
    }
}

/// Private matches paid on site are recorded without any credit movement.
pub fn should_skip_deduction(kind: ReservationKind, channel: PaymentChannel) -> bool {
    kind == ReservationKind::Private && channel == PaymentChannel::OnSite
}

//! Skill rating engine.
//!
//! Deterministic, closed-form update of a player's rating after a confirmed
//! match. The delta is driven by two lookup tables: the rating-gap weight
//! table and the games-won percentage table, damped by the average
//! reliability of the three other players on court.

use crate::error::CoreError;

/// Lower bound of the rating scale.
pub const RATING_FLOOR: f64 = 0.5;

/// Upper bound of the rating scale.
pub const RATING_CEILING: f64 = 7.0;

/// Weight when the player's team outrates the opposition beyond the table.
const WEIGHT_HEAVY_FAVOURITE: f64 = 0.02;

/// Weight when the player's team is outrated beyond the table.
const WEIGHT_HEAVY_UNDERDOG: f64 = 2.8;

/// Weight when no table row matches (evenly rated teams sit in the middle row,
/// so this only fires for pathological inputs).
const WEIGHT_DEFAULT: f64 = 0.5;

/// Rating-gap weight table: `(min, max, weight)`, inclusive bounds, walked in
/// listed order. The first row whose `[min, max]` contains the gap wins.
/// Adjacent rows intentionally share boundary values; the walk order decides.
const GAP_WEIGHT_TABLE: &[(f64, f64, f64)] = &[
    (0.96, 3.5, 0.02),
    (0.86, 0.95, 0.03),
    (0.76, 0.85, 0.05),
    (0.66, 0.75, 0.08),
    (0.56, 0.65, 0.11),
    (0.46, 0.55, 0.15),
    (0.36, 0.45, 0.20),
    (0.26, 0.35, 0.26),
    (0.16, 0.25, 0.33),
    (0.05, 0.15, 0.41),
    (-0.06, 0.05, 0.50),
    (-0.16, -0.06, 0.60),
    (-0.25, -0.16, 0.70),
    (-0.36, -0.26, 0.85),
    (-0.46, -0.36, 1.00),
    (-0.56, -0.46, 1.20),
    (-0.66, -0.56, 1.40),
    (-0.76, -0.66, 1.70),
    (-0.86, -0.76, 2.00),
    (-0.96, -0.86, 2.40),
    (-3.5, -0.96, 2.80),
];

/// Exact games-won percentage for 0..=19 games. Beyond 19 the percentage
/// decays linearly at 2.63 per game, floored at 0.
const GAMES_PCT_TABLE: [f64; 20] = [
    100.0, 97.37, 94.74, 92.11, 89.47, 86.84, 84.21, 81.58, 78.95, 76.32, 73.68, 71.05, 68.42,
    65.79, 63.16, 60.53, 57.89, 55.26, 52.63, 50.0,
];

/// Decay per game won beyond the tabulated range.
const GAMES_PCT_DECAY: f64 = 2.63;

/// Inputs for a single player's rating update.
///
/// Reliabilities are the `[0, 1]` coefficients of the *other three* players:
/// the teammate and both opponents.
#[derive(Debug, Clone, Copy)]
pub struct RatingInputs {
    pub player_rating: f64,
    pub teammate_rating: f64,
    pub opponent1_rating: f64,
    pub opponent2_rating: f64,
    /// Total games won by the player's team across all sets.
    pub games_won: u32,
    pub teammate_reliability: f64,
    pub opponent1_reliability: f64,
    pub opponent2_reliability: f64,
}

/// Look up the gap weight for a rating difference.
///
/// Gaps beyond the tabulated range clamp to the extreme weights.
pub fn lookup_gap_weight(gap: f64) -> f64 {
    if gap > 3.5 {
        return WEIGHT_HEAVY_FAVOURITE;
    }
    if gap < -3.5 {
        return WEIGHT_HEAVY_UNDERDOG;
    }
    for &(min, max, weight) in GAP_WEIGHT_TABLE {
        if gap >= min && gap <= max {
            return weight;
        }
    }
    WEIGHT_DEFAULT
}

/// Look up the games-won percentage for a total games count.
pub fn lookup_games_pct(games_won: u32) -> f64 {
    match GAMES_PCT_TABLE.get(games_won as usize) {
        Some(&pct) => pct,
        None => (50.0 - f64::from(games_won - 19) * GAMES_PCT_DECAY).max(0.0),
    }
}

/// Compute the player's next rating.
///
/// Fails only when an input is non-finite; otherwise the function is total
/// and the result always lands in `[RATING_FLOOR, RATING_CEILING]`.
pub fn next_rating(inputs: &RatingInputs) -> Result<f64, CoreError> {
    let finite = [
        inputs.player_rating,
        inputs.teammate_rating,
        inputs.opponent1_rating,
        inputs.opponent2_rating,
        inputs.teammate_reliability,
        inputs.opponent1_reliability,
        inputs.opponent2_reliability,
    ];
    if finite.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::Validation(
            "rating inputs must be finite".into(),
        ));
    }

    let gap = ((inputs.player_rating + inputs.teammate_rating)
        - (inputs.opponent1_rating + inputs.opponent2_rating))
        / 2.0;
    let weight = lookup_gap_weight(gap);
    let pct = lookup_games_pct(inputs.games_won);

    // The share of the weight already earned through games won; the residual
    // is what moves the rating.
    let earned = weight * pct / 100.0;
    let residual = weight - earned;

    let avg_reliability = (inputs.teammate_reliability
        + inputs.opponent1_reliability
        + inputs.opponent2_reliability)
        / 3.0;

    let delta = residual * avg_reliability;
    Ok((inputs.player_rating + delta).clamp(RATING_FLOOR, RATING_CEILING))
}

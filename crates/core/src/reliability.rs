//! Reliability engine.
//!
//! Reliability is a `[0, 1]` confidence weight that grows with every
//! confirmed match and damps rating deltas for players with thin histories.
//! The update is additive and bounded; it never decreases.

use crate::error::CoreError;

/// Gain factor applied to every reliability update.
pub const RELIABILITY_GAIN: f64 = 0.1;

/// Floor for the average reliability of the other players, so the inverse
/// square root stays bounded.
const OTHERS_FLOOR: f64 = 0.01;

/// Inputs for a single player's reliability update.
#[derive(Debug, Clone, Copy)]
pub struct ReliabilityInputs {
    /// The player's current reliability in `[0, 1]`.
    pub current: f64,
    /// Sum of the winning team's two ratings.
    pub winner_team_sum: f64,
    /// Sum of the losing team's two ratings.
    pub loser_team_sum: f64,
    /// Reliabilities of the three other players on court.
    pub other_reliabilities: [f64; 3],
}

/// Compute the player's next reliability.
///
/// Fails only on non-finite inputs; the result is clamped to `[0, 1]`.
pub fn next_reliability(inputs: &ReliabilityInputs) -> Result<f64, CoreError> {
    let finite = [
        inputs.current,
        inputs.winner_team_sum,
        inputs.loser_team_sum,
        inputs.other_reliabilities[0],
        inputs.other_reliabilities[1],
        inputs.other_reliabilities[2],
    ];
    if finite.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::Validation(
            "reliability inputs must be finite".into(),
        ));
    }

    let avg_winner = inputs.winner_team_sum / 2.0;
    let avg_loser = inputs.loser_team_sum / 2.0;

    // Expected result for the winning team, on the rating scale's own logistic.
    let expected = 1.0 / (1.0 + 10f64.powf((avg_loser - avg_winner) / 20.0));

    let others_avg = (inputs.other_reliabilities.iter().sum::<f64>() / 3.0).max(OTHERS_FLOOR);

    let delta = RELIABILITY_GAIN * expected / others_avg.sqrt();
    Ok((inputs.current + delta).clamp(0.0, 1.0))
}

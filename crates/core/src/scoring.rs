//! Set-score validation and winner derivation for best-of-three padel
//! matches.
//!
//! A normal set ends 6-x with a two-game margin, or 7-5 / 7-6. The third
//! set may instead be a super tie-break: first to 10+ with a two-point
//! margin. The third set is present exactly when the first two are split.

use crate::error::CoreError;

/// Minimum points to win a super tie-break.
pub const SUPER_TIEBREAK_MIN_POINTS: i16 = 10;

/// Winning margin required in both normal sets and super tie-breaks.
const WIN_MARGIN: i16 = 2;

/// One set's games (or points, for a super tie-break), team A vs team B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetScore {
    pub a: i16,
    pub b: i16,
}

impl SetScore {
    pub fn new(a: i16, b: i16) -> Self {
        Self { a, b }
    }

    /// Which team took the set: 1 for A, 2 for B. Assumes a valid set, where
    /// a tie is impossible.
    fn winner(&self) -> u8 {
        if self.a > self.b {
            1
        } else {
            2
        }
    }
}

/// A full submitted score: two or three sets, with the third optionally a
/// super tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSheet {
    pub sets: Vec<SetScore>,
    /// When `true`, the third set is scored as a super tie-break.
    pub super_tiebreak: bool,
}

/// Validate one normal set.
///
/// Valid iff the winner has exactly 6 games with a margin of two or more,
/// or exactly 7 games against 5 or 6. Anything else (7-4, 8-6, ...) means
/// the set should already have ended and is rejected.
pub fn is_valid_set(a: i16, b: i16) -> bool {
    if a < 0 || b < 0 {
        return false;
    }
    let hi = a.max(b);
    let lo = a.min(b);
    (hi == 6 && hi - lo >= WIN_MARGIN) || (hi == 7 && (lo == 5 || lo == 6))
}

/// Validate a super tie-break: first to 10 or more, margin of two.
pub fn is_valid_super_tiebreak(a: i16, b: i16) -> bool {
    if a < 0 || b < 0 {
        return false;
    }
    let hi = a.max(b);
    let lo = a.min(b);
    hi >= SUPER_TIEBREAK_MIN_POINTS && hi - lo >= WIN_MARGIN
}

/// Validate an entire sheet and derive the winning team (1 = A, 2 = B).
///
/// Errors with `InvalidScore` when any set is malformed or the set count is
/// inconsistent with the split, and with `MatchUndecided` when no team has
/// two set wins.
pub fn derive_winner(sheet: &ScoreSheet) -> Result<u8, CoreError> {
    if sheet.sets.len() < 2 || sheet.sets.len() > 3 {
        return Err(CoreError::InvalidScore(format!(
            "a match has 2 or 3 sets, got {}",
            sheet.sets.len()
        )));
    }
    if sheet.super_tiebreak && sheet.sets.len() != 3 {
        return Err(CoreError::InvalidScore(
            "a super tie-break is only played as the third set".into(),
        ));
    }

    for (idx, set) in sheet.sets.iter().enumerate() {
        let is_super = sheet.super_tiebreak && idx == 2;
        let valid = if is_super {
            is_valid_super_tiebreak(set.a, set.b)
        } else {
            is_valid_set(set.a, set.b)
        };
        if !valid {
            return Err(CoreError::InvalidScore(format!(
                "set {} has impossible score {}-{}",
                idx + 1,
                set.a,
                set.b
            )));
        }
    }

    let split_after_two = sheet.sets[0].winner() != sheet.sets[1].winner();
    if split_after_two && sheet.sets.len() == 2 {
        return Err(CoreError::MatchUndecided);
    }
    if !split_after_two && sheet.sets.len() == 3 {
        return Err(CoreError::InvalidScore(
            "a third set is only played when the first two are split".into(),
        ));
    }

    let a_wins = sheet.sets.iter().filter(|s| s.winner() == 1).count();
    let b_wins = sheet.sets.len() - a_wins;
    if a_wins >= 2 {
        Ok(1)
    } else if b_wins >= 2 {
        Ok(2)
    } else {
        Err(CoreError::MatchUndecided)
    }
}

/// Total games won by each team across the sheet, `(team_a, team_b)`.
///
/// Used by the rating engine as the games-won input; super tie-break points
/// count like games.
pub fn games_totals(sheet: &ScoreSheet) -> (u32, u32) {
    let a = sheet.sets.iter().map(|s| u32::from(s.a.max(0) as u16)).sum();
    let b = sheet.sets.iter().map(|s| u32::from(s.b.max(0) as u16)).sum();
    (a, b)
}

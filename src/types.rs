//! Shared types for the PUNTER engine.
//!
//! Outcomes, the error taxonomy and the crate-wide `Result` alias. Every
//! other module depends on these, so they stay free of table logic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// A match-result category a bet can be placed on.
///
/// Singles are mutually exclusive; a double is the union of two singles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
    #[serde(rename = "1X")]
    HomeOrDraw,
    #[serde(rename = "12")]
    HomeOrAway,
    #[serde(rename = "2X")]
    AwayOrDraw,
}

/// `1`, `X`, `2`.
pub const SINGLE_OUTCOMES: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

/// `1X`, `12`, `2X`.
pub const DOUBLE_OUTCOMES: [Outcome; 3] = [Outcome::HomeOrDraw, Outcome::HomeOrAway, Outcome::AwayOrDraw];

/// Singles followed by doubles.
pub const OUTCOMES: [Outcome; 6] = [
    Outcome::Home,
    Outcome::Draw,
    Outcome::Away,
    Outcome::HomeOrDraw,
    Outcome::HomeOrAway,
    Outcome::AwayOrDraw,
];

/// Code stored in `bet.outcome` for an abstention.
pub const NO_BET: &str = "0";

impl Outcome {
    pub fn code(self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
            Outcome::HomeOrDraw => "1X",
            Outcome::HomeOrAway => "12",
            Outcome::AwayOrDraw => "2X",
        }
    }

    pub fn is_single(self) -> bool {
        matches!(self, Outcome::Home | Outcome::Draw | Outcome::Away)
    }

    /// The singles this outcome is made of (one for a single, two for a double).
    pub fn constituents(self) -> &'static [Outcome] {
        match self {
            Outcome::Home => &[Outcome::Home],
            Outcome::Draw => &[Outcome::Draw],
            Outcome::Away => &[Outcome::Away],
            Outcome::HomeOrDraw => &[Outcome::Home, Outcome::Draw],
            Outcome::HomeOrAway => &[Outcome::Home, Outcome::Away],
            Outcome::AwayOrDraw => &[Outcome::Away, Outcome::Draw],
        }
    }

    /// Whether a bet on `self` wins when the match ended with `single`.
    pub fn covers(self, single: Outcome) -> bool {
        self.constituents().contains(&single)
    }

    /// The single outcome of a completed match.
    ///
    /// Negative points encode disqualification, forfeit or walkover, so such
    /// matches have no outcome at all.
    pub fn from_points(home_points: i64, away_points: i64) -> Option<Outcome> {
        if home_points < 0 || away_points < 0 {
            return None;
        }
        Some(match home_points.cmp(&away_points) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Away,
        })
    }

    /// Parse a `bet.outcome` code; `"0"` is an abstention.
    pub fn parse_optional(code: &str) -> Result<Option<Outcome>> {
        if code == NO_BET {
            return Ok(None);
        }
        code.parse().map(Some)
    }

    /// Index among `SINGLE_OUTCOMES`, `None` for doubles.
    pub fn single_index(self) -> Option<usize> {
        SINGLE_OUTCOMES.iter().position(|o| *o == self)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        OUTCOMES
            .iter()
            .copied()
            .find(|o| o.code() == s.trim())
            .ok_or_else(|| EngineError::Parse(format!("unknown outcome code {s:?}")))
    }
}

/// `bet.outcome` code for an optional outcome.
pub fn optional_code(outcome: Option<Outcome>) -> &'static str {
    outcome.map(Outcome::code).unwrap_or(NO_BET)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for PUNTER.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Table must have the following columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model is not fit: {0}")]
    NotFitted(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EngineError::Schema { missing: columns.into_iter().map(Into::into).collect() }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes_roundtrip() {
        for outcome in OUTCOMES {
            assert_eq!(outcome.code().parse::<Outcome>().unwrap(), outcome);
        }
        assert!("3".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(Outcome::parse_optional("0").unwrap(), None);
        assert_eq!(Outcome::parse_optional("1X").unwrap(), Some(Outcome::HomeOrDraw));
        assert!(Outcome::parse_optional("").is_err());
    }

    #[test]
    fn test_exactly_one_single_per_completed_match() {
        for home in 0..5 {
            for away in 0..5 {
                let outcome = Outcome::from_points(home, away).unwrap();
                let holding = SINGLE_OUTCOMES.iter().filter(|s| **s == outcome).count();
                assert_eq!(holding, 1);
            }
        }
    }

    #[test]
    fn test_doubles_are_union_of_singles() {
        for single in SINGLE_OUTCOMES {
            for double in DOUBLE_OUTCOMES {
                let expected = double.constituents().iter().any(|s| *s == single);
                assert_eq!(double.covers(single), expected);
            }
        }
        assert!(Outcome::HomeOrDraw.covers(Outcome::Draw));
        assert!(!Outcome::HomeOrAway.covers(Outcome::Draw));
    }

    #[test]
    fn test_negative_points_have_no_outcome() {
        assert_eq!(Outcome::from_points(-1, 2), None);
        assert_eq!(Outcome::from_points(0, -3), None);
        assert_eq!(Outcome::from_points(-2, -2), None);
        assert_eq!(Outcome::from_points(1, 1), Some(Outcome::Draw));
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&Outcome::AwayOrDraw).unwrap();
        assert_eq!(json, "\"2X\"");
        let back: Outcome = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(back, Outcome::HomeOrAway);
    }

    #[test]
    fn test_schema_error_names_columns() {
        let err = EngineError::missing_columns(["odds.1", "odds.X"]);
        assert!(err.to_string().contains("odds.1, odds.X"));
    }
}

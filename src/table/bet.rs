//! `bet.*` view: what was bet, and how it paid.

use super::namespace::Bet;
use super::{Group, Table};
use crate::types::{Outcome, Result, OUTCOMES};

impl<'t> Group<'t, Bet> {
    /// Chosen outcome per row; `None` is an abstention.
    pub fn outcomes(&self) -> Result<Vec<Option<Outcome>>> {
        self.texts("outcome")?
            .iter()
            .map(|code| match code {
                Some(code) => Outcome::parse_optional(code),
                None => Ok(None),
            })
            .collect()
    }

    /// Expediency per row, NaN where absent.
    pub fn expediency(&self) -> Vec<f64> {
        self.table().floats_or_nan("bet.expediency")
    }

    /// Whether the bet placed on each row won. Abstentions never win.
    pub fn is_winning(&self) -> Result<Vec<bool>> {
        let realised = self.table().matches()?.outcome()?;
        Ok(self
            .outcomes()?
            .iter()
            .zip(&realised)
            .map(|(bet, real)| match (bet, real) {
                (Some(bet), Some(real)) => bet.covers(*real),
                _ => false,
            })
            .collect())
    }

    /// Number of placed (non-abstained) bets.
    pub fn count(&self) -> Result<usize> {
        Ok(self.outcomes()?.iter().filter(|o| o.is_some()).count())
    }

    pub fn win_rate(&self) -> Result<f64> {
        let count = self.count()?;
        if count == 0 {
            return Ok(f64::NAN);
        }
        let wins = self.is_winning()?.iter().filter(|w| **w).count();
        Ok(wins as f64 / count as f64)
    }

    /// Share of rows carrying a bet.
    pub fn rate(&self) -> Result<f64> {
        if self.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(self.count()? as f64 / self.len() as f64)
    }

    pub fn per_month(&self) -> Result<f64> {
        Ok(self.rate()? * self.table().matches()?.per_month())
    }

    /// ROI per row: `odds - 1` on a win, `-1` on a loss, `0` when
    /// abstaining, NaN when the match has no outcome.
    pub fn roi(&self) -> Result<Vec<f64>> {
        let realised = self.table().matches()?.outcome()?;
        let odds = self.table().odds()?;
        let prices: Vec<Vec<f64>> = OUTCOMES.iter().map(|o| odds.values(*o)).collect();
        let price = |outcome: Outcome, row: usize| {
            OUTCOMES.iter().position(|o| *o == outcome).map_or(f64::NAN, |j| prices[j][row])
        };
        let bets = self.outcomes()?;
        let mut roi = Vec::with_capacity(bets.len());
        for (i, (bet, real)) in bets.iter().zip(&realised).enumerate() {
            roi.push(match (bet, real) {
                (_, None) => f64::NAN,
                (None, Some(_)) => 0.0,
                (Some(bet), Some(real)) if bet.covers(*real) => price(*bet, i) - 1.0,
                (Some(_), Some(_)) => -1.0,
            });
        }
        Ok(roi)
    }

    /// Mean ROI over placed, resolved bets.
    pub fn roi_per_bet(&self) -> Result<f64> {
        let placed: Vec<f64> = self
            .roi()?
            .into_iter()
            .filter(|r| !r.is_nan() && *r != 0.0)
            .collect();
        if placed.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(placed.iter().sum::<f64>() / placed.len() as f64)
    }

    /// Copy without abstentions. Metadata is left as is.
    pub fn drop_abstained(&self) -> Result<Table> {
        let keep: Vec<bool> = self.outcomes()?.iter().map(Option::is_some).collect();
        Ok(self.table().filter(&keep))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::table::fixtures::record;
    use crate::table::{ColumnData, Table};
    use crate::types::Outcome;

    fn with_bets(records: &[crate::table::MatchRecord], codes: &[&str]) -> Table {
        let mut t = Table::from_records(records);
        let codes = codes.iter().map(|c| Some(c.to_string())).collect();
        t.set_namespaced("bet", "outcome", ColumnData::Text(codes)).unwrap();
        t
    }

    #[test]
    fn test_roi_home_win_and_loss() {
        let won = with_bets(&[record("m1", 0, 2, 0)], &["1"]);
        assert_eq!(won.bet().unwrap().roi().unwrap(), vec![1.0]);

        let lost = with_bets(&[record("m1", 0, 0, 2)], &["1"]);
        assert_eq!(lost.bet().unwrap().roi().unwrap(), vec![-1.0]);
    }

    #[test]
    fn test_roi_abstention_and_unresolved() {
        let t = with_bets(&[record("m1", 0, 1, 1), record("m2", 1, -1, 0)], &["0", "X"]);
        let roi = t.bet().unwrap().roi().unwrap();
        assert_eq!(roi[0], 0.0);
        assert!(roi[1].is_nan());
    }

    #[test]
    fn test_roi_on_double_outcome() {
        let t = with_bets(&[record("m1", 0, 1, 1).odds(Outcome::AwayOrDraw, 1.5)], &["2X"]);
        assert!((t.bet().unwrap().roi().unwrap()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rates() {
        let t = with_bets(
            &[record("m1", 0, 1, 0), record("m2", 1, 0, 1), record("m3", 2, 2, 2), record("m4", 3, 3, 0)],
            &["1", "1", "0", "X"],
        );
        let bet = t.bet().unwrap();
        assert_eq!(bet.count().unwrap(), 3);
        assert_eq!(bet.rate().unwrap(), 0.75);
        assert!((bet.win_rate().unwrap() - 1.0 / 3.0).abs() < 1e-12);
        // +1, -1, -1 over three placed bets
        assert!((bet.roi_per_bet().unwrap() + 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(bet.drop_abstained().unwrap().len(), 3);
    }

    #[test]
    fn test_undefined_statistics_are_nan() {
        let t = with_bets(&[record("m1", 0, 1, 0)], &["0"]);
        let bet = t.bet().unwrap();
        assert!(bet.win_rate().unwrap().is_nan());
        assert!(bet.roi_per_bet().unwrap().is_nan());

        let empty = with_bets(&[], &[]);
        assert!(empty.bet().unwrap().rate().unwrap().is_nan());
    }
}

//! `odds.*` view.

use super::namespace::{Namespace, Odds};
use super::{ColumnData, Group, Table};
use crate::types::{Outcome, Result, SINGLE_OUTCOMES};

/// Odds above this are treated as outliers by `drop_extreme`.
pub const EXTREME_ODDS: f64 = 15.0;

impl<'t> Group<'t, Odds> {
    /// Odds of one outcome; all-NaN when the column was never scanned.
    pub fn values(&self, outcome: Outcome) -> Vec<f64> {
        self.table().floats_or_nan(&Odds::full_name(outcome.code()))
    }

    /// Rows with any missing value among the odds columns present.
    pub fn has_missing(&self) -> Result<Vec<bool>> {
        let mut missing = vec![false; self.len()];
        for name in self.prefixed_columns() {
            for (m, v) in missing.iter_mut().zip(self.table().floats(&name)?) {
                *m |= v.is_nan();
            }
        }
        Ok(missing)
    }

    /// Copy without odds-incomplete rows; representativeness is scaled.
    pub fn drop_missing(&self) -> Result<Table> {
        let keep: Vec<bool> = self.has_missing()?.iter().map(|m| !m).collect();
        Ok(self.table().retain(&keep))
    }

    /// Copy with every odds value capped at `upper`.
    pub fn clip(&self, upper: f64) -> Result<Table> {
        let mut copy = self.table().clone();
        for short in self.columns() {
            let clipped = self.floats(&short)?.iter().map(|&v| if v > upper { upper } else { v }).collect();
            copy.set_namespaced(Odds::NAME, &short, ColumnData::Float(clipped))?;
        }
        Ok(copy)
    }

    /// Copy without rows holding any odds above `threshold`.
    pub fn drop_extreme(&self, threshold: f64) -> Result<Table> {
        let mut keep = vec![true; self.len()];
        for name in self.prefixed_columns() {
            for (k, v) in keep.iter_mut().zip(self.table().floats(&name)?) {
                *k &= !(*v > threshold);
            }
        }
        Ok(self.table().filter(&keep))
    }

    /// Outcome with the lowest single odds per row (first on ties).
    pub fn most_probable_outcome(&self) -> Result<Vec<Outcome>> {
        let singles = self.singles()?;
        Ok((0..self.len())
            .map(|i| {
                let mut best = 0;
                for j in 1..3 {
                    if singles[j][i] < singles[best][i] {
                        best = j;
                    }
                }
                SINGLE_OUTCOMES[best]
            })
            .collect())
    }

    /// Bookmaker-implied probabilities: normalised `1 / (odds - 1)`.
    pub fn implied_prediction(&self) -> Result<[Vec<f64>; 3]> {
        let singles = self.singles()?;
        let mut out: [Vec<f64>; 3] = Default::default();
        for i in 0..self.len() {
            let raw: Vec<f64> = singles.iter().map(|col| 1.0 / (col[i] - 1.0)).collect();
            let total: f64 = raw.iter().sum();
            for (j, r) in raw.into_iter().enumerate() {
                out[j].push(r / total);
            }
        }
        Ok(out)
    }

    /// Share of odds-complete, resolved rows where the favourite won.
    pub fn accuracy(&self) -> Result<f64> {
        let complete = self.drop_missing()?;
        let favourite = complete.odds()?.most_probable_outcome()?;
        let realised = complete.matches()?.outcome()?;
        Ok(hit_rate(&favourite, &realised))
    }

    fn singles(&self) -> Result<[&'t [f64]; 3]> {
        Ok([self.floats("1")?, self.floats("X")?, self.floats("2")?])
    }
}

/// Fraction of resolved rows where `picked` matches the realised outcome.
pub(crate) fn hit_rate(picked: &[Outcome], realised: &[Option<Outcome>]) -> f64 {
    let resolved: Vec<_> = picked
        .iter()
        .zip(realised)
        .filter_map(|(p, r)| r.map(|r| *p == r))
        .collect();
    if resolved.is_empty() {
        return f64::NAN;
    }
    resolved.iter().filter(|hit| **hit).count() as f64 / resolved.len() as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

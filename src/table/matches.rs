//! `match.*` view: outcomes, density and point-based row filters.

use super::namespace::Matches;
use super::{Group, Table};
use crate::types::{Outcome, Result, OUTCOMES};

const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

impl<'t> Group<'t, Matches> {
    fn points(&self) -> Result<(&'t [Option<i64>], &'t [Option<i64>])> {
        Ok((self.ints("home_points")?, self.ints("away_points")?))
    }

    /// Realised single outcome per row; `None` without non-negative points.
    pub fn outcome(&self) -> Result<Vec<Option<Outcome>>> {
        let (home, away) = self.points()?;
        Ok(home
            .iter()
            .zip(away)
            .map(|(h, a)| match (h, a) {
                (Some(h), Some(a)) => Outcome::from_points(*h, *a),
                _ => None,
            })
            .collect())
    }

    /// Per-outcome win condition for all six outcomes, in `OUTCOMES` order.
    pub fn outcome_conditions(&self) -> Result<Vec<(Outcome, Vec<bool>)>> {
        let realised = self.outcome()?;
        Ok(OUTCOMES
            .iter()
            .map(|&o| (o, realised.iter().map(|r| r.is_some_and(|r| o.covers(r))).collect()))
            .collect())
    }

    pub fn has_points(&self) -> Result<Vec<bool>> {
        Ok(self.outcome()?.iter().map(Option::is_some).collect())
    }

    /// Matches per day: the stored density, else rows over the played span.
    pub fn per_day(&self) -> f64 {
        let table = self.table();
        if let Some(per_day) = table.meta.match_per_day {
            return per_day;
        }
        if table.len() < 2 {
            return f64::NAN;
        }
        let Ok(times) = table.times("match.played_at") else {
            return f64::NAN;
        };
        let played: Vec<_> = times.iter().flatten().collect();
        let (Some(first), Some(last)) = (played.iter().min(), played.iter().max()) else {
            return f64::NAN;
        };
        let days = (**last - **first).num_seconds() as f64 / 86_400.0;
        if days <= 0.0 {
            return f64::NAN;
        }
        table.len() as f64 / days
    }

    pub fn per_week(&self) -> f64 {
        self.per_day() * 7.0
    }

    pub fn per_month(&self) -> f64 {
        self.per_day() * DAYS_PER_MONTH
    }

    /// Copy without rows lacking an outcome. Metadata is left as is.
    pub fn drop_without_points(&self) -> Result<Table> {
        let keep = self.has_points()?;
        Ok(self.table().filter(&keep))
    }

    /// Copy without drawn matches. Metadata is left as is.
    pub fn drop_draws(&self) -> Result<Table> {
        let keep: Vec<bool> = self
            .outcome()?
            .iter()
            .map(|o| *o != Some(Outcome::Draw))
            .collect();
        Ok(self.table().filter(&keep))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

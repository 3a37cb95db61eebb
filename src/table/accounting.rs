//! `accounting.*` view: returns and growth of a replayed bankroll.
//!
//! `profit` and `balance` only exist after a sequential replay; the
//! aggregate statistics below require them and report NaN / `None` when
//! the population gives them nothing to measure.

use chrono::Duration;

use super::namespace::Accounting;
use super::Group;
use crate::types::Result;

const DAYS_PER_YEAR: f64 = 365.25;

impl<'t> Group<'t, Accounting> {
    /// Total profit over total investment, ignoring unresolved rows.
    pub fn roi(&self) -> Result<f64> {
        let investment = self.floats("investment")?;
        let profit = self.floats("profit")?;
        let (mut invested, mut earned) = (0.0, 0.0);
        for (i, p) in investment.iter().zip(profit) {
            if i.is_nan() || p.is_nan() {
                continue;
            }
            invested += i;
            earned += p;
        }
        if invested == 0.0 {
            return Ok(f64::NAN);
        }
        Ok(earned / invested)
    }

    /// Capital before the first row: its balance plus what it staked.
    fn starting_capital(&self) -> Result<f64> {
        let balance = self.floats("balance")?;
        let investment = self.floats("investment")?;
        Ok(match (balance.first(), investment.first()) {
            (Some(b), Some(i)) => b + i,
            _ => f64::NAN,
        })
    }

    /// Final balance relative to starting capital.
    pub fn roc(&self) -> Result<f64> {
        let capital = self.starting_capital()?;
        let last = self.floats("balance")?.last().copied().unwrap_or(f64::NAN);
        Ok(last / capital - 1.0)
    }

    /// ROC over the first year of rows, NaN when the table does not span one.
    pub fn annual_roc(&self) -> Result<f64> {
        let per_year = (DAYS_PER_YEAR * self.table().matches()?.per_day()).round();
        if per_year.is_nan() || per_year >= self.len() as f64 {
            return Ok(f64::NAN);
        }
        let first_year: Vec<usize> = (0..per_year as usize).collect();
        let head = self.table().select_rows(&first_year);
        head.accounting()?.roc()
    }

    /// Time until capital is multiplied by `n`.
    ///
    /// The stable variant measures up to the row after the last one still
    /// below `n` times capital, so later dips are taken into account.
    pub fn moc(&self, n: f64, stable: bool) -> Result<Option<Duration>> {
        let capital = self.starting_capital()?;
        let target = capital * n;
        let balance = self.floats("balance")?;
        let rows = if stable {
            match balance.iter().rposition(|b| *b < target) {
                Some(last_below) if last_below + 1 < balance.len() => last_below + 1,
                Some(_) => return Ok(None),
                None => 0,
            }
        } else {
            match balance.iter().position(|b| *b >= target) {
                Some(first_above) => first_above,
                None => return Ok(None),
            }
        };
        let per_day = self.table().matches()?.per_day();
        if per_day.is_nan() || per_day <= 0.0 {
            return Ok(None);
        }
        let seconds = rows as f64 / per_day * 86_400.0;
        Ok(Some(Duration::seconds(seconds.round() as i64)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::record;
    use crate::table::{ColumnData, Table};

    fn accounted(investment: &[f64], profit: &[f64], balance: &[f64]) -> Table {
        let records: Vec<_> = (0..investment.len())
            .map(|i| record(&format!("m{i}"), i as i64, 1, 0))
            .collect();
        let mut t = Table::from_records(&records);
        t.meta.match_per_day = Some(1.0);
        for (short, values) in [("investment", investment), ("profit", profit), ("balance", balance)] {
            t.set_namespaced("accounting", short, ColumnData::Float(values.to_vec())).unwrap();
        }
        t
    }

    #[test]
    fn test_roi_and_roc() {
        let t = accounted(&[0.0, 10.0, 10.0], &[0.0, 10.0, -10.0], &[100.0, 110.0, 100.0]);
        let acc = t.accounting().unwrap();
        assert_eq!(acc.roi().unwrap(), 0.0);
        assert_eq!(acc.roc().unwrap(), 0.0);

        let t = accounted(&[10.0, f64::NAN], &[5.0, f64::NAN], &[105.0, 105.0]);
        assert!((t.accounting().unwrap().roi().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roi_without_investment_is_nan() {
        let t = accounted(&[0.0], &[0.0], &[100.0]);
        assert!(t.accounting().unwrap().roi().unwrap().is_nan());
    }

    #[test]
    fn test_annual_roc_needs_a_full_year() {
        let short = accounted(&[10.0; 3], &[1.0; 3], &[101.0, 102.0, 103.0]);
        assert!(short.accounting().unwrap().annual_roc().unwrap().is_nan());

        let n = 400;
        let balance: Vec<f64> = (1..=n).map(|i| 100.0 + i as f64).collect();
        let long = accounted(&vec![1.0; n], &vec![1.0; n], &balance);
        // 365 rows at one per day: capital 101 + 1 staked, balance 465 after the last
        let expected = 465.0 / 102.0 - 1.0;
        assert!((long.accounting().unwrap().annual_roc().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_moc_stable_and_unstable() {
        // capital 100; doubled at row 2, dips, doubled again from row 4
        let t = accounted(
            &[0.0; 6],
            &[0.0; 6],
            &[100.0, 150.0, 200.0, 190.0, 210.0, 220.0],
        );
        let acc = t.accounting().unwrap();
        assert_eq!(acc.moc(2.0, false).unwrap(), Some(Duration::days(2)));
        assert_eq!(acc.moc(2.0, true).unwrap(), Some(Duration::days(4)));
        assert_eq!(acc.moc(5.0, false).unwrap(), None);
        assert_eq!(acc.moc(5.0, true).unwrap(), None);
    }
}

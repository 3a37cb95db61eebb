//! Per-role out-of-sample scoring and the score table it fills.

use crate::engine::accountant::{Accountant, AccountantKind};
use crate::learn::nan_mean;
use crate::predict::{Predictor, PredictorKind};
use crate::strategy::{Better, BetterKind};
use crate::table::{render_grid, Table};
use crate::types::Result;

const SECONDS_PER_MONTH: f64 = 86_400.0 * 365.25 / 12.0;

/// Named metric values of one split.
pub type Scores = Vec<(&'static str, f64)>;

/// A model that can be fitted on a training table and scored on a test
/// table. `fit_score` enriches `test` with the model's output columns.
pub trait Subject: Clone + Send + 'static {
    fn fit_score(&mut self, train: &Table, test: &mut Table) -> Result<Scores>;
}

impl Subject for PredictorKind {
    fn fit_score(&mut self, train: &Table, test: &mut Table) -> Result<Scores> {
        self.fit(train)?;
        self.predict_inplace(test)?;
        Ok(vec![("accuracy", test.prediction()?.accuracy()?)])
    }
}

impl Subject for BetterKind {
    fn fit_score(&mut self, train: &Table, test: &mut Table) -> Result<Scores> {
        self.fit(train)?;
        self.bet_inplace(test)?;
        let bet = test.bet()?;
        let roi = bet.roi_per_bet()?;
        let rate = bet.rate()?;
        Ok(vec![
            ("roi", roi),
            ("roi_per_week", roi * test.matches()?.per_week() * rate),
            ("bet_rate", rate),
            ("win_rate", bet.win_rate()?),
            ("bets_per_month", bet.per_month()?),
        ])
    }
}

impl Subject for AccountantKind {
    fn fit_score(&mut self, train: &Table, test: &mut Table) -> Result<Scores> {
        self.fit(train)?;
        self.invest_serial_inplace(test)?;
        let accounting = test.accounting()?;
        let months = |d: Option<chrono::Duration>| {
            d.map_or(f64::NAN, |d| d.num_seconds() as f64 / SECONDS_PER_MONTH)
        };
        Ok(vec![
            ("annual_roc", accounting.annual_roc()?),
            ("roi", accounting.roi()?),
            ("doc_months", months(accounting.moc(2.0, false)?)),
            ("qoc_months", months(accounting.moc(5.0, false)?)),
        ])
    }
}

// ---------------------------------------------------------------------------
// Score table
// ---------------------------------------------------------------------------

/// Metric rows keyed by 1-based split number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    pub metrics: Vec<String>,
    pub rows: Vec<(usize, Vec<f64>)>,
}

impl ScoreTable {
    pub fn push(&mut self, split: usize, scores: &Scores) {
        if self.metrics.is_empty() {
            self.metrics = scores.iter().map(|(name, _)| name.to_string()).collect();
        }
        let values = self
            .metrics
            .iter()
            .map(|m| scores.iter().find(|(name, _)| name == m).map_or(f64::NAN, |(_, v)| *v))
            .collect();
        self.rows.push((split, values));
        self.rows.sort_by_key(|(split, _)| *split);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one metric in split order.
    pub fn column(&self, metric: &str) -> Option<Vec<f64>> {
        let j = self.metrics.iter().position(|m| m == metric)?;
        Some(self.rows.iter().map(|(_, values)| values[j]).collect())
    }

    /// Mean of a metric over splits, ignoring NaN.
    pub fn mean(&self, metric: &str) -> f64 {
        self.column(metric).map_or(f64::NAN, nan_mean)
    }

    pub fn render(&self) -> String {
        let mut header = vec!["Split".to_string()];
        header.extend(self.metrics.iter().cloned());
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|(split, values)| {
                let mut row = vec![split.to_string()];
                row.extend(values.iter().map(|v| format!("{v:.4}")));
                row
            })
            .collect();
        render_grid(&header, &rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accountant::{Bankroll, ParametricAccountant};
    use crate::predict::OddsPredictor;
    use crate::strategy::DummyBetter;
    use crate::table::fixtures::record;
    use crate::types::Outcome;

    fn matches() -> Table {
        let records: Vec<_> = (0..4).map(|i| record(&format!("m{i}"), i, 1, (i % 2) as i64 * 2)).collect();
        Table::from_records(&records)
    }

    #[test]
    fn test_score_table_orders_and_averages() {
        let mut scores = ScoreTable::default();
        scores.push(2, &vec![("roi", 0.5)]);
        scores.push(1, &vec![("roi", f64::NAN)]);
        scores.push(3, &vec![("roi", 1.5)]);
        assert_eq!(scores.rows[0].0, 1);
        assert_eq!(scores.mean("roi"), 1.0);
        assert!(scores.mean("missing").is_nan());
        assert!(scores.render().starts_with("Split | roi"));
    }

    #[test]
    fn test_predictor_accuracy() {
        let mut test = matches();
        let scores = PredictorKind::Odds(OddsPredictor::default()).fit_score(&matches(), &mut test).unwrap();
        assert_eq!(scores, vec![("accuracy", 0.5)]);
        assert!(test.prediction().is_ok());
    }

    #[test]
    fn test_dummy_better_metrics() {
        let mut test = matches();
        let mut better = BetterKind::Dummy(DummyBetter::new(Outcome::Home));
        let scores = better.fit_score(&matches(), &mut test).unwrap();
        let get = |name: &str| scores.iter().find(|(n, _)| *n == name).unwrap().1;
        assert_eq!(get("roi"), 0.0);
        assert_eq!(get("bet_rate"), 1.0);
        assert_eq!(get("win_rate"), 0.5);
    }

    #[test]
    fn test_accountant_metrics() {
        let mut test = matches();
        test.meta.match_per_day = Some(1.0);
        BetterKind::Dummy(DummyBetter::new(Outcome::Home)).bet_inplace(&mut test).unwrap();
        let mut accountant = AccountantKind::Parametric(ParametricAccountant {
            min_frac: 0.1,
            max_frac: 0.1,
            bankroll: Bankroll::new(100.0),
            ..ParametricAccountant::default()
        });
        let scores = accountant.fit_score(&Table::default(), &mut test).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(scores[0].1.is_nan());
        assert!(scores[2].1.is_nan());
        assert!(test.accounting().is_ok());
    }
}

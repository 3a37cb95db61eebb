//! Cross-validation: fit and score fresh copies of a model over repeated
//! train/test splits.
//!
//! Splits are drawn up front, one seeded RNG per split, so results do not
//! depend on scheduling. Folds then run on a bounded pool of blocking
//! workers; each fold owns its clone of the subject and its tables.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::scoring::{ScoreTable, Scores, Subject};
use super::splitter::Splitter;
use crate::learn::median;
use crate::table::Table;
use crate::types::{EngineError, Result};

/// Scores of every split, plus the test table of the split whose
/// `median_metric` lies closest to the running median.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub scores: ScoreTable,
    pub representative_test: Option<Table>,
}

#[derive(Debug, Clone)]
pub struct CrossValidator {
    pub splitter: Splitter,
    pub n_splits: usize,
    /// Worker count; all available cores when `None`.
    pub n_workers: Option<usize>,
    /// Split `k` draws from `seed + k`.
    pub seed: u64,
    pub median_metric: Option<String>,
}

/// One unit of work: a private subject and its split.
struct Fold<S> {
    subject: S,
    train: Table,
    test: Table,
}

struct FoldOutcome {
    scores: Scores,
    test: Table,
}

impl<S: Subject> Fold<S> {
    fn run(mut self) -> Result<FoldOutcome> {
        let scores = self.subject.fit_score(&self.train, &mut self.test)?;
        Ok(FoldOutcome { scores, test: self.test })
    }
}

/// Running-median bookkeeping over completed splits.
#[derive(Default)]
struct Reducer {
    metric: Option<String>,
    scores: ScoreTable,
    seen: Vec<f64>,
    kept: Option<(f64, Table)>,
}

impl Reducer {
    fn accept(&mut self, split: usize, outcome: FoldOutcome) {
        self.scores.push(split, &outcome.scores);
        let Some(metric) = &self.metric else {
            return;
        };
        let value = outcome
            .scores
            .iter()
            .find(|(name, _)| name == metric)
            .map_or(f64::NAN, |(_, v)| *v);
        self.seen.push(value);
        // A split without the metric is never representative.
        if value.is_nan() {
            return;
        }
        let mid = median(&self.seen);
        let replace = match &self.kept {
            None => true,
            Some((best, _)) => (value - mid).abs() < (best - mid).abs(),
        };
        if replace {
            self.kept = Some((value, outcome.test));
        }
    }

    fn finish(self) -> Evaluation {
        Evaluation { scores: self.scores, representative_test: self.kept.map(|(_, t)| t) }
    }
}

impl CrossValidator {
    pub fn new(splitter: Splitter, n_splits: usize) -> Self {
        Self { splitter, n_splits, n_workers: None, seed: 0, median_metric: None }
    }

    fn workers(&self) -> usize {
        self.n_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }

    /// Fit and score `subject` on `n_splits` splits of `table`.
    ///
    /// The first failing split aborts the evaluation.
    pub async fn evaluate<S: Subject>(&self, subject: &S, table: &Table) -> Result<Evaluation> {
        let mut folds = Vec::with_capacity(self.n_splits);
        for k in 0..self.n_splits {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(k as u64));
            let (train, test) = self.splitter.split(table, &mut rng)?;
            folds.push(Fold { subject: subject.clone(), train, test });
        }

        let total = folds.len();
        let workers = self.workers();
        let mut reducer = Reducer { metric: self.median_metric.clone(), ..Reducer::default() };
        info!(splits = total, workers, "Cross-validation started");

        if workers == 1 {
            for (k, fold) in folds.into_iter().enumerate() {
                let split = k + 1;
                let outcome = fold.run().inspect_err(|e| error!(split, error = %e, "Split failed"))?;
                log_split(split, total, &outcome.scores);
                reducer.accept(split, outcome);
            }
            return Ok(reducer.finish());
        }

        let permits = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        for (k, fold) in folds.into_iter().enumerate() {
            let split = k + 1;
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (split, Err(EngineError::Worker(e.to_string()))),
                };
                let outcome = match tokio::task::spawn_blocking(move || fold.run()).await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(EngineError::Worker(e.to_string())),
                };
                (split, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (split, outcome) = joined.map_err(|e| EngineError::Worker(e.to_string()))?;
            let outcome = outcome.inspect_err(|e| error!(split, error = %e, "Split failed"))?;
            log_split(split, total, &outcome.scores);
            reducer.accept(split, outcome);
        }
        Ok(reducer.finish())
    }
}

fn log_split(split: usize, total: usize, scores: &Scores) {
    let summary = scores
        .iter()
        .map(|(name, v)| format!("{name}={v:.4}"))
        .collect::<Vec<_>>()
        .join(" ");
    info!(split, progress = %format!("{split}/{total}"), scores = %summary, "Split scored");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::splitter::SplitRule;
    use crate::predict::{OddsPredictor, PredictorKind};
    use crate::strategy::{BetterKind, DummyBetter};
    use crate::table::fixtures::record;
    use crate::table::{Column, ColumnData};
    use crate::types::Outcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn history() -> Table {
        let records: Vec<_> = (0..40).map(|i| record(&format!("m{i}"), i, (i % 4) as i64, 1)).collect();
        Table::from_records(&records)
    }

    fn validator(n_workers: usize) -> CrossValidator {
        CrossValidator {
            n_workers: Some(n_workers),
            seed: 11,
            median_metric: Some("accuracy".into()),
            ..CrossValidator::new(Splitter::new(SplitRule::Shuffle { test_frac: 0.25 }), 5)
        }
    }

    #[tokio::test]
    async fn test_sequential_is_deterministic() {
        let subject = PredictorKind::Odds(OddsPredictor::default());
        let a = validator(1).evaluate(&subject, &history()).await.unwrap();
        let b = validator(1).evaluate(&subject, &history()).await.unwrap();
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.scores.len(), 5);
        assert_eq!(a.scores.rows.iter().map(|(s, _)| *s).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        let representative = a.representative_test.unwrap();
        assert_eq!(representative.len(), 10);
        assert!(representative.prediction().is_ok());
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential_scores() {
        let subject = BetterKind::Dummy(DummyBetter::new(Outcome::Home));
        let v = CrossValidator { median_metric: None, ..validator(1) };
        let sequential = v.evaluate(&subject, &history()).await.unwrap();
        let parallel = CrossValidator { n_workers: Some(3), ..v }.evaluate(&subject, &history()).await.unwrap();
        assert_eq!(parallel.scores, sequential.scores);
        assert!(parallel.representative_test.is_none());
    }

    /// Scores each fold with the next scripted value and tags its test rows.
    #[derive(Clone)]
    struct Scripted {
        values: Arc<Vec<f64>>,
        next: Arc<AtomicUsize>,
    }

    impl Subject for Scripted {
        fn fit_score(&mut self, _train: &Table, test: &mut Table) -> Result<Scores> {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            let value = self.values[i];
            test.set_column(Column::new("fold.value", ColumnData::Float(vec![value; test.len()])))?;
            Ok(vec![("value", value)])
        }
    }

    /// Scores a fold by its test rows; the sleep makes folds finish out of order.
    #[derive(Clone)]
    struct ByContent;

    impl Subject for ByContent {
        fn fit_score(&mut self, _train: &Table, test: &mut Table) -> Result<Scores> {
            let sum: usize = test
                .index()
                .iter()
                .filter_map(|k| k.match_id.trim_start_matches('m').parse::<usize>().ok())
                .sum();
            std::thread::sleep(std::time::Duration::from_millis((sum % 13) as u64 * 5));
            Ok(vec![("sum", sum as f64)])
        }
    }

    #[tokio::test]
    async fn test_split_numbers_follow_submission_order() {
        let v = CrossValidator { median_metric: None, n_splits: 6, ..validator(1) };
        let sequential = v.evaluate(&ByContent, &history()).await.unwrap();
        for workers in [2, 6] {
            let parallel = CrossValidator { n_workers: Some(workers), ..v.clone() }
                .evaluate(&ByContent, &history())
                .await
                .unwrap();
            assert_eq!(parallel.scores, sequential.scores);
        }
    }

    #[tokio::test]
    async fn test_nan_metric_never_representative() {
        let subject = Scripted {
            values: Arc::new(vec![f64::NAN, 5.0, 1.0, 3.0]),
            next: Default::default(),
        };
        let v = CrossValidator { median_metric: Some("value".into()), n_splits: 4, ..validator(1) };
        let evaluation = v.evaluate(&subject, &history()).await.unwrap();
        let representative = evaluation.representative_test.unwrap();
        assert!(representative.floats("fold.value").unwrap().iter().all(|v| *v == 3.0));
    }

    #[tokio::test]
    async fn test_all_nan_metric_keeps_no_test() {
        let subject = Scripted { values: Arc::new(vec![f64::NAN; 3]), next: Default::default() };
        let v = CrossValidator { median_metric: Some("value".into()), n_splits: 3, ..validator(1) };
        let evaluation = v.evaluate(&subject, &history()).await.unwrap();
        assert_eq!(evaluation.scores.len(), 3);
        assert!(evaluation.representative_test.is_none());
    }

    #[tokio::test]
    async fn test_failing_split_aborts() {
        let subject = BetterKind::Opc(Default::default());
        let result = validator(2).evaluate(&subject, &history()).await;
        assert!(result.is_err());
    }
}

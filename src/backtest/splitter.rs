//! Train/test splitting of resolved matches.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dropper::{Dropper, DropperKind};
use crate::table::Table;
use crate::types::Result;

/// How resolved rows are partitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitRule {
    /// Train on matches played before midnight of `threshold`.
    Date { threshold: NaiveDate },
    /// Train on rows with missing odds, test on odds-complete rows.
    Odds,
    /// Stratified random sample over bookmaker, sport, league and odds
    /// presence; `test_frac` of each stratum goes to test.
    Shuffle {
        #[serde(default = "default_test_frac")]
        test_frac: f64,
    },
}

fn default_test_frac() -> f64 {
    0.5
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Splitter {
    pub rule: SplitRule,
    /// Training rows are sub-sampled down to this size.
    #[serde(default)]
    pub max_train_size: Option<usize>,
    #[serde(default = "yes")]
    pub train_draws: bool,
    /// Sort both sides by time; otherwise keep split order.
    #[serde(default = "yes")]
    pub sort: bool,
    /// Fitted on the training side, applied to the test side.
    #[serde(default)]
    pub droppers: Vec<DropperKind>,
}

impl Splitter {
    pub fn new(rule: SplitRule) -> Self {
        Self { rule, max_train_size: None, train_draws: true, sort: true, droppers: Vec::new() }
    }

    /// Split `table` into `(train, test)`.
    ///
    /// Rows without an outcome never reach either side. Each side's
    /// representativeness is the input's scaled by its share of the
    /// resolved rows.
    pub fn split<R: Rng + ?Sized>(&self, table: &Table, rng: &mut R) -> Result<(Table, Table)> {
        let resolved = table.matches()?.drop_without_points()?;
        let total = resolved.len();
        if resolved.is_empty() {
            return Ok((resolved.clone(), resolved));
        }

        let (train_rows, test_rows) = self.partition(&resolved, rng)?;
        let mut train = resolved.select_rows(&train_rows);
        let mut test = resolved.select_rows(&test_rows);

        if !self.train_draws {
            train = train.matches()?.drop_draws()?;
        }
        if let Some(max) = self.max_train_size {
            if train.len() > max {
                let mut keep = index::sample(rng, train.len(), max).into_vec();
                keep.sort_unstable();
                train = train.select_rows(&keep);
            }
        }
        for dropper in &self.droppers {
            let mut dropper = dropper.clone();
            dropper.fit(&train)?;
            test = dropper.drop_rows(&test)?;
        }
        if self.sort {
            train = train.sorted_by_played_at()?;
            test = test.sorted_by_played_at()?;
        }

        train.meta = resolved.meta.scaled(train.len(), total);
        test.meta = resolved.meta.scaled(test.len(), total);
        debug!(train = train.len(), test = test.len(), resolved = total, "Table split");
        Ok((train, test))
    }

    fn partition<R: Rng + ?Sized>(&self, table: &Table, rng: &mut R) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut train = Vec::new();
        let mut test = Vec::new();
        match &self.rule {
            SplitRule::Date { threshold } => {
                let cutoff = threshold.and_time(chrono::NaiveTime::MIN);
                for (i, played) in table.times("match.played_at")?.iter().enumerate() {
                    if played.is_some_and(|t| t < cutoff) {
                        train.push(i);
                    } else {
                        test.push(i);
                    }
                }
            }
            SplitRule::Odds => {
                for (i, missing) in table.odds()?.has_missing()?.into_iter().enumerate() {
                    if missing {
                        train.push(i);
                    } else {
                        test.push(i);
                    }
                }
            }
            SplitRule::Shuffle { test_frac } if *test_frac >= 1.0 => {
                train.push(0);
                test = (0..table.len()).collect();
                test.shuffle(rng);
            }
            SplitRule::Shuffle { test_frac } => {
                for mut rows in strata(table)?.into_values() {
                    rows.shuffle(rng);
                    let n_test = (test_frac * rows.len() as f64).round() as usize;
                    let (t, r) = rows.split_at(n_test.min(rows.len()));
                    test.extend_from_slice(t);
                    train.extend_from_slice(r);
                }
            }
        }
        Ok((train, test))
    }
}

/// Row indices grouped by bookmaker, sport, league and odds presence.
fn strata(table: &Table) -> Result<BTreeMap<(String, String, String, bool), Vec<usize>>> {
    let sports = table.texts("match.sport")?;
    let leagues = table.texts("match.league")?;
    let missing = table.odds()?.has_missing()?;
    let mut groups: BTreeMap<_, Vec<usize>> = BTreeMap::new();
    for (i, key) in table.index().iter().enumerate() {
        let stratum = (
            key.bookmaker.clone().unwrap_or_else(|| "N/A".to_string()),
            sports[i].clone().unwrap_or_default(),
            leagues[i].clone().unwrap_or_default(),
            missing[i],
        );
        groups.entry(stratum).or_default().push(i);
    }
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dropper::LeagueDropper;
    use crate::table::fixtures::record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> Table {
        let mut records: Vec<_> = (0..10).map(|i| record(&format!("m{i}"), i, 1, (i % 3) as i64)).collect();
        records.push(record("u1", 3, -1, -1));
        Table::from_records(&records)
    }

    #[test]
    fn test_date_split_is_exhaustive() {
        let t = sample();
        let splitter = Splitter::new(SplitRule::Date { threshold: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap() });
        let (train, test) = splitter.split(&t, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(train.len(), 4);
        assert_eq!(test.len(), 6);
        assert!((train.meta.representativeness - 0.4).abs() < 1e-12);
        assert!((test.meta.representativeness - 0.6).abs() < 1e-12);
        assert!(!train.index().iter().chain(test.index()).any(|k| k.match_id == "u1"));
    }

    #[test]
    fn test_empty_input() {
        let t = Table::from_records(&[record("u1", 0, -1, 0)]);
        let (train, test) = Splitter::new(SplitRule::Odds).split(&t, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(train.is_empty() && test.is_empty());
    }

    #[test]
    fn test_shuffle_is_stratified_and_seeded() {
        let t = sample();
        let splitter = Splitter::new(SplitRule::Shuffle { test_frac: 0.3 });
        let (train, test) = splitter.split(&t, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!((train.len(), test.len()), (7, 3));
        let (_, again) = splitter.split(&t, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(test.index(), again.index());
    }

    #[test]
    fn test_full_test_fraction() {
        let t = sample();
        let splitter = Splitter { sort: false, ..Splitter::new(SplitRule::Shuffle { test_frac: 1.0 }) };
        let (train, test) = splitter.split(&t, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 10);
    }

    #[test]
    fn test_train_post_processing() {
        let t = sample();
        let splitter = Splitter {
            train_draws: false,
            max_train_size: Some(2),
            ..Splitter::new(SplitRule::Date { threshold: NaiveDate::from_ymd_opt(2023, 1, 8).unwrap() })
        };
        let (train, _) = splitter.split(&t, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(train.len(), 2);
        assert!(train.matches().unwrap().outcome().unwrap().iter().all(|o| *o != Some(crate::types::Outcome::Draw)));
    }

    #[test]
    fn test_droppers_fit_on_train() {
        let t = sample();
        let splitter = Splitter {
            droppers: vec![DropperKind::League(LeagueDropper::new([("Football", "Serie A")]))],
            ..Splitter::new(SplitRule::Date { threshold: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap() })
        };
        let (train, test) = splitter.split(&t, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(train.len(), 4);
        assert!(test.is_empty());
        assert_eq!(test.meta.representativeness, 0.0);
    }
}

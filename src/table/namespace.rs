//! Namespace accessor contract.
//!
//! A namespace is a column group sharing a `name.` prefix. `Group` is a
//! validated read view, `GroupMut` a validated write view; both refuse to
//! exist over a table that lacks any of the namespace's required columns.

use std::marker::PhantomData;

use super::{Column, ColumnData, Table};
use crate::types::{EngineError, Result};

/// A column group with a fixed prefix and required short names.
pub trait Namespace {
    const NAME: &'static str;
    const REQUIRED: &'static [&'static str];

    fn prefix() -> String {
        format!("{}.", Self::NAME)
    }

    fn full_name(short: &str) -> String {
        format!("{}.{}", Self::NAME, short)
    }

    /// Fully-qualified required columns absent from `table`.
    fn missing_in(table: &Table) -> Vec<String> {
        Self::REQUIRED
            .iter()
            .map(|short| Self::full_name(short))
            .filter(|full| !table.has_column(full))
            .collect()
    }

    fn present_in(table: &Table) -> bool {
        Self::missing_in(table).is_empty()
    }
}

/// `match.*`: sport, league, season, played_at, countries, teams, points.
pub struct Matches;
/// `odds.*`: decimal odds per outcome.
pub struct Odds;
/// `prediction.*`: single-outcome probabilities.
pub struct Prediction;
/// `bet.*`: chosen outcome and expediency.
pub struct Bet;
/// `accounting.*`: investment, profit, running balance.
pub struct Accounting;

impl Namespace for Matches {
    const NAME: &'static str = "match";
    const REQUIRED: &'static [&'static str] = &[];
}

impl Namespace for Odds {
    const NAME: &'static str = "odds";
    const REQUIRED: &'static [&'static str] = &["1", "X", "2"];
}

impl Namespace for Prediction {
    const NAME: &'static str = "prediction";
    const REQUIRED: &'static [&'static str] = &["1", "X", "2"];
}

impl Namespace for Bet {
    const NAME: &'static str = "bet";
    const REQUIRED: &'static [&'static str] = &["outcome"];
}

impl Namespace for Accounting {
    const NAME: &'static str = "accounting";
    const REQUIRED: &'static [&'static str] = &["investment"];
}

fn check<N: Namespace>(table: &Table) -> Result<()> {
    let missing = N::missing_in(table);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::missing_columns(missing))
    }
}

// ---------------------------------------------------------------------------
// Read view
// ---------------------------------------------------------------------------

pub struct Group<'t, N: Namespace> {
    table: &'t Table,
    _ns: PhantomData<N>,
}

impl<'t, N: Namespace> Group<'t, N> {
    pub fn new(table: &'t Table) -> Result<Self> {
        check::<N>(table)?;
        Ok(Self { table, _ns: PhantomData })
    }

    /// The whole underlying table, for cross-namespace lookups.
    pub fn table(&self) -> &'t Table {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, short: &str) -> Option<&'t Column> {
        self.table.column(&N::full_name(short))
    }

    pub fn contains(&self, short: &str) -> bool {
        self.get(short).is_some()
    }

    pub fn floats(&self, short: &str) -> Result<&'t [f64]> {
        self.table.floats(&N::full_name(short))
    }

    pub fn ints(&self, short: &str) -> Result<&'t [Option<i64>]> {
        self.table.ints(&N::full_name(short))
    }

    pub fn texts(&self, short: &str) -> Result<&'t [Option<String>]> {
        self.table.texts(&N::full_name(short))
    }

    /// Short names of the columns currently under the namespace.
    pub fn columns(&self) -> Vec<String> {
        let prefix = N::prefix();
        self.table
            .column_names()
            .filter_map(|name| name.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Fully-qualified names of the columns currently under the namespace.
    pub fn prefixed_columns(&self) -> Vec<String> {
        let prefix = N::prefix();
        self.table
            .column_names()
            .filter(|name| name.starts_with(&prefix))
            .map(str::to_string)
            .collect()
    }

    /// Sub-table of this namespace with the prefix stripped.
    ///
    /// Index levels owned by the namespace lose the prefix; foreign levels
    /// have their first `.` replaced by `_`.
    pub fn as_table(&self) -> Table {
        let prefix = N::prefix();
        let mut sub = Table::new(self.table.index().to_vec());
        sub.meta = self.table.meta.clone();
        sub.columns = self
            .table
            .columns()
            .iter()
            .filter_map(|c| {
                c.name
                    .strip_prefix(&prefix)
                    .map(|short| Column::new(short, c.data.clone()))
            })
            .collect();
        let names = self.table.index_names().clone().map(|name| match name.strip_prefix(&prefix) {
            Some(short) => short.to_string(),
            None => name.replacen('.', "_", 1),
        });
        sub.set_index_names(names);
        sub
    }
}

// ---------------------------------------------------------------------------
// Write view
// ---------------------------------------------------------------------------

pub struct GroupMut<'t, N: Namespace> {
    table: &'t mut Table,
    _ns: PhantomData<N>,
}

impl<'t, N: Namespace> GroupMut<'t, N> {
    pub fn new(table: &'t mut Table) -> Result<Self> {
        check::<N>(table)?;
        Ok(Self { table, _ns: PhantomData })
    }

    /// Overwrite `short` in place, or insert it after the namespace's last
    /// existing column.
    pub fn set(&mut self, short: &str, data: ColumnData) -> Result<()> {
        self.table.set_namespaced(N::NAME, short, data)
    }

    /// Remove every column of the namespace from the underlying table.
    pub fn remove(self) {
        self.table.drop_namespace::<N>();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::record;

    fn sample() -> Table {
        Table::from_records(&[record("m1", 0, 1, 0), record("m2", 1, 2, 2)])
    }

    #[test]
    fn test_missing_required_columns_named() {
        let t = sample();
        match Group::<Prediction>::new(&t) {
            Err(EngineError::Schema { missing }) => {
                assert_eq!(missing, vec!["prediction.1", "prediction.X", "prediction.2"]);
            }
            _ => panic!("expected schema error"),
        }
    }

    #[test]
    fn test_match_namespace_always_present() {
        let t = Table::default();
        assert!(t.matches().is_ok());
    }

    #[test]
    fn test_columns_and_prefixed_columns() {
        let t = sample();
        let odds = t.odds().unwrap();
        assert_eq!(odds.columns(), vec!["1", "X", "2"]);
        assert_eq!(odds.prefixed_columns()[0], "odds.1");
    }

    #[test]
    fn test_as_table_strips_prefix_and_relabels_index() {
        let t = sample();
        let odds = t.odds().unwrap().as_table();
        assert!(odds.has_column("X"));
        assert_eq!(odds.index_names(), &["match_id".to_string(), "bookmaker".to_string()]);

        let matches = t.matches().unwrap().as_table();
        assert!(matches.has_column("home_points"));
        assert_eq!(matches.index_names()[0], "id");
    }

    #[test]
    fn test_group_mut_set_and_drop() {
        let mut t = sample();
        {
            let mut odds = GroupMut::<Odds>::new(&mut t).unwrap();
            odds.set("1", ColumnData::Float(vec![1.5, 1.5])).unwrap();
            odds.set("extra", ColumnData::Float(vec![0.0, 0.0])).unwrap();
        }
        assert_eq!(t.floats("odds.1").unwrap(), &[1.5, 1.5]);
        assert_eq!(t.position("odds.extra"), Some(t.position("odds.2").unwrap() + 1));

        GroupMut::<Odds>::new(&mut t).unwrap().remove();
        assert!(t.odds().is_err());
        assert!(t.has_column("match.league"));
    }

    #[test]
    fn test_without_namespace_copies() {
        let t = sample();
        let stripped = t.without_namespace::<Odds>();
        assert!(!stripped.has_column("odds.1"));
        assert!(t.has_column("odds.1"));
    }
}

//! In-memory columnar table of match-bookmaker rows.
//!
//! Rows are keyed by `(match.id, bookmaker)`. Columns carry dot-separated
//! namespace prefixes (`match.*`, `odds.*`, `prediction.*`, `bet.*`,
//! `accounting.*`); typed views over each namespace live in the submodules.

pub mod namespace;
pub mod matches;
pub mod odds;
pub mod prediction;
pub mod bet;
pub mod accounting;

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;

use crate::types::{EngineError, Outcome, Result, OUTCOMES};

pub use namespace::{Group, GroupMut, Namespace};

/// Index level holding the match identifier.
pub const MATCH_ID: &str = "match.id";
/// Index level holding the bookmaker (missing when a match has no odds).
pub const BOOKMAKER: &str = "bookmaker";

// ---------------------------------------------------------------------------
// Row keys and columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub match_id: String,
    pub bookmaker: Option<String>,
}

impl RowKey {
    pub fn new(match_id: impl Into<String>, bookmaker: Option<&str>) -> Self {
        Self { match_id: match_id.into(), bookmaker: bookmaker.map(str::to_string) }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bookmaker {
            Some(b) => write!(f, "{}@{}", self.match_id, b),
            None => write!(f, "{}", self.match_id),
        }
    }
}

/// Column values. Missing floats are NaN, other kinds use `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f64>),
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
    Time(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows at `indices`, repeats allowed.
    pub fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Float(v) => ColumnData::Float(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Int(v) => ColumnData::Int(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect()),
            ColumnData::Time(v) => ColumnData::Time(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(v) => v[row].is_nan(),
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
            ColumnData::Time(v) => v[row].is_none(),
        }
    }

    /// Text rendering of one cell; missing cells render empty.
    pub fn render(&self, row: usize) -> String {
        match self {
            ColumnData::Float(v) if v[row].is_nan() => String::new(),
            ColumnData::Float(v) => v[row].to_string(),
            ColumnData::Int(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
            ColumnData::Time(v) => v[row]
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self { name: name.into(), data }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Table-level attributes that belong to no row.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Fraction of the original population this table still represents.
    pub representativeness: f64,
    /// Matches per day, used to annualise rates.
    pub match_per_day: Option<f64>,
    pub version: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self { representativeness: 1.0, match_per_day: None, version: None }
    }
}

impl Metadata {
    /// Scale after keeping `kept` of `total` rows.
    pub fn scaled(&self, kept: usize, total: usize) -> Metadata {
        let ratio = if total == 0 { 0.0 } else { kept as f64 / total as f64 };
        Metadata {
            representativeness: self.representativeness * ratio,
            match_per_day: self.match_per_day.map(|d| d * ratio),
            version: self.version.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw match rows
// ---------------------------------------------------------------------------

/// One raw dataset row as yielded by a row producer (scraper or store).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: String,
    pub bookmaker: Option<String>,
    pub sport: String,
    pub league: String,
    pub season: String,
    pub played_at: NaiveDateTime,
    pub home_country: String,
    pub away_country: String,
    pub home_team: String,
    pub away_team: String,
    pub home_points: i64,
    pub away_points: i64,
    /// Odds in `OUTCOMES` order; `None` when never scanned.
    pub odds: [Option<f64>; 6],
}

impl MatchRecord {
    pub fn new(match_id: impl Into<String>, played_at: NaiveDateTime) -> Self {
        Self {
            match_id: match_id.into(),
            bookmaker: None,
            sport: "Football".to_string(),
            league: String::new(),
            season: String::new(),
            played_at,
            home_country: String::new(),
            away_country: String::new(),
            home_team: String::new(),
            away_team: String::new(),
            home_points: -1,
            away_points: -1,
            odds: [None; 6],
        }
    }

    pub fn league(mut self, sport: &str, league: &str, season: &str) -> Self {
        self.sport = sport.to_string();
        self.league = league.to_string();
        self.season = season.to_string();
        self
    }

    pub fn teams(mut self, home: &str, away: &str) -> Self {
        self.home_team = home.to_string();
        self.away_team = away.to_string();
        self
    }

    pub fn countries(mut self, home: &str, away: &str) -> Self {
        self.home_country = home.to_string();
        self.away_country = away.to_string();
        self
    }

    pub fn points(mut self, home: i64, away: i64) -> Self {
        self.home_points = home;
        self.away_points = away;
        self
    }

    pub fn bookmaker(mut self, bookmaker: &str) -> Self {
        self.bookmaker = Some(bookmaker.to_string());
        self
    }

    pub fn odds(mut self, outcome: Outcome, value: f64) -> Self {
        if let Some(i) = OUTCOMES.iter().position(|o| *o == outcome) {
            self.odds[i] = Some(value);
        }
        self
    }

    /// Set the three single odds at once.
    pub fn single_odds(self, home: f64, draw: f64, away: f64) -> Self {
        self.odds(Outcome::Home, home).odds(Outcome::Draw, draw).odds(Outcome::Away, away)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: Vec<RowKey>,
    index_names: [String; 2],
    columns: Vec<Column>,
    pub meta: Metadata,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Table {
    pub fn new(index: Vec<RowKey>) -> Self {
        Self {
            index,
            index_names: [MATCH_ID.to_string(), BOOKMAKER.to_string()],
            columns: Vec::new(),
            meta: Metadata::default(),
        }
    }

    /// Build a raw match table (`match.*` and `odds.*`) from producer rows.
    pub fn from_records(records: &[MatchRecord]) -> Table {
        let index = records
            .iter()
            .map(|r| RowKey { match_id: r.match_id.clone(), bookmaker: r.bookmaker.clone() })
            .collect();
        let mut table = Table::new(index);
        let text = |f: fn(&MatchRecord) -> &str| text_column(records, f);
        table.columns = vec![
            Column::new("match.sport", text(|r| &r.sport)),
            Column::new("match.league", text(|r| &r.league)),
            Column::new("match.season", text(|r| &r.season)),
            Column::new(
                "match.played_at",
                ColumnData::Time(records.iter().map(|r| Some(r.played_at)).collect()),
            ),
            Column::new("match.home_country", text(|r| &r.home_country)),
            Column::new("match.away_country", text(|r| &r.away_country)),
            Column::new("match.home_team", text(|r| &r.home_team)),
            Column::new("match.away_team", text(|r| &r.away_team)),
            Column::new(
                "match.home_points",
                ColumnData::Int(records.iter().map(|r| Some(r.home_points)).collect()),
            ),
            Column::new(
                "match.away_points",
                ColumnData::Int(records.iter().map(|r| Some(r.away_points)).collect()),
            ),
        ];
        // Singles always get a column; doubles only when some producer scanned them.
        for (i, outcome) in OUTCOMES.iter().enumerate() {
            if !outcome.is_single() && records.iter().all(|r| r.odds[i].is_none()) {
                continue;
            }
            let values = records.iter().map(|r| r.odds[i].unwrap_or(f64::NAN)).collect();
            table.columns.push(Column::new(format!("odds.{outcome}"), ColumnData::Float(values)));
        }
        table
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    pub fn index_names(&self) -> &[String; 2] {
        &self.index_names
    }

    pub fn set_index_names(&mut self, names: [String; 2]) {
        self.index_names = names;
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Insert a column at `at`, shifting later columns right.
    pub fn insert_column(&mut self, at: usize, column: Column) -> Result<()> {
        self.check_length(&column)?;
        if self.has_column(&column.name) {
            return Err(EngineError::Configuration(format!("duplicate column {}", column.name)));
        }
        let at = at.min(self.columns.len());
        self.columns.insert(at, column);
        Ok(())
    }

    /// Overwrite a column in place, or append it.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        self.check_length(&column)?;
        match self.position(&column.name) {
            Some(i) => self.columns[i] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let i = self.position(name)?;
        Some(self.columns.remove(i))
    }

    fn check_length(&self, column: &Column) -> Result<()> {
        if column.data.len() != self.len() {
            return Err(EngineError::Configuration(format!(
                "column {} has {} values, table has {} rows",
                column.name,
                column.data.len(),
                self.len()
            )));
        }
        Ok(())
    }

    fn require(&self, name: &str) -> Result<&ColumnData> {
        self.column(name)
            .map(|c| &c.data)
            .ok_or_else(|| EngineError::missing_columns([name]))
    }

    pub fn floats(&self, name: &str) -> Result<&[f64]> {
        match self.require(name)? {
            ColumnData::Float(v) => Ok(v),
            _ => Err(EngineError::Parse(format!("column {name} is not a float column"))),
        }
    }

    /// Float column, or all-NaN when absent.
    pub fn floats_or_nan(&self, name: &str) -> Vec<f64> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Float(v)) => v.clone(),
            Some(ColumnData::Int(v)) => v.iter().map(|x| x.map(|x| x as f64).unwrap_or(f64::NAN)).collect(),
            _ => vec![f64::NAN; self.len()],
        }
    }

    pub fn ints(&self, name: &str) -> Result<&[Option<i64>]> {
        match self.require(name)? {
            ColumnData::Int(v) => Ok(v),
            _ => Err(EngineError::Parse(format!("column {name} is not an integer column"))),
        }
    }

    pub fn texts(&self, name: &str) -> Result<&[Option<String>]> {
        match self.require(name)? {
            ColumnData::Text(v) => Ok(v),
            _ => Err(EngineError::Parse(format!("column {name} is not a text column"))),
        }
    }

    pub fn times(&self, name: &str) -> Result<&[Option<NaiveDateTime>]> {
        match self.require(name)? {
            ColumnData::Time(v) => Ok(v),
            _ => Err(EngineError::Parse(format!("column {name} is not a timestamp column"))),
        }
    }

    // -- Row operations ------------------------------------------------------

    /// Rows at `indices` (repeats allowed); metadata is copied unchanged.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            index: indices.iter().map(|&i| self.index[i].clone()).collect(),
            index_names: self.index_names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
                .collect(),
            meta: self.meta.clone(),
        }
    }

    /// Rows where `mask` holds; metadata is copied unchanged.
    pub fn filter(&self, mask: &[bool]) -> Table {
        let indices: Vec<usize> = mask_indices(mask);
        self.select_rows(&indices)
    }

    /// Rows where `mask` holds, with representativeness and match density
    /// scaled by the kept fraction.
    pub fn retain(&self, mask: &[bool]) -> Table {
        let mut kept = self.filter(mask);
        kept.meta = self.meta.scaled(kept.len(), self.len());
        kept
    }

    /// Stable sort by `match.played_at`; rows without a time go last.
    pub fn sorted_by_played_at(&self) -> Result<Table> {
        let times = self.times("match.played_at")?;
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| (times[i].is_none(), times[i]));
        Ok(self.select_rows(&order))
    }

    /// Distinct match identifiers.
    pub fn match_count(&self) -> usize {
        self.index.iter().map(|k| k.match_id.as_str()).collect::<HashSet<_>>().len()
    }

    // -- Namespaces ----------------------------------------------------------

    /// Write `short` under namespace `ns`: overwrite in place, or insert right
    /// after the namespace's last existing column.
    pub fn set_namespaced(&mut self, ns: &str, short: &str, data: ColumnData) -> Result<()> {
        let name = format!("{ns}.{short}");
        let column = Column::new(name.clone(), data);
        if self.has_column(&name) {
            return self.set_column(column);
        }
        let prefix = format!("{ns}.");
        let at = self
            .columns
            .iter()
            .rposition(|c| c.name.starts_with(&prefix))
            .map(|i| i + 1)
            .unwrap_or(self.columns.len());
        self.insert_column(at, column)
    }

    /// Write every column of `sub` (short names) under namespace `N`.
    pub fn assign<N: Namespace>(&mut self, sub: Table) -> Result<()> {
        if sub.len() != self.len() {
            return Err(EngineError::Configuration(format!(
                "cannot assign {} rows of {} to a table of {} rows",
                sub.len(),
                N::NAME,
                self.len()
            )));
        }
        for column in sub.columns {
            self.set_namespaced(N::NAME, &column.name, column.data)?;
        }
        Ok(())
    }

    /// Remove every column under namespace `N`.
    pub fn drop_namespace<N: Namespace>(&mut self) {
        let prefix = N::prefix();
        self.columns.retain(|c| !c.name.starts_with(&prefix));
    }

    /// Copy without the columns of namespace `N`.
    pub fn without_namespace<N: Namespace>(&self) -> Table {
        let mut copy = self.clone();
        copy.drop_namespace::<N>();
        copy
    }

    pub fn matches(&self) -> Result<Group<'_, namespace::Matches>> {
        Group::new(self)
    }

    pub fn odds(&self) -> Result<Group<'_, namespace::Odds>> {
        Group::new(self)
    }

    pub fn prediction(&self) -> Result<Group<'_, namespace::Prediction>> {
        Group::new(self)
    }

    pub fn bet(&self) -> Result<Group<'_, namespace::Bet>> {
        Group::new(self)
    }

    pub fn accounting(&self) -> Result<Group<'_, namespace::Accounting>> {
        Group::new(self)
    }

    /// Render as a plain aligned text table (index first).
    pub fn render(&self) -> String {
        let mut header: Vec<String> = self.index_names.to_vec();
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let key = &self.index[i];
            let mut row = vec![key.match_id.clone(), key.bookmaker.clone().unwrap_or_default()];
            row.extend(self.columns.iter().map(|c| c.data.render(i)));
            rows.push(row);
        }
        render_grid(&header, &rows)
    }
}

fn text_column(records: &[MatchRecord], f: fn(&MatchRecord) -> &str) -> ColumnData {
    ColumnData::Text(records.iter().map(|r| Some(f(r).to_string())).collect())
}

pub(crate) fn mask_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter().enumerate().filter(|(_, keep)| **keep).map(|(i, _)| i).collect()
}

/// Left-aligned text grid with a header rule.
pub(crate) fn render_grid(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };
    let mut out = vec![line(header)];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-|-"));
    out.extend(rows.iter().map(|r| line(r)));
    out.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{Duration, NaiveDate};

    pub fn day(n: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(18, 0, 0))
            .map(|t| t + Duration::days(n))
            .unwrap()
    }

    /// A completed match with full single odds.
    pub fn record(id: &str, n: i64, home: i64, away: i64) -> MatchRecord {
        MatchRecord::new(id, day(n))
            .league("Football", "Premier", "2023")
            .teams(&format!("H{id}"), &format!("A{id}"))
            .countries("GB", "GB")
            .points(home, away)
            .bookmaker("Fonbet")
            .single_odds(2.0, 3.0, 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn sample() -> Table {
        Table::from_records(&[
            record("m1", 2, 1, 0),
            record("m2", 0, 0, 0),
            record("m3", 1, 0, 2),
            record("m4", 3, -1, 0),
        ])
    }

    #[test]
    fn test_from_records_layout() {
        let t = sample();
        assert_eq!(t.len(), 4);
        assert_eq!(t.column_names().next(), Some("match.sport"));
        assert!(t.has_column("odds.2"));
        assert!(!t.has_column("odds.2X"));

        let with_double = Table::from_records(&[
            record("m1", 0, 1, 0).odds(Outcome::AwayOrDraw, 1.8),
            record("m2", 1, 1, 0),
        ]);
        assert!(with_double.floats("odds.2X").unwrap()[1].is_nan());
        assert_eq!(t.index()[0], RowKey::new("m1", Some("Fonbet")));
    }

    #[test]
    fn test_retain_scales_metadata() {
        let mut t = sample();
        t.meta.representativeness = 0.8;
        t.meta.match_per_day = Some(2.0);
        let kept = t.retain(&[true, false, true, false]);
        assert_eq!(kept.len(), 2);
        assert!((kept.meta.representativeness - 0.4).abs() < 1e-12);
        assert_eq!(kept.meta.match_per_day, Some(1.0));
    }

    #[test]
    fn test_filter_keeps_metadata() {
        let mut t = sample();
        t.meta.representativeness = 0.5;
        let kept = t.filter(&[true, false, false, false]);
        assert_eq!(kept.meta.representativeness, 0.5);
    }

    #[test]
    fn test_sort_by_played_at() {
        let sorted = sample().sorted_by_played_at().unwrap();
        let ids: Vec<_> = sorted.index().iter().map(|k| k.match_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3", "m1", "m4"]);
    }

    #[test]
    fn test_set_namespaced_preserves_locality() {
        let mut t = sample();
        t.set_namespaced("match", "extra", ColumnData::Float(vec![0.0; 4])).unwrap();
        let pos_extra = t.position("match.extra").unwrap();
        let pos_points = t.position("match.away_points").unwrap();
        assert_eq!(pos_extra, pos_points + 1);

        t.set_namespaced("bet", "outcome", ColumnData::Text(vec![None; 4])).unwrap();
        assert_eq!(t.position("bet.outcome"), Some(t.columns().len() - 1));
    }

    #[test]
    fn test_set_namespaced_overwrites() {
        let mut t = sample();
        t.set_namespaced("odds", "1", ColumnData::Float(vec![9.0; 4])).unwrap();
        assert_eq!(t.floats("odds.1").unwrap(), &[9.0; 4]);
        assert_eq!(t.columns().iter().filter(|c| c.name == "odds.1").count(), 1);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut t = sample();
        let err = t.set_column(Column::new("x", ColumnData::Float(vec![1.0])));
        assert!(matches!(err, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let t = sample();
        assert!(matches!(t.floats("prediction.1"), Err(EngineError::Schema { .. })));
    }

    #[test]
    fn test_render_contains_header() {
        let text = sample().render();
        assert!(text.starts_with("match.id"));
        assert!(text.contains("m3"));
    }
}

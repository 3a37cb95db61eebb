//! Dataset files: a `# key: value` header block, a blank line, then a CSV
//! body keyed by `match.id` and `bookmaker`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{content_id, resolve_file};
use crate::table::namespace::{Accounting, Bet, Namespace, Prediction};
use crate::table::{Column, ColumnData, Metadata, RowKey, Table, BOOKMAKER, MATCH_ID};
use crate::types::{EngineError, Result};

const TITLE: &str = "# PUNTER DATASET";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MATCH_COLUMNS: [&str; 5] = [
    "match.played_at",
    "match.home_team",
    "match.away_team",
    "match.home_points",
    "match.away_points",
];

/// Stage a dataset has reached. Each kind requires the columns of all
/// earlier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Match,
    PredictedMatch,
    BetMatch,
    AccountedMatch,
}

impl DatasetKind {
    pub fn subdir(self) -> &'static str {
        match self {
            DatasetKind::Match => "match",
            DatasetKind::PredictedMatch => "predicted_match",
            DatasetKind::BetMatch => "bet_match",
            DatasetKind::AccountedMatch => "accounted_match",
        }
    }

    /// Columns a table of this kind must carry.
    pub fn required_columns(self) -> Vec<String> {
        let mut columns: Vec<String> = MATCH_COLUMNS.iter().map(|c| c.to_string()).collect();
        if self >= DatasetKind::PredictedMatch {
            columns.extend(Prediction::REQUIRED.iter().map(|s| Prediction::full_name(s)));
        }
        if self >= DatasetKind::BetMatch {
            columns.extend(Bet::REQUIRED.iter().map(|s| Bet::full_name(s)));
        }
        if self >= DatasetKind::AccountedMatch {
            columns.extend(Accounting::REQUIRED.iter().map(|s| Accounting::full_name(s)));
        }
        columns
    }

    pub fn check(self, table: &Table) -> Result<()> {
        let missing: Vec<String> = self
            .required_columns()
            .into_iter()
            .filter(|c| !table.has_column(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::missing_columns(missing))
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdir())
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

fn csv_body(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header: Vec<&str> = vec![MATCH_ID, BOOKMAKER];
    header.extend(table.column_names());
    writer.write_record(&header)?;
    for (i, key) in table.index().iter().enumerate() {
        let mut record = vec![key.match_id.clone(), key.bookmaker.clone().unwrap_or_default()];
        record.extend(table.columns().iter().map(|c| c.data.render(i)));
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|e| EngineError::Persistence(format!("cannot flush dataset body: {e}")))
}

/// Write `table` into `dir`, named `name` or after the hash of its body.
pub fn write_dataset(table: &Table, dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let body = csv_body(table)?;
    let name = match name {
        Some(name) => name.to_string(),
        None => content_id(&body).to_string(),
    };
    let version = table
        .meta
        .version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let per_day = table.matches()?.per_day();
    let per_day = if per_day.is_finite() { round4(per_day).to_string() } else { String::new() };
    let header = format!(
        "{TITLE}\n# version: {version}\n# created_at: {}\n# representativeness: {}\n# match.per_day: {per_day}\n\n",
        Utc::now().format(TIME_FORMAT),
        round4(table.meta.representativeness),
    );

    fs::create_dir_all(dir)?;
    let path = super::named_file(dir, &name, "csv");
    let mut content = header.into_bytes();
    content.extend_from_slice(&body);
    fs::write(&path, content)?;

    info!(path = %path.display(), rows = table.len(), "Dataset written");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Split the header block off `content`, returning metadata and body.
fn parse_header(content: &str) -> Result<(Metadata, &str)> {
    let mut meta = Metadata::default();
    if !content.starts_with('#') {
        return Ok((meta, content));
    }
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        offset += line.len();
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some(entry) = line.strip_prefix('#') else {
            return Err(EngineError::Parse(format!("unterminated dataset header at `{line}`")));
        };
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "version" => meta.version = Some(value.to_string()),
            "created_at" => {}
            "representativeness" => meta.representativeness = parse_float(key, value)?,
            "match.per_day" => {
                meta.match_per_day = Some(parse_float(key, value)?).filter(|d| !d.is_nan());
            }
            _ => warn!(key, "Unknown dataset header key"),
        }
    }
    Ok((meta, &content[offset..]))
}

fn parse_float(column: &str, value: &str) -> Result<f64> {
    if value.is_empty() {
        return Ok(f64::NAN);
    }
    value
        .parse()
        .map_err(|_| EngineError::Parse(format!("{column}: `{value}` is not a number")))
}

fn parse_int(column: &str, value: &str) -> Result<Option<i64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| EngineError::Parse(format!("{column}: `{value}` is not an integer")))
}

fn parse_time(column: &str, value: &str) -> Result<Option<NaiveDateTime>> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .map(Some)
        .map_err(|_| EngineError::Parse(format!("{column}: `{value}` is not a timestamp")))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Column kind implied by a column name.
fn column_kind(name: &str) -> ColumnData {
    if name == "match.played_at" {
        ColumnData::Time(Vec::new())
    } else if name.ends_with("_points") {
        ColumnData::Int(Vec::new())
    } else if name.starts_with("match.") || name == "bet.outcome" {
        ColumnData::Text(Vec::new())
    } else {
        ColumnData::Float(Vec::new())
    }
}

fn parse_body(body: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();
    if headers.get(0) != Some(MATCH_ID) || headers.get(1) != Some(BOOKMAKER) {
        return Err(EngineError::Parse(format!(
            "dataset body must start with `{MATCH_ID},{BOOKMAKER}`"
        )));
    }
    let names: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();
    let mut data: Vec<ColumnData> = names.iter().map(|n| column_kind(n)).collect();
    let mut index = Vec::new();

    for record in reader.records() {
        let record = record?;
        let match_id = record.get(0).unwrap_or_default();
        index.push(RowKey::new(match_id, record.get(1).filter(|b| !b.is_empty())));
        for ((name, column), value) in names.iter().zip(data.iter_mut()).zip(record.iter().skip(2)) {
            match column {
                ColumnData::Float(v) => v.push(parse_float(name, value)?),
                ColumnData::Int(v) => v.push(parse_int(name, value)?),
                ColumnData::Text(v) => v.push(non_empty(value)),
                ColumnData::Time(v) => v.push(parse_time(name, value)?),
            }
        }
    }

    let mut table = Table::new(index);
    for (name, column) in names.into_iter().zip(data) {
        table.set_column(Column::new(name, column))?;
    }
    Ok(table)
}

/// Read the named dataset from `dir`, or the newest one there, and check it
/// carries the columns of `kind`.
pub fn read_dataset(kind: DatasetKind, dir: &Path, name: Option<&str>) -> Result<Table> {
    let path = resolve_file(dir, name, "csv")?;
    let content = fs::read_to_string(&path)?;
    let (meta, body) = parse_header(&content)?;
    let mut table = parse_body(body)?;
    table.meta = meta;
    kind.check(&table)?;
    info!(path = %path.display(), kind = %kind, rows = table.len(), "Dataset read");
    Ok(table)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn played_range(table: &Table) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let times = table.times("match.played_at").ok()?;
    let first = times.iter().flatten().min()?;
    let last = times.iter().flatten().max()?;
    Some((*first, *last))
}

/// One-line description: row count and played date range.
pub fn describe(table: &Table) -> String {
    match played_range(table) {
        Some((first, last)) => format!(
            "{} matches from {} to {}",
            table.len(),
            first.format(TIME_FORMAT),
            last.format(TIME_FORMAT)
        ),
        None => format!("{} matches", table.len()),
    }
}

pub fn summarize(table: &Table) -> BTreeMap<&'static str, String> {
    let mut summary = BTreeMap::new();
    summary.insert("rows", table.len().to_string());
    summary.insert("matches", table.match_count().to_string());
    if let Some((first, last)) = played_range(table) {
        summary.insert("first_played_at", first.format(TIME_FORMAT).to_string());
        summary.insert("last_played_at", last.format(TIME_FORMAT).to_string());
    }
    summary.insert("representativeness", format!("{:.4}", table.meta.representativeness));
    if let Some(per_day) = table.meta.match_per_day {
        summary.insert("match.per_day", format!("{per_day:.4}"));
    }
    if let Some(version) = &table.meta.version {
        summary.insert("version", version.clone());
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

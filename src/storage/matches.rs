//! Fuzzy lookup of a stored match from scraped names.
//!
//! Scrapers see team names spelled the way each bookmaker spells them, so a
//! match is located by sport, league and kick-off window first, then by
//! team-name similarity.

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::table::{RowKey, Table};
use crate::types::Result;

/// Default minimum combined team-name similarity.
pub const MIN_SIMILARITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    pub sport: String,
    pub league: String,
    pub played_at: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    pub home_country: Option<String>,
    pub away_country: Option<String>,
    /// Largest accepted distance between stored and queried kick-off.
    pub tolerance: Duration,
}

impl MatchQuery {
    pub fn new(sport: &str, league: &str, played_at: NaiveDateTime, home_team: &str, away_team: &str) -> Self {
        Self {
            sport: sport.to_string(),
            league: league.to_string(),
            played_at,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_country: None,
            away_country: None,
            tolerance: Duration::days(1),
        }
    }

    pub fn countries(mut self, home: &str, away: &str) -> Self {
        self.home_country = Some(home.to_string());
        self.away_country = Some(away.to_string());
        self
    }

    pub fn tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub key: RowKey,
    pub row: usize,
    /// `sqrt(r_home^2 + r_away^2)`, in `[0, sqrt(2)]`.
    pub similarity: f64,
}

/// Read access to stored matches.
pub trait MatchStore {
    fn find(&self, query: &MatchQuery) -> Result<Option<MatchHit>>;

    fn find_match(
        &self,
        sport: &str,
        league: &str,
        played_at: NaiveDateTime,
        home_team: &str,
        away_team: &str,
        tolerance: Duration,
    ) -> Result<Option<MatchHit>> {
        let query = MatchQuery::new(sport, league, played_at, home_team, away_team).tolerance(tolerance);
        self.find(&query)
    }
}

/// A match store over an in-memory match table.
#[derive(Debug, Clone)]
pub struct TableMatchStore {
    table: Table,
    pub min_similarity: f64,
}

impl TableMatchStore {
    pub fn new(table: Table) -> Self {
        Self { table, min_similarity: MIN_SIMILARITY }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl MatchStore for TableMatchStore {
    fn find(&self, query: &MatchQuery) -> Result<Option<MatchHit>> {
        let t = &self.table;
        let sports = t.texts("match.sport")?;
        let leagues = t.texts("match.league")?;
        let played = t.times("match.played_at")?;
        let home_teams = t.texts("match.home_team")?;
        let away_teams = t.texts("match.away_team")?;
        let home_countries = t.texts("match.home_country")?;
        let away_countries = t.texts("match.away_country")?;

        let same = |value: &Option<String>, wanted: &str| value.as_deref() == Some(wanted);
        let mut best: Option<MatchHit> = None;
        let mut candidates = 0;
        for row in 0..t.len() {
            let in_window = played[row].is_some_and(|p| (p - query.played_at).abs() <= query.tolerance);
            if !(same(&sports[row], &query.sport) && same(&leagues[row], &query.league) && in_window) {
                continue;
            }
            if query.home_country.as_deref().is_some_and(|c| !same(&home_countries[row], c))
                || query.away_country.as_deref().is_some_and(|c| !same(&away_countries[row], c))
            {
                continue;
            }
            candidates += 1;
            let home = similarity_ratio(home_teams[row].as_deref().unwrap_or_default(), &query.home_team);
            let away = similarity_ratio(away_teams[row].as_deref().unwrap_or_default(), &query.away_team);
            let similarity = home.hypot(away);
            if similarity < self.min_similarity {
                continue;
            }
            if best.as_ref().map_or(true, |b| similarity > b.similarity) {
                best = Some(MatchHit { key: t.index()[row].clone(), row, similarity });
            }
        }
        debug!(
            home = %query.home_team,
            away = %query.away_team,
            candidates,
            found = best.is_some(),
            "Match lookup"
        );
        Ok(best)
    }
}

// ---------------------------------------------------------------------------
// Ratcliff/Obershelp
// ---------------------------------------------------------------------------

/// Gestalt pattern-matching ratio `2M / T`, where `M` counts characters in
/// recursively found longest common blocks. Two empty strings give 1.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_block(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + k..], &b[j + k..])
}

/// Earliest longest common block as `(start_a, start_b, len)`.
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let k = prev[j] + 1;
                current[j + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        prev = current;
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

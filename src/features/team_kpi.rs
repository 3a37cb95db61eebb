//! Per-team performance indicators.
//!
//! Fit unpivots every resolved match into a home-venue and an away-venue
//! team row, then computes age-weighted KPIs per `(country, team)`. Ages are
//! measured from the newest fitted match so a refit on the same data gives
//! the same numbers. A row's features are home KPI minus away KPI.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Features, Matrix};
use crate::learn::nan_mean;
use crate::table::Table;
use crate::types::{EngineError, Result};

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;
/// Matches needed within the last year to estimate a points trend.
const MIN_TREND_MATCHES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamKpi {
    WinRate,
    DrawRate,
    LossRate,
    ShutoutWinRate,
    ShutoutLossRate,
    HomeWinRate,
    AwayWinRate,
    MeanPointsRatio,
    MeanPoints,
    MeanOpponentPoints,
    MeanPointsDiff,
    MeanDrawPoints,
    PointsDiffGrowth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TeamStats {
    country: String,
    team: String,
    values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamKpiFeatures {
    pub kpi: Vec<TeamKpi>,
    /// Yearly decay of a match's weight: weight = (1 - age_factor)^age_years.
    #[serde(default)]
    pub age_factor: f64,
    #[serde(default)]
    teams: Option<Vec<TeamStats>>,
}

impl TeamKpiFeatures {
    pub fn new(kpi: impl IntoIterator<Item = TeamKpi>, age_factor: f64) -> Self {
        let mut kpi: Vec<TeamKpi> = kpi.into_iter().collect();
        kpi.sort();
        kpi.dedup();
        Self { kpi, age_factor, teams: None }
    }
}

/// One team's view of one match.
struct TeamMatch {
    played_at: NaiveDateTime,
    points: f64,
    opponent_points: f64,
    home: bool,
}

type TeamKey = (String, String);

fn unpivot(table: &Table) -> Result<BTreeMap<TeamKey, Vec<TeamMatch>>> {
    let m = table.matches()?;
    let outcome = m.outcome()?;
    let played_at = table.times("match.played_at")?;
    let home_country = m.texts("home_country")?;
    let away_country = m.texts("away_country")?;
    let home_team = m.texts("home_team")?;
    let away_team = m.texts("away_team")?;
    let home_points = m.ints("home_points")?;
    let away_points = m.ints("away_points")?;

    let mut teams: BTreeMap<TeamKey, Vec<TeamMatch>> = BTreeMap::new();
    for i in 0..table.len() {
        let (Some(_), Some(at), Some(hp), Some(ap)) = (outcome[i], played_at[i], home_points[i], away_points[i])
        else {
            continue;
        };
        let key = |country: &Option<String>, team: &Option<String>| {
            (country.clone().unwrap_or_default(), team.clone().unwrap_or_default())
        };
        teams.entry(key(&home_country[i], &home_team[i])).or_default().push(TeamMatch {
            played_at: at,
            points: hp as f64,
            opponent_points: ap as f64,
            home: true,
        });
        teams.entry(key(&away_country[i], &away_team[i])).or_default().push(TeamMatch {
            played_at: at,
            points: ap as f64,
            opponent_points: hp as f64,
            home: false,
        });
    }
    Ok(teams)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}

/// Least-squares slope of `y` over `x`.
fn slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx > 0.0 {
        sxy / sxx
    } else {
        0.0
    }
}

impl TeamKpiFeatures {
    fn team_kpi(&self, matches: &[TeamMatch], reference: NaiveDateTime) -> Vec<f64> {
        let weights: Vec<f64> = matches
            .iter()
            .map(|m| {
                let age = (reference - m.played_at).num_seconds() as f64 / SECONDS_PER_YEAR;
                (1.0 - self.age_factor).powf(age)
            })
            .collect();
        let weighted = |pred: &dyn Fn(&TeamMatch) -> bool| -> f64 {
            matches.iter().zip(&weights).filter(|(m, _)| pred(*m)).map(|(_, w)| w).sum()
        };
        let weighted_sum = |value: &dyn Fn(&TeamMatch) -> f64| -> f64 {
            matches.iter().zip(&weights).map(|(m, w)| value(m) * w).sum()
        };
        let total = weights.iter().sum::<f64>();
        let wins = weighted(&|m| m.points > m.opponent_points);
        let draws = weighted(&|m| m.points == m.opponent_points);
        let losses = weighted(&|m| m.points < m.opponent_points);

        self.kpi
            .iter()
            .map(|kpi| match kpi {
                TeamKpi::WinRate => ratio(wins, total),
                TeamKpi::DrawRate => ratio(draws, total),
                TeamKpi::LossRate => ratio(losses, total),
                TeamKpi::ShutoutWinRate => {
                    ratio(weighted(&|m| m.points > m.opponent_points && m.opponent_points == 0.0), wins)
                }
                TeamKpi::ShutoutLossRate => {
                    ratio(weighted(&|m| m.points < m.opponent_points && m.points == 0.0), losses)
                }
                TeamKpi::HomeWinRate => ratio(weighted(&|m| m.points > m.opponent_points && m.home), wins),
                TeamKpi::AwayWinRate => ratio(weighted(&|m| m.points > m.opponent_points && !m.home), wins),
                TeamKpi::MeanPointsRatio => ratio(
                    weighted_sum(&|m| m.points),
                    weighted_sum(&|m| m.points + m.opponent_points),
                ),
                TeamKpi::MeanPoints => ratio(weighted_sum(&|m| m.points), total),
                TeamKpi::MeanOpponentPoints => ratio(weighted_sum(&|m| m.opponent_points), total),
                TeamKpi::MeanPointsDiff => ratio(weighted_sum(&|m| m.points - m.opponent_points), total),
                TeamKpi::MeanDrawPoints => nan_mean(
                    matches
                        .iter()
                        .zip(&weights)
                        .filter(|(m, _)| m.points == m.opponent_points)
                        .map(|(m, w)| m.points * w),
                ),
                TeamKpi::PointsDiffGrowth => {
                    let since = reference - Duration::days(365);
                    let recent: Vec<&TeamMatch> = matches.iter().filter(|m| m.played_at >= since).collect();
                    if recent.len() < MIN_TREND_MATCHES {
                        return 0.0;
                    }
                    let years: Vec<f64> = recent
                        .iter()
                        .map(|m| (m.played_at - since).num_seconds() as f64 / SECONDS_PER_YEAR)
                        .collect();
                    let diff: Vec<f64> = recent.iter().map(|m| m.points - m.opponent_points).collect();
                    slope(&years, &diff)
                }
            })
            .collect()
    }

    fn lookup<'a>(teams: &'a [TeamStats], country: &Option<String>, team: &Option<String>) -> Option<&'a [f64]> {
        let country = country.as_deref().unwrap_or_default();
        let team = team.as_deref().unwrap_or_default();
        teams
            .iter()
            .find(|t| t.country == country && t.team == team)
            .map(|t| t.values.as_slice())
    }
}

impl Features for TeamKpiFeatures {
    fn fit(&mut self, table: &Table) -> Result<()> {
        let grouped = unpivot(table)?;
        let Some(reference) = grouped.values().flatten().map(|m| m.played_at).max() else {
            self.teams = Some(Vec::new());
            return Ok(());
        };
        let mut teams: Vec<TeamStats> = grouped
            .iter()
            .map(|((country, team), matches)| TeamStats {
                country: country.clone(),
                team: team.clone(),
                values: self.team_kpi(matches, reference),
            })
            .collect();
        // undefined KPIs take the mean over teams, or 0 like unknown teams
        for j in 0..self.kpi.len() {
            let mean = nan_mean(teams.iter().map(|t| t.values[j]));
            let mean = if mean.is_nan() { 0.0 } else { mean };
            for t in &mut teams {
                if t.values[j].is_nan() {
                    t.values[j] = mean;
                }
            }
        }
        debug!(teams = teams.len(), kpi = self.kpi.len(), "Team KPI features fitted");
        self.teams = Some(teams);
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<Matrix> {
        let teams = self
            .teams
            .as_ref()
            .ok_or_else(|| EngineError::NotFitted("team KPI features".into()))?;
        let m = table.matches()?;
        let home_country = m.texts("home_country")?;
        let away_country = m.texts("away_country")?;
        let home_team = m.texts("home_team")?;
        let away_team = m.texts("away_team")?;

        let names = self.kpi.iter().map(|k| format!("{k:?}")).collect();
        let rows = (0..table.len())
            .map(|i| {
                let home = Self::lookup(teams, &home_country[i], &home_team[i]);
                let away = Self::lookup(teams, &away_country[i], &away_team[i]);
                match (home, away) {
                    (Some(h), Some(a)) => h
                        .iter()
                        .zip(a)
                        .map(|(h, a)| {
                            let d = h - a;
                            if d.is_nan() { 0.0 } else { d }
                        })
                        .collect(),
                    _ => vec![0.0; self.kpi.len()],
                }
            })
            .collect();
        Ok(Matrix::new(names, rows))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

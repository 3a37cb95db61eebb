use serde::{Deserialize, Serialize};

use super::{Features, Matrix};
use crate::table::Table;
use crate::types::Result;

/// Team indicators.
///
/// By default a row flags both of its teams in one shared block; with
/// `encode_venue` the home and away teams get separate one-hot blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamFeatures {
    #[serde(default)]
    pub encode_venue: bool,
    #[serde(default)]
    home_teams: Vec<String>,
    #[serde(default)]
    away_teams: Vec<String>,
    #[serde(default)]
    teams: Vec<String>,
}

impl TeamFeatures {
    pub fn venue_aware() -> Self {
        Self { encode_venue: true, ..Self::default() }
    }
}

fn team_columns(table: &Table) -> Result<(Vec<String>, Vec<String>)> {
    let owned = |v: &[Option<String>]| -> Vec<String> {
        v.iter().map(|t| t.clone().unwrap_or_default()).collect()
    };
    Ok((owned(table.texts("match.home_team")?), owned(table.texts("match.away_team")?)))
}

fn distinct<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = names.cloned().collect();
    out.sort();
    out.dedup();
    out
}

fn indicator(known: &[String], name: &str) -> Vec<f64> {
    known.iter().map(|k| if k == name { 1.0 } else { 0.0 }).collect()
}

impl Features for TeamFeatures {
    fn fit(&mut self, table: &Table) -> Result<()> {
        let (home, away) = team_columns(table)?;
        if self.encode_venue {
            self.home_teams = distinct(home.iter());
            self.away_teams = distinct(away.iter());
        } else {
            self.teams = distinct(home.iter().chain(away.iter()));
        }
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<Matrix> {
        let (home, away) = team_columns(table)?;
        if self.encode_venue {
            let names = self
                .home_teams
                .iter()
                .map(|t| format!("home_team={t}"))
                .chain(self.away_teams.iter().map(|t| format!("away_team={t}")))
                .collect();
            let rows = home
                .iter()
                .zip(&away)
                .map(|(h, a)| {
                    let mut row = indicator(&self.home_teams, h);
                    row.extend(indicator(&self.away_teams, a));
                    row
                })
                .collect();
            return Ok(Matrix::new(names, rows));
        }
        let names = self.teams.iter().map(|t| format!("team={t}")).collect();
        let rows = home
            .iter()
            .zip(&away)
            .map(|(h, a)| self.teams.iter().map(|t| if t == h || t == a { 1.0 } else { 0.0 }).collect())
            .collect();
        Ok(Matrix::new(names, rows))
    }
}

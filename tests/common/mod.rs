//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use punter::table::{ColumnData, MatchRecord, Table};

const TEAMS: [&str; 8] = ["Arsenal", "Chelsea", "Everton", "Fulham", "Leeds", "Burnley", "Wolves", "Brighton"];

/// Kick-off of the `i`-th fixture, six hours apart.
pub fn kickoff(i: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 8, 1)
        .and_then(|d| d.and_hms_opt(15, 0, 0))
        .map(|t| t + Duration::hours(6 * i))
        .unwrap()
}

pub fn fixture(id: &str, i: i64, points: (i64, i64), odds: [f64; 3]) -> MatchRecord {
    let home = TEAMS[(i as usize) % TEAMS.len()];
    let away = TEAMS[(i as usize + 3) % TEAMS.len()];
    MatchRecord::new(id, kickoff(i))
        .league("Football", if i % 2 == 0 { "Premier" } else { "Championship" }, "2022")
        .teams(home, away)
        .countries("GB", "GB")
        .points(points.0, points.1)
        .bookmaker("Pinnacle")
        .single_odds(odds[0], odds[1], odds[2])
}

/// Matches with known outcome probabilities.
///
/// Odds carry a 5% margin over the true probabilities, outcomes are drawn
/// from them, and the true probabilities are stored under `prediction.*`.
pub fn synthetic(n: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(n);
    let mut probabilities: [Vec<f64>; 3] = Default::default();
    for i in 0..n {
        let home: f64 = rng.gen_range(0.1..0.8);
        let draw: f64 = rng.gen_range(0.1..(0.95 - home).min(0.35));
        let away = 1.0 - home - draw;
        let u: f64 = rng.gen();
        let points = if u < home {
            (2, 0)
        } else if u < home + draw {
            (1, 1)
        } else {
            (0, 1)
        };
        let odds = [home, draw, away].map(|p| 1.0 / (p * 1.05));
        records.push(fixture(&format!("s{i}"), i as i64, points, odds));
        for (column, p) in probabilities.iter_mut().zip([home, draw, away]) {
            column.push(p);
        }
    }
    let mut table = Table::from_records(&records);
    for (code, column) in ["1", "X", "2"].into_iter().zip(probabilities) {
        table.set_namespaced("prediction", code, ColumnData::Float(column)).unwrap();
    }
    table
}

//! Bet recommendation: predict, bet and size upcoming matches with fitted
//! models.

use tracing::info;

use crate::dropper::Dropper;
use crate::engine::accountant::Accountant;
use crate::predict::Predictor;
use crate::strategy::Better;
use crate::table::{render_grid, Table};
use crate::types::{Result, SINGLE_OUTCOMES};

/// Run the decision stages over `table` and keep the rows carrying a bet.
///
/// Only odds-complete rows are considered. Droppers are applied as fitted;
/// they are not refit here. Investments are sized independently per row
/// from the accountant's current balance, which is left untouched.
pub fn recommend_bets<P, B, A, D>(
    table: &Table,
    predictor: &P,
    better: &B,
    accountant: &mut A,
    droppers: &[D],
) -> Result<Table>
where
    P: Predictor + ?Sized,
    B: Better + ?Sized,
    A: Accountant + ?Sized,
    D: Dropper,
{
    let mut rows = table.odds()?.drop_missing()?;
    info!(matches = table.len(), with_odds = rows.len(), "Recommending bets");
    for dropper in droppers {
        rows = dropper.drop_rows(&rows)?;
    }

    predictor.predict_inplace(&mut rows)?;
    better.bet_inplace(&mut rows)?;
    accountant.invest_parallel_inplace(&mut rows)?;
    let recommended = rows.bet()?.drop_abstained()?;

    info!(
        candidates = rows.len(),
        bets = recommended.len(),
        balance = accountant.balance(),
        "Bets recommended"
    );
    Ok(recommended)
}

/// Human-readable summary of recommended bets, one line per bet.
pub fn render_recommendations(table: &Table) -> Result<String> {
    let header: Vec<String> = [
        "league", "date", "time", "home", "away", "odds 1/X/2", "pred 1/X/2", "bet", "expediency %",
        "investment",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let leagues = table.texts("match.league")?;
    let times = table.times("match.played_at")?;
    let home = table.texts("match.home_team")?;
    let away = table.texts("match.away_team")?;
    let odds = table.odds()?;
    let prediction = table.prediction()?;
    let outcomes = table.bet()?.outcomes()?;
    let expediency = table.bet()?.expediency();
    let investment = table.floats_or_nan("accounting.investment");

    let prices: Vec<Vec<f64>> = SINGLE_OUTCOMES.iter().map(|o| odds.values(*o)).collect();
    let probabilities = SINGLE_OUTCOMES
        .iter()
        .map(|o| prediction.probability(*o))
        .collect::<Result<Vec<_>>>()?;

    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let rows: Vec<Vec<String>> = (0..table.len())
        .map(|i| {
            let (date, time) = match times[i] {
                Some(t) => (t.format("%Y-%m-%d").to_string(), t.format("%H:%M").to_string()),
                None => (String::new(), String::new()),
            };
            vec![
                text(&leagues[i]),
                date,
                time,
                text(&home[i]),
                text(&away[i]),
                prices.iter().map(|p| format!("{:.2}", p[i])).collect::<Vec<_>>().join(" / "),
                probabilities.iter().map(|p| format!("{:.2}", p[i])).collect::<Vec<_>>().join(" / "),
                outcomes[i].map(|o| o.to_string()).unwrap_or_default(),
                format!("{:.0}", expediency[i] * 100.0),
                format!("{:.2}", investment[i]),
            ]
        })
        .collect();
    Ok(render_grid(&header, &rows))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

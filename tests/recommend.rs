//! Recommending bets on upcoming fixtures with fitted models.

mod common;

use common::{fixture, synthetic};
use punter::dropper::{DropperKind, LeagueDropper};
use punter::engine::{recommend_bets, render_recommendations, Accountant, Bankroll, ParametricAccountant};
use punter::predict::{OddsPredictor, PredictorKind};
use punter::strategy::{Better, OpcBetter};
use punter::table::{MatchRecord, Table};

fn upcoming() -> Table {
    let mut records: Vec<MatchRecord> = (0..40)
        .map(|i| {
            let home = 1.5 + 0.1 * i as f64;
            fixture(&format!("next{i}"), 500 + i, (-1, -1), [home, 3.6, 1.0 / (1.05 - 1.0 / home - 1.0 / 3.6)])
        })
        .collect();
    // Never priced: cannot be recommended.
    records.push(MatchRecord::new("unpriced", common::kickoff(600)).league("Football", "Premier", "2022"));
    Table::from_records(&records)
}

#[test]
fn test_recommendations_are_sized_and_filtered() {
    let predictor = PredictorKind::Odds(OddsPredictor::default());
    let mut better = OpcBetter { bet_rate: 0.2, ..OpcBetter::default() }.with_predictor(predictor.clone());
    let mut history = synthetic(1000, 13);
    for code in ["1", "X", "2"] {
        history.remove_column(&format!("prediction.{code}"));
    }
    better.fit(&history).unwrap();

    let mut accountant = ParametricAccountant {
        min_frac: 0.01,
        max_frac: 0.05,
        bankroll: Bankroll::new(500.0),
        ..ParametricAccountant::default()
    };
    let droppers = [DropperKind::League(LeagueDropper::new([("Football", "Premier")]))];

    let recommended = recommend_bets(&upcoming(), &predictor, &better, &mut accountant, &droppers).unwrap();
    assert_eq!(accountant.balance(), 500.0);
    assert!(recommended.index().iter().all(|k| k.match_id != "unpriced"));
    assert!(recommended.texts("match.league").unwrap().iter().all(|l| l.as_deref() == Some("Premier")));
    let investments = recommended.floats("accounting.investment").unwrap();
    assert!(investments.iter().all(|v| (5.0..=25.0).contains(v)));

    let text = render_recommendations(&recommended).unwrap();
    assert_eq!(text.lines().count(), recommended.len() + 2);
}

//! Threshold bettor over the odds-probability convolution
//! `odds * probability ^ accuracy_factor`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::calibration::ScalarSearch;
use super::{bet_table, Better};
use crate::learn::quantile;
use crate::predict::{Predictor, PredictorKind};
use crate::table::namespace::Bet;
use crate::table::Table;
use crate::types::{EngineError, Outcome, Result, OUTCOMES};

/// Thresholds frozen by `fit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpcCalibration {
    pub accuracy_factor: f64,
    pub min_opc: f64,
    pub max_opc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpcBetter {
    /// Share of the fit population that clears `min_opc`.
    pub bet_rate: f64,
    /// Win rate targeted when the accuracy factor is searched.
    pub win_rate: f64,
    pub expediency_contrast: f64,
    /// Candidate outcomes; those without an odds column are skipped.
    pub outcomes: Vec<Outcome>,
    /// Fixed accuracy factor; searched at fit when `None`.
    pub accuracy_factor: Option<f64>,
    pub accuracy_factor_tolerance: f64,
    pub accuracy_factor_bounds: (f64, f64),
    /// Odds cap applied before convolution, both at fit and at bet.
    pub max_odds: Option<f64>,
    pub predictor: Option<Box<PredictorKind>>,
    pub calibration: Option<OpcCalibration>,
}

impl Default for OpcBetter {
    fn default() -> Self {
        Self {
            bet_rate: 0.03,
            win_rate: 0.55,
            expediency_contrast: 1.0,
            outcomes: OUTCOMES.to_vec(),
            accuracy_factor: None,
            accuracy_factor_tolerance: 0.05,
            accuracy_factor_bounds: (0.0, 16.0),
            max_odds: None,
            predictor: None,
            calibration: None,
        }
    }
}

impl OpcBetter {
    pub fn with_predictor(mut self, predictor: PredictorKind) -> Self {
        self.predictor = Some(Box::new(predictor));
        self
    }

    /// Best candidate per row and its convolution; `None` when no candidate
    /// has a defined value.
    fn best_outcomes(&self, table: &Table, accuracy_factor: f64) -> Result<Vec<(Option<Outcome>, f64)>> {
        let clipped;
        let table = match self.max_odds {
            Some(cap) => {
                clipped = table.odds()?.clip(cap)?;
                &clipped
            }
            None => table,
        };
        let opc: Vec<(Outcome, Vec<f64>)> = table
            .prediction()?
            .odds_probability_convolution(accuracy_factor)?
            .into_iter()
            .filter(|(o, _)| self.outcomes.contains(o))
            .collect();
        Ok((0..table.len())
            .map(|i| {
                let mut best = (None, f64::NEG_INFINITY);
                for (outcome, values) in &opc {
                    let v = if values[i].is_nan() { f64::NEG_INFINITY } else { values[i] };
                    if v > best.1 {
                        best = (Some(*outcome), v);
                    }
                }
                best
            })
            .collect())
    }

    fn thresholds(&self, best: &[(Option<Outcome>, f64)]) -> (f64, f64) {
        let values: Vec<f64> = best.iter().map(|(_, v)| *v).filter(|v| v.is_finite()).collect();
        let min_opc = quantile(&values, 1.0 - self.bet_rate);
        let max_opc = values.iter().copied().fold(f64::NAN, f64::max);
        (min_opc, max_opc)
    }

    /// Win rate of the bets placed on `population` at `accuracy_factor`.
    fn achieved_win_rate(&self, population: &Table, realised: &[Option<Outcome>], accuracy_factor: f64) -> Result<f64> {
        let best = self.best_outcomes(population, accuracy_factor)?;
        let (min_opc, _) = self.thresholds(&best);
        let (mut bets, mut wins) = (0usize, 0usize);
        for ((outcome, v), real) in best.iter().zip(realised) {
            if let (Some(outcome), Some(real)) = (outcome, real) {
                if *v >= min_opc {
                    bets += 1;
                    wins += usize::from(outcome.covers(*real));
                }
            }
        }
        Ok(if bets == 0 { f64::NAN } else { wins as f64 / bets as f64 })
    }

    fn calibrate(&self, population: &Table) -> Result<f64> {
        let realised = population.matches()?.outcome()?;
        let (lower, upper) = self.accuracy_factor_bounds;
        let search = ScalarSearch::new(lower, upper, self.accuracy_factor_tolerance);
        let minimum = search.minimize(|af| {
            let achieved = self.achieved_win_rate(population, &realised, af)?;
            Ok(if achieved.is_nan() { 1.0 } else { (achieved - self.win_rate).abs() })
        })?;
        debug!(
            accuracy_factor = minimum.x,
            error = minimum.value,
            evaluations = minimum.evaluations,
            "Accuracy factor searched"
        );
        Ok(minimum.x)
    }

    /// Bet on a table that already carries predictions.
    fn decide(&self, table: &Table) -> Result<Table> {
        let calibration = self
            .calibration
            .ok_or_else(|| EngineError::NotFitted("OPC better has no calibrated thresholds".into()))?;
        let best = self.best_outcomes(table, calibration.accuracy_factor)?;

        let span = calibration.max_opc - calibration.min_opc;
        let mut outcomes = Vec::with_capacity(best.len());
        let mut expediency = Vec::with_capacity(best.len());
        for (outcome, v) in best {
            match outcome {
                Some(outcome) if v >= calibration.min_opc => {
                    outcomes.push(Some(outcome));
                    let scaled = if span > 0.0 { ((v - calibration.min_opc) / span).clamp(0.0, 1.0) } else { 1.0 };
                    expediency.push(scaled.powf(1.0 / self.expediency_contrast));
                }
                _ => {
                    outcomes.push(None);
                    expediency.push(f64::NAN);
                }
            }
        }
        bet_table(table, &outcomes, expediency)
    }

    fn with_predictions<'a>(&self, table: &'a Table, scratch: &'a mut Option<Table>) -> Result<&'a Table> {
        match &self.predictor {
            Some(predictor) => {
                let mut copy = table.clone();
                predictor.predict_inplace(&mut copy)?;
                Ok(scratch.insert(copy))
            }
            None => Ok(table),
        }
    }
}

impl Better for OpcBetter {
    fn fit(&mut self, table: &Table) -> Result<()> {
        if let Some(predictor) = self.predictor.as_mut() {
            predictor.fit(table)?;
        }
        let mut scratch = None;
        let working = self.with_predictions(table, &mut scratch)?;
        let population = working.odds()?.drop_missing()?.matches()?.drop_without_points()?;
        if population.is_empty() {
            return Err(EngineError::Configuration(
                "no odds-complete, resolved matches to calibrate on".into(),
            ));
        }

        let accuracy_factor = match self.accuracy_factor {
            Some(af) => af,
            None => self.calibrate(&population)?,
        };
        let best = self.best_outcomes(&population, accuracy_factor)?;
        let (min_opc, max_opc) = self.thresholds(&best);
        let realised = population.matches()?.outcome()?;
        let win_rate = self.achieved_win_rate(&population, &realised, accuracy_factor)?;

        info!(
            rows = population.len(),
            accuracy_factor,
            min_opc,
            max_opc,
            win_rate,
            "OPC better calibrated"
        );
        self.calibration = Some(OpcCalibration { accuracy_factor, min_opc, max_opc });
        Ok(())
    }

    fn bet(&self, table: &Table) -> Result<Table> {
        let mut scratch = None;
        let working = self.with_predictions(table, &mut scratch)?;
        self.decide(working)
    }

    /// Also writes `prediction.*` when the better owns a predictor.
    fn bet_inplace(&self, table: &mut Table) -> Result<()> {
        if let Some(predictor) = &self.predictor {
            predictor.predict_inplace(table)?;
        }
        let bets = self.decide(table)?;
        table.assign::<Bet>(bets)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! `prediction.*` view.

use super::namespace::Prediction;
use super::odds::hit_rate;
use super::Group;
use crate::types::{Outcome, Result, OUTCOMES, SINGLE_OUTCOMES};

impl<'t> Group<'t, Prediction> {
    /// Probability of any outcome; doubles are the sum of their singles.
    pub fn probability(&self, outcome: Outcome) -> Result<Vec<f64>> {
        let parts = outcome
            .constituents()
            .iter()
            .map(|single| self.floats(single.code()))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.len()).map(|i| parts.iter().map(|p| p[i]).sum()).collect())
    }

    /// Outcome with the highest single probability per row (first on ties).
    pub fn most_probable_outcome(&self) -> Result<Vec<Outcome>> {
        let singles = SINGLE_OUTCOMES
            .iter()
            .map(|o| self.floats(o.code()))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.len())
            .map(|i| {
                let mut best = 0;
                for j in 1..singles.len() {
                    if singles[j][i] > singles[best][i] {
                        best = j;
                    }
                }
                SINGLE_OUTCOMES[best]
            })
            .collect())
    }

    /// Share of resolved rows where the most probable outcome happened.
    pub fn accuracy(&self) -> Result<f64> {
        let picked = self.most_probable_outcome()?;
        let realised = self.table().matches()?.outcome()?;
        Ok(hit_rate(&picked, &realised))
    }

    /// `odds * probability ^ accuracy_factor` for every outcome with odds.
    ///
    /// Outcomes whose odds were never scanned are omitted.
    pub fn odds_probability_convolution(&self, accuracy_factor: f64) -> Result<Vec<(Outcome, Vec<f64>)>> {
        let odds = self.table().odds()?;
        let mut out = Vec::new();
        for outcome in OUTCOMES {
            if !odds.contains(outcome.code()) {
                continue;
            }
            let prices = odds.values(outcome);
            let opc = self
                .probability(outcome)?
                .iter()
                .zip(&prices)
                .map(|(p, o)| o * p.powf(accuracy_factor))
                .collect();
            out.push((outcome, opc));
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::table::fixtures::record;
    use crate::table::{ColumnData, Table};
    use crate::types::Outcome;

    fn predicted() -> Table {
        let mut t = Table::from_records(&[
            record("m1", 0, 1, 0).odds(Outcome::HomeOrDraw, 1.25),
            record("m2", 1, 0, 2),
            record("m3", 2, 1, 1),
        ]);
        t.set_namespaced("prediction", "1", ColumnData::Float(vec![0.6, 0.5, 0.2])).unwrap();
        t.set_namespaced("prediction", "X", ColumnData::Float(vec![0.3, 0.1, 0.3])).unwrap();
        t.set_namespaced("prediction", "2", ColumnData::Float(vec![0.1, 0.4, 0.5])).unwrap();
        t
    }

    #[test]
    fn test_double_probability_is_sum() {
        let t = predicted();
        let p = t.prediction().unwrap().probability(Outcome::HomeOrDraw).unwrap();
        assert!((p[0] - 0.9).abs() < 1e-12);
        assert!((p[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_most_probable_and_accuracy() {
        let t = predicted();
        let pred = t.prediction().unwrap();
        assert_eq!(
            pred.most_probable_outcome().unwrap(),
            vec![Outcome::Home, Outcome::Home, Outcome::Away]
        );
        // m1 hit, m2 miss, m3 miss
        assert!((pred.accuracy().unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_opc_uses_scanned_outcomes_only() {
        let t = predicted();
        let opc = t.prediction().unwrap().odds_probability_convolution(1.0).unwrap();
        let outcomes: Vec<_> = opc.iter().map(|(o, _)| *o).collect();
        assert_eq!(outcomes, vec![Outcome::Home, Outcome::Draw, Outcome::Away, Outcome::HomeOrDraw]);
        assert!((opc[0].1[0] - 1.2).abs() < 1e-12);
        assert!((opc[3].1[0] - 1.125).abs() < 1e-12);
        assert!(opc[3].1[1].is_nan());

        let squared = t.prediction().unwrap().odds_probability_convolution(2.0).unwrap();
        assert!((squared[0].1[0] - 2.0 * 0.36).abs() < 1e-12);
    }
}

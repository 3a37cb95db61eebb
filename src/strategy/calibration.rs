//! Bounded one-dimensional minimisation used to calibrate betting
//! thresholds.
//!
//! The objectives minimised here are step functions of the parameter (a win
//! rate over a finite population), so derivative-based methods are useless.
//! A coarse grid scan locates the best cell, then golden-section search
//! refines inside the neighbouring cells. No randomness is involved: the
//! same objective yields the same minimum.

use crate::types::{EngineError, Result};

const INV_PHI: f64 = 0.618_033_988_749_895;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSearch {
    pub lower: f64,
    pub upper: f64,
    /// Number of grid cells scanned before refinement.
    pub grid: usize,
    /// Width of the final bracket.
    pub tolerance: f64,
}

/// Best point found by a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub value: f64,
    pub evaluations: usize,
}

impl ScalarSearch {
    pub fn new(lower: f64, upper: f64, tolerance: f64) -> Self {
        Self { lower, upper, grid: 32, tolerance }
    }

    /// Minimise `objective` over `[lower, upper]`.
    ///
    /// NaN objective values lose against every finite value.
    pub fn minimize<F>(&self, mut objective: F) -> Result<Minimum>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        if !(self.lower < self.upper) || self.grid == 0 || !(self.tolerance > 0.0) {
            return Err(EngineError::Configuration(format!(
                "invalid search over [{}, {}] with grid {} and tolerance {}",
                self.lower, self.upper, self.grid, self.tolerance
            )));
        }
        let mut evaluations = 0;
        let mut eval = |x: f64| -> Result<f64> {
            evaluations += 1;
            let v = objective(x)?;
            Ok(if v.is_nan() { f64::INFINITY } else { v })
        };

        let step = (self.upper - self.lower) / self.grid as f64;
        let mut best = Minimum { x: self.lower, value: f64::INFINITY, evaluations: 0 };
        let mut best_cell = 0;
        for k in 0..=self.grid {
            let x = self.lower + step * k as f64;
            let v = eval(x)?;
            if v < best.value {
                best = Minimum { x, value: v, evaluations: 0 };
                best_cell = k;
            }
        }

        if best.value > 0.0 {
            let mut a = self.lower + step * best_cell.saturating_sub(1) as f64;
            let mut b = (self.lower + step * (best_cell + 1) as f64).min(self.upper);
            let mut c = b - INV_PHI * (b - a);
            let mut d = a + INV_PHI * (b - a);
            let mut fc = eval(c)?;
            let mut fd = eval(d)?;
            while (b - a) > self.tolerance {
                if fc <= fd {
                    b = d;
                    d = c;
                    fd = fc;
                    c = b - INV_PHI * (b - a);
                    fc = eval(c)?;
                } else {
                    a = c;
                    c = d;
                    fc = fd;
                    d = a + INV_PHI * (b - a);
                    fd = eval(d)?;
                }
                for (x, v) in [(c, fc), (d, fd)] {
                    if v < best.value {
                        best.x = x;
                        best.value = v;
                    }
                }
            }
        }

        best.evaluations = evaluations;
        Ok(best)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_minimum() {
        let search = ScalarSearch::new(0.0, 16.0, 1e-6);
        let min = search.minimize(|x| Ok((x - 3.3).powi(2))).unwrap();
        assert!((min.x - 3.3).abs() < 1e-3);
    }

    #[test]
    fn test_step_function_is_deterministic() {
        let objective = |x: f64| -> Result<f64> { Ok((((x * 7.0).floor() / 7.0) - 0.55).abs()) };
        let search = ScalarSearch::new(0.0, 2.0, 0.01);
        let a = search.minimize(objective).unwrap();
        let b = search.minimize(objective).unwrap();
        assert_eq!(a, b);
        assert!(a.value <= 1.0 / 7.0);
    }

    #[test]
    fn test_nan_values_are_avoided() {
        let search = ScalarSearch::new(0.0, 1.0, 0.01);
        let min = search
            .minimize(|x| Ok(if x < 0.5 { f64::NAN } else { x }))
            .unwrap();
        assert!(min.x >= 0.5);
    }

    #[test]
    fn test_invalid_bounds() {
        let search = ScalarSearch::new(1.0, 1.0, 0.01);
        assert!(matches!(search.minimize(|x| Ok(x)), Err(EngineError::Configuration(_))));
    }
}

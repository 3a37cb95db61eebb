use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{prediction_table, Predictor};
use crate::features::{FeaturePipeline, Features};
use crate::learn::{Classifier, ClassifierKind};
use crate::table::Table;
use crate::types::{EngineError, Result};

/// Feature pipeline feeding a classifier trained on the realised outcome.
///
/// Classes absent from the training labels (typically draws when training
/// without them) are predicted with probability 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelinePredictor {
    pub features: FeaturePipeline,
    pub classifier: ClassifierKind,
}

impl PipelinePredictor {
    pub fn new(features: FeaturePipeline, classifier: ClassifierKind) -> Self {
        Self { features, classifier }
    }
}

impl Predictor for PipelinePredictor {
    fn fit(&mut self, table: &Table) -> Result<()> {
        let resolved = table.matches()?.drop_without_points()?;
        if resolved.is_empty() {
            return Err(EngineError::Configuration(
                "cannot fit a predictor on a table without resolved matches".into(),
            ));
        }
        let labels: Vec<usize> = resolved
            .matches()?
            .outcome()?
            .iter()
            .flatten()
            .filter_map(|o| o.single_index())
            .collect();
        self.features.fit(&resolved)?;
        let x = self.features.transform(&resolved)?;
        self.classifier.fit(&x.rows, &labels)?;
        debug!(rows = resolved.len(), features = x.width(), "Pipeline predictor fitted");
        Ok(())
    }

    fn predict(&self, table: &Table) -> Result<Table> {
        let x = self.features.transform(table)?;
        let proba = self.classifier.predict_proba(&x.rows)?;
        let classes = self.classifier.classes();
        let mut out: [Vec<f64>; 3] = Default::default();
        for row in &proba {
            for (class, column) in out.iter_mut().enumerate() {
                let p = classes.iter().position(|c| *c == class).map_or(0.0, |k| row[k]);
                column.push(p);
            }
        }
        prediction_table(table, out)
    }
}

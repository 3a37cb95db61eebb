//! Feature extraction: turning table rows into numeric model inputs.
//!
//! Each extractor may learn something at fit (categories, means, team
//! statistics) and is afterwards a pure function of the table. Extractors
//! are combined side by side by a `FeaturePipeline`, optionally followed by
//! a `StandardScaler`.

pub mod league;
pub mod odds;
pub mod opc;
pub mod scaler;
pub mod team;
pub mod team_kpi;

use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::types::{EngineError, Result};

pub use league::LeagueFeatures;
pub use odds::OddsFeatures;
pub use opc::OpcFeatures;
pub use scaler::StandardScaler;
pub use team::TeamFeatures;
pub use team_kpi::{TeamKpi, TeamKpiFeatures};

// ---------------------------------------------------------------------------
// Feature matrix
// ---------------------------------------------------------------------------

/// Dense row-major feature matrix with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { names, rows }
    }

    /// Build from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>, len: usize) -> Self {
        let mut rows = vec![Vec::with_capacity(columns.len()); len];
        let mut names = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            names.push(name);
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(v);
            }
        }
        Self { names, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Append the columns of `other` to the right.
    pub fn hstack(mut self, other: Matrix) -> Result<Matrix> {
        if self.names.is_empty() && self.rows.is_empty() {
            return Ok(other);
        }
        if self.len() != other.len() {
            return Err(EngineError::Configuration(format!(
                "cannot stack {} feature rows next to {}",
                other.len(),
                self.len()
            )));
        }
        self.names.extend(other.names);
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.extend(extra);
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Extractor contract
// ---------------------------------------------------------------------------

pub trait Features {
    fn fit(&mut self, _table: &Table) -> Result<()> {
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<Matrix>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Odds(OddsFeatures),
    League(LeagueFeatures),
    Team(TeamFeatures),
    Opc(OpcFeatures),
    TeamKpi(TeamKpiFeatures),
}

impl Features for FeatureKind {
    fn fit(&mut self, table: &Table) -> Result<()> {
        match self {
            FeatureKind::Odds(f) => f.fit(table),
            FeatureKind::League(f) => f.fit(table),
            FeatureKind::Team(f) => f.fit(table),
            FeatureKind::Opc(f) => f.fit(table),
            FeatureKind::TeamKpi(f) => f.fit(table),
        }
    }

    fn transform(&self, table: &Table) -> Result<Matrix> {
        match self {
            FeatureKind::Odds(f) => f.transform(table),
            FeatureKind::League(f) => f.transform(table),
            FeatureKind::Team(f) => f.transform(table),
            FeatureKind::Opc(f) => f.transform(table),
            FeatureKind::TeamKpi(f) => f.transform(table),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Feature union followed by an optional scaler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub features: Vec<FeatureKind>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl FeaturePipeline {
    pub fn new(features: Vec<FeatureKind>) -> Self {
        Self { features, scaler: None }
    }

    pub fn with_scaler(mut self) -> Self {
        self.scaler = Some(StandardScaler::default());
        self
    }

    fn union(&self, table: &Table) -> Result<Matrix> {
        let mut matrix = Matrix::default();
        for feature in &self.features {
            matrix = matrix.hstack(feature.transform(table)?)?;
        }
        if matrix.rows.is_empty() {
            matrix.rows = vec![Vec::new(); table.len()];
        }
        Ok(matrix)
    }
}

impl Features for FeaturePipeline {
    fn fit(&mut self, table: &Table) -> Result<()> {
        for feature in &mut self.features {
            feature.fit(table)?;
        }
        if self.scaler.is_some() {
            let matrix = self.union(table)?;
            if let Some(scaler) = self.scaler.as_mut() {
                scaler.fit(&matrix);
            }
        }
        Ok(())
    }

    fn transform(&self, table: &Table) -> Result<Matrix> {
        let matrix = self.union(table)?;
        match &self.scaler {
            Some(scaler) => scaler.transform(matrix),
            None => Ok(matrix),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

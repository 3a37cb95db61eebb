//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Model
//! and dataset references are artifact names resolved under `data_dir`;
//! a missing name selects the newest artifact.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::backtest::{CrossValidator, SplitRule, Splitter};
use crate::dropper::DropperKind;
use crate::storage::{self, DatasetKind};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub evaluate: Option<EvaluateConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    /// Cross-validation workers; all cores when absent.
    #[serde(default)]
    pub n_workers: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendConfig {
    /// Match dataset holding the upcoming fixtures.
    #[serde(default)]
    pub dataset: Option<String>,
    /// Resolved match dataset the droppers are fitted on.
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub predictor: Option<String>,
    #[serde(default)]
    pub better: Option<String>,
    #[serde(default)]
    pub accountant: Option<String>,
    pub balance: f64,
    /// Only matches kicking off on or after this day are considered.
    #[serde(default)]
    pub played_after: Option<NaiveDate>,
    #[serde(default)]
    pub droppers: Vec<DropperKind>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            history: None,
            predictor: None,
            better: None,
            accountant: None,
            balance: 1.0,
            played_after: None,
            droppers: Vec::new(),
        }
    }
}

/// Optional out-of-sample check of the configured better before recommending.
#[derive(Debug, Deserialize, Clone)]
pub struct EvaluateConfig {
    /// Historical dataset (match kind) to split.
    #[serde(default)]
    pub dataset: Option<String>,
    pub n_splits: usize,
    pub split: SplitRule,
    #[serde(default)]
    pub max_train_size: Option<usize>,
    #[serde(default)]
    pub median_metric: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if !(config.recommend.balance.is_finite() && config.recommend.balance > 0.0) {
            anyhow::bail!("recommend.balance must be positive, got {}", config.recommend.balance);
        }
        Ok(config)
    }

    pub fn datasets_dir(&self, kind: DatasetKind) -> PathBuf {
        storage::datasets_dir(&self.engine.data_dir, kind)
    }

    pub fn models_dir(&self) -> PathBuf {
        storage::models_dir(&self.engine.data_dir)
    }

    /// Midnight of `recommend.played_after`.
    pub fn played_after(&self) -> Option<NaiveDateTime> {
        self.recommend.played_after.map(|d| d.and_time(NaiveTime::MIN))
    }

    /// Cross-validator described by `[evaluate]`, if any.
    pub fn cross_validator(&self) -> Option<CrossValidator> {
        let evaluate = self.evaluate.as_ref()?;
        let splitter = Splitter {
            max_train_size: evaluate.max_train_size,
            ..Splitter::new(evaluate.split.clone())
        };
        Some(CrossValidator {
            n_workers: self.engine.n_workers,
            seed: self.engine.seed.unwrap_or_default(),
            median_metric: evaluate.median_metric.clone(),
            ..CrossValidator::new(splitter, evaluate.n_splits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [engine]
        data_dir = "data"
        n_workers = 2
        seed = 42

        [recommend]
        better = "opc"
        balance = 250.0
        played_after = "2024-03-01"

        [[recommend.droppers]]
        kind = "rare_team"
        min_matches = 20

        [evaluate]
        n_splits = 4
        median_metric = "roi"
        split = { kind = "shuffle", test_frac = 0.2 }

        [logging]
        json = true
    "#;

    #[test]
    fn test_parse_config() {
        let cfg = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(cfg.engine.n_workers, Some(2));
        assert_eq!(cfg.recommend.better.as_deref(), Some("opc"));
        assert_eq!(cfg.recommend.predictor, None);
        assert_eq!(cfg.recommend.droppers.len(), 1);
        assert!(cfg.logging.json);
        assert_eq!(cfg.models_dir(), PathBuf::from("data/models"));
        assert_eq!(cfg.datasets_dir(DatasetKind::Match), PathBuf::from("data/datasets/match"));
        assert_eq!(cfg.played_after().unwrap().to_string(), "2024-03-01 00:00:00");
    }

    #[test]
    fn test_cross_validator_from_config() {
        let cfg = AppConfig::parse(SAMPLE).unwrap();
        let cv = cfg.cross_validator().unwrap();
        assert_eq!(cv.n_splits, 4);
        assert_eq!(cv.seed, 42);
        assert_eq!(cv.splitter.rule, SplitRule::Shuffle { test_frac: 0.2 });
    }

    #[test]
    fn test_defaults_and_validation() {
        let cfg = AppConfig::parse("[engine]\ndata_dir = \"d\"\n").unwrap();
        assert_eq!(cfg.recommend.balance, 1.0);
        assert!(!cfg.logging.json);
        assert!(cfg.cross_validator().is_none());

        let bad = AppConfig::parse("[engine]\ndata_dir = \"d\"\n[recommend]\nbalance = 0.0\n");
        assert!(bad.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("does-not-exist.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

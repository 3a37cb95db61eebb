//! PUNTER — sports bet recommendation engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod table;
pub mod learn;
pub mod features;
pub mod predict;
pub mod strategy;
pub mod engine;
pub mod dropper;
pub mod backtest;
pub mod storage;

pub use types::{EngineError, Outcome, Result};

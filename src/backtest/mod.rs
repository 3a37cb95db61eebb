//! Out-of-sample evaluation: splitting, scoring and cross-validation.

pub mod cross_validation;
pub mod scoring;
pub mod splitter;

pub use cross_validation::{CrossValidator, Evaluation};
pub use scoring::{ScoreTable, Scores, Subject};
pub use splitter::{SplitRule, Splitter};

//! Capital allocation and the bet recommendation pipeline.

pub mod accountant;
pub mod recommend;

pub use accountant::{Accountant, AccountantKind, Bankroll, BalanceGuard, ParametricAccountant};
pub use recommend::{recommend_bets, render_recommendations};

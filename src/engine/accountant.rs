//! Accountant — bankroll management and bet sizing.
//!
//! An accountant owns a bankroll: a fixed reference `capital` and a mutable
//! `balance`. `invest` turns a bettor's expediency into an amount; the two
//! replay modes run it over a bet table either sequentially (balance
//! compounds row after row) or independently (every row sized from the
//! same starting balance).

use std::ops::{Deref, DerefMut};

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::namespace::Accounting;
use crate::table::{Column, ColumnData, Table};
use crate::types::{EngineError, Result};

// ---------------------------------------------------------------------------
// Bankroll
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bankroll {
    pub capital: f64,
    pub balance: f64,
}

impl Bankroll {
    pub fn new(capital: f64) -> Self {
        Self { capital, balance: capital }
    }
}

impl Default for Bankroll {
    fn default() -> Self {
        Self::new(1.0)
    }
}

// ---------------------------------------------------------------------------
// Accountant contract
// ---------------------------------------------------------------------------

pub trait Accountant {
    fn bankroll(&self) -> &Bankroll;

    fn bankroll_mut(&mut self) -> &mut Bankroll;

    /// Amount to stake at `expediency` in [0, 1]. Unless `dry`, the amount
    /// leaves the balance.
    fn invest(&mut self, expediency: f64, dry: bool) -> Result<f64>;

    /// Fitting an accountant only resets its balance.
    fn fit(&mut self, _table: &Table) -> Result<()> {
        self.reset();
        Ok(())
    }

    fn capital(&self) -> f64 {
        self.bankroll().capital
    }

    fn balance(&self) -> f64 {
        self.bankroll().balance
    }

    fn set_balance(&mut self, balance: f64) {
        self.bankroll_mut().balance = balance;
    }

    fn reset(&mut self) {
        let capital = self.capital();
        self.set_balance(capital);
    }

    /// Credit the balance; returns are never negative.
    fn inc_balance(&mut self, amount: f64) -> Result<()> {
        if amount < 0.0 {
            return Err(EngineError::Configuration(format!(
                "cannot increase the balance by a negative amount ({amount})"
            )));
        }
        self.bankroll_mut().balance += amount;
        Ok(())
    }

    /// Replay the bets in row order, compounding the balance.
    ///
    /// Returns `investment`, `profit` and `balance` per row. Abstentions
    /// stake nothing. A bet on a match without an outcome is void: its stake
    /// is refunded and its profit is NaN. Rows must be sorted by time.
    fn invest_serial(&mut self, table: &Table) -> Result<Table> {
        let bet = table.bet()?;
        let outcomes = bet.outcomes()?;
        let expediency = bet.expediency();
        let roi = bet.roi()?;

        let n = table.len();
        let (mut investments, mut profits, mut balances) =
            (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
        for i in 0..n {
            let (investment, profit) = match outcomes[i] {
                None => (0.0, 0.0),
                Some(_) => {
                    let investment = self.invest(expediency[i], false)?;
                    if roi[i].is_nan() {
                        self.inc_balance(investment)?;
                        (investment, f64::NAN)
                    } else {
                        let profit = investment * roi[i];
                        self.inc_balance(investment + profit)?;
                        (investment, profit)
                    }
                }
            };
            investments.push(investment);
            profits.push(profit);
            balances.push(self.balance());
        }
        debug!(rows = n, balance = self.balance(), "Serial investment replayed");

        accounting_table(
            table,
            vec![("investment", investments), ("profit", profits), ("balance", balances)],
        )
    }

    fn invest_serial_inplace(&mut self, table: &mut Table) -> Result<()> {
        let accounted = self.invest_serial(table)?;
        table.assign::<Accounting>(accounted)
    }

    /// Size every row from the current balance, independently of the others.
    ///
    /// The balance is restored before each row and on every exit path.
    /// Rows with NaN expediency get a NaN investment.
    fn invest_parallel(&mut self, table: &Table) -> Result<Table> {
        let expediency = table.bet()?.expediency();
        let mut guard = BalanceGuard::new(self);
        let mut investments = Vec::with_capacity(expediency.len());
        for e in expediency {
            if e.is_nan() {
                investments.push(f64::NAN);
                continue;
            }
            guard.restore();
            investments.push(guard.invest(e, false)?);
        }
        drop(guard);
        accounting_table(table, vec![("investment", investments)])
    }

    fn invest_parallel_inplace(&mut self, table: &mut Table) -> Result<()> {
        let accounted = self.invest_parallel(table)?;
        table.assign::<Accounting>(accounted)
    }
}

fn accounting_table(table: &Table, columns: Vec<(&str, Vec<f64>)>) -> Result<Table> {
    let mut out = Table::new(table.index().to_vec());
    out.meta = table.meta.clone();
    for (name, values) in columns {
        out.set_column(Column::new(name, ColumnData::Float(values)))?;
    }
    Ok(out)
}

/// Snapshot of an accountant's balance, written back on drop.
pub struct BalanceGuard<'a, A: Accountant + ?Sized> {
    accountant: &'a mut A,
    saved: f64,
}

impl<'a, A: Accountant + ?Sized> BalanceGuard<'a, A> {
    pub fn new(accountant: &'a mut A) -> Self {
        let saved = accountant.balance();
        Self { accountant, saved }
    }

    pub fn restore(&mut self) {
        self.accountant.set_balance(self.saved);
    }
}

impl<A: Accountant + ?Sized> Deref for BalanceGuard<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        self.accountant
    }
}

impl<A: Accountant + ?Sized> DerefMut for BalanceGuard<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        self.accountant
    }
}

impl<A: Accountant + ?Sized> Drop for BalanceGuard<'_, A> {
    fn drop(&mut self) {
        self.restore();
    }
}

// ---------------------------------------------------------------------------
// Parametric policy
// ---------------------------------------------------------------------------

/// Stake `capital * (balance / capital) ^ alpha * fraction`, where the
/// fraction moves linearly from `min_frac` to `max_frac` with expediency.
///
/// Amounts are rounded to two significant digits and clamped to
/// `[min_investment, max_investment]`. The balance may go negative down to
/// `-credit`, never further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametricAccountant {
    pub min_frac: f64,
    pub max_frac: f64,
    pub min_investment: f64,
    /// No upper bound when `None`.
    pub max_investment: Option<f64>,
    pub alpha: f64,
    pub credit: f64,
    pub bankroll: Bankroll,
}

impl Default for ParametricAccountant {
    fn default() -> Self {
        Self {
            min_frac: 0.0,
            max_frac: 1.0,
            min_investment: 0.0,
            max_investment: None,
            alpha: 1.0,
            credit: 0.0,
            bankroll: Bankroll::default(),
        }
    }
}

impl ParametricAccountant {
    pub fn new(capital: f64) -> Result<Self> {
        let accountant = Self { bankroll: Bankroll::new(capital), ..Self::default() };
        accountant.validate()?;
        Ok(accountant)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(EngineError::Configuration(msg));
        if !(self.bankroll.capital > 0.0) {
            return fail(format!("capital must be positive, got {}", self.bankroll.capital));
        }
        if !(0.0 <= self.min_frac && self.min_frac <= self.max_frac && self.max_frac <= 1.0) {
            return fail(format!(
                "investment fractions must satisfy 0 <= min_frac <= max_frac <= 1, got {} and {}",
                self.min_frac, self.max_frac
            ));
        }
        if self.min_investment < 0.0 || self.credit < 0.0 {
            return fail("min_investment and credit cannot be negative".into());
        }
        if self.max_investment.is_some_and(|max| max < self.min_investment) {
            return fail("max_investment cannot be below min_investment".into());
        }
        if self.credit > 0.0 && self.min_investment <= 0.0 {
            return fail("a positive credit requires a positive min_investment".into());
        }
        Ok(())
    }

    /// Stake for `fraction` of capital. Out of funds, only `min_investment`
    /// is staked, and only while it stays within `balance + credit`.
    fn amount(&self, fraction: f64) -> f64 {
        let Bankroll { capital, balance } = self.bankroll;
        let floor = balance + self.credit;
        let fallback = if self.min_investment <= floor { self.min_investment } else { 0.0 };
        if balance <= 0.0 {
            return fallback;
        }
        let raw = capital * (balance / capital).powf(self.alpha) * fraction;
        let clamped = round_significant(raw, 2)
            .max(self.min_investment)
            .min(self.max_investment.unwrap_or(f64::INFINITY));
        if clamped <= floor {
            clamped
        } else {
            fallback
        }
    }
}

impl Accountant for ParametricAccountant {
    fn bankroll(&self) -> &Bankroll {
        &self.bankroll
    }

    fn bankroll_mut(&mut self) -> &mut Bankroll {
        &mut self.bankroll
    }

    fn invest(&mut self, expediency: f64, dry: bool) -> Result<f64> {
        self.validate()?;
        if !(0.0..=1.0).contains(&expediency) {
            return Err(EngineError::Configuration(format!(
                "expediency must lie in [0, 1], got {expediency}"
            )));
        }
        let fraction = self.min_frac + (self.max_frac - self.min_frac) * expediency;
        let amount = self.amount(fraction);
        if !dry {
            self.bankroll.balance -= amount;
        }
        Ok(amount)
    }
}

/// Round to `digits` significant digits; zero and non-finite values pass.
fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    Decimal::from_f64(value)
        .and_then(|d| d.round_sf(digits))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

// ---------------------------------------------------------------------------
// Serialisable union
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountantKind {
    Parametric(ParametricAccountant),
}

impl Default for AccountantKind {
    fn default() -> Self {
        AccountantKind::Parametric(ParametricAccountant::default())
    }
}

impl Accountant for AccountantKind {
    fn bankroll(&self) -> &Bankroll {
        match self {
            AccountantKind::Parametric(a) => a.bankroll(),
        }
    }

    fn bankroll_mut(&mut self) -> &mut Bankroll {
        match self {
            AccountantKind::Parametric(a) => a.bankroll_mut(),
        }
    }

    fn invest(&mut self, expediency: f64, dry: bool) -> Result<f64> {
        match self {
            AccountantKind::Parametric(a) => a.invest(expediency, dry),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::record;

    fn flat(capital: f64, frac: f64) -> ParametricAccountant {
        ParametricAccountant {
            min_frac: frac,
            max_frac: frac,
            bankroll: Bankroll::new(capital),
            ..ParametricAccountant::default()
        }
    }

    fn home_bets(records: &[crate::table::MatchRecord]) -> Table {
        let mut t = Table::from_records(records);
        let n = t.len();
        t.set_namespaced("bet", "outcome", ColumnData::Text(vec![Some("1".into()); n])).unwrap();
        t.set_namespaced("bet", "expediency", ColumnData::Float(vec![0.5; n])).unwrap();
        t
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(0.123456, 2), 0.12);
        assert_eq!(round_significant(1234.0, 2), 1200.0);
        assert_eq!(round_significant(0.0, 2), 0.0);
    }

    #[test]
    fn test_invest_scales_with_balance() {
        let mut a = ParametricAccountant {
            min_frac: 0.0,
            max_frac: 0.2,
            bankroll: Bankroll::new(100.0),
            ..ParametricAccountant::default()
        };
        assert_eq!(a.invest(0.5, true).unwrap(), 10.0);
        assert_eq!(a.balance(), 100.0);
        a.set_balance(50.0);
        assert_eq!(a.invest(1.0, false).unwrap(), 10.0);
        assert_eq!(a.balance(), 40.0);
    }

    #[test]
    fn test_invest_rejects_bad_expediency() {
        let mut a = flat(100.0, 0.1);
        assert!(matches!(a.invest(1.5, true), Err(EngineError::Configuration(_))));
        assert!(matches!(a.invest(f64::NAN, true), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_credit_requires_min_investment() {
        let a = ParametricAccountant { credit: 10.0, ..ParametricAccountant::default() };
        assert!(matches!(a.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_clamp_and_fallback() {
        let mut a = ParametricAccountant {
            min_frac: 0.5,
            max_frac: 0.5,
            min_investment: 2.0,
            max_investment: Some(30.0),
            bankroll: Bankroll::new(100.0),
            ..ParametricAccountant::default()
        };
        assert_eq!(a.invest(0.0, true).unwrap(), 30.0);
        a.set_balance(1.0);
        // 0.5 is raised to the minimum, which the balance cannot cover.
        assert_eq!(a.invest(0.0, true).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_balance_uses_credit() {
        let mut a = ParametricAccountant {
            min_investment: 5.0,
            credit: 10.0,
            bankroll: Bankroll::new(100.0),
            ..ParametricAccountant::default()
        };
        a.set_balance(-4.0);
        assert_eq!(a.invest(1.0, false).unwrap(), 5.0);
        assert_eq!(a.balance(), -9.0);
        assert_eq!(a.invest(1.0, false).unwrap(), 0.0);
    }

    #[test]
    fn test_inc_balance_rejects_negative() {
        let mut a = flat(100.0, 0.1);
        assert!(a.inc_balance(-1.0).is_err());
    }

    #[test]
    fn test_fit_resets_balance() {
        let mut a = flat(100.0, 0.1);
        a.set_balance(3.0);
        a.fit(&Table::default()).unwrap();
        assert_eq!(a.balance(), 100.0);
    }

    #[test]
    fn test_invest_serial_compounds() {
        let t = home_bets(&[record("m1", 0, 1, 0), record("m2", 1, 0, 1), record("m3", 2, -1, -1)]);
        let mut a = flat(100.0, 0.1);
        let out = a.invest_serial(&t).unwrap();
        assert_eq!(out.floats("investment").unwrap(), &[10.0, 11.0, 9.9]);
        let profit = out.floats("profit").unwrap();
        assert_eq!(&profit[..2], &[10.0, -11.0]);
        assert!(profit[2].is_nan());
        let balance = out.floats("balance").unwrap();
        assert_eq!(&balance[..2], &[110.0, 99.0]);
        assert!((balance[2] - 99.0).abs() < 1e-9);
        assert!((a.balance() - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_invest_serial_skips_abstentions() {
        let mut t = home_bets(&[record("m1", 0, 1, 0)]);
        t.set_namespaced("bet", "outcome", ColumnData::Text(vec![Some("0".into())])).unwrap();
        t.set_namespaced("bet", "expediency", ColumnData::Float(vec![f64::NAN])).unwrap();
        let mut a = flat(100.0, 0.1);
        a.invest_serial_inplace(&mut t).unwrap();
        assert_eq!(t.floats("accounting.investment").unwrap(), &[0.0]);
        assert_eq!(t.floats("accounting.balance").unwrap(), &[100.0]);
    }

    #[test]
    fn test_invest_parallel_restores_balance() {
        let mut t = home_bets(&[record("m1", 0, 1, 0), record("m2", 1, 0, 1)]);
        t.set_namespaced("bet", "expediency", ColumnData::Float(vec![0.5, f64::NAN])).unwrap();
        let mut a = flat(100.0, 0.1);
        a.set_balance(80.0);
        a.invest_parallel_inplace(&mut t).unwrap();
        let investment = t.floats("accounting.investment").unwrap();
        assert_eq!(investment[0], 8.0);
        assert!(investment[1].is_nan());
        assert_eq!(a.balance(), 80.0);
    }

    #[test]
    fn test_invest_parallel_restores_on_error() {
        let mut t = home_bets(&[record("m1", 0, 1, 0), record("m2", 1, 0, 1)]);
        t.set_namespaced("bet", "expediency", ColumnData::Float(vec![0.5, 2.0])).unwrap();
        let mut a = flat(100.0, 0.1);
        assert!(a.invest_parallel(&t).is_err());
        assert_eq!(a.balance(), 100.0);
    }
}

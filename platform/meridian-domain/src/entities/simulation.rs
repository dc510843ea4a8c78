use crate::errors::BacktestError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimum tradeable increment for buys. Sells are not lot-constrained.
pub const LOT_SIZE: u32 = 100;

/// Maximum gap between the raw close-to-close return and the reported
/// `Percentage` before a day is treated as an ex-dividend/ex-rights event.
pub const CORPORATE_ACTION_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub initial_capital: f64,
    /// Per-share price adjustment applied against the trader.
    pub slippage: f64,
    /// Fraction of sale proceeds charged when a sell realises a result above
    /// the profit baseline.
    pub commission_rate: f64,
    pub lot_size: u32,
    pub corporate_action_tolerance: f64,
}

impl SimulationParameters {
    pub fn new(initial_capital: f64, slippage: f64, commission_rate: f64) -> Self {
        Self {
            initial_capital,
            slippage,
            commission_rate,
            lot_size: LOT_SIZE,
            corporate_action_tolerance: CORPORATE_ACTION_TOLERANCE,
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::InvalidParameters(format!(
                "initial_capital must be finite and > 0 (got {})",
                self.initial_capital
            )));
        }
        if !self.slippage.is_finite() || self.slippage < 0.0 {
            return Err(BacktestError::InvalidParameters(format!(
                "slippage must be finite and >= 0 (got {})",
                self.slippage
            )));
        }
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            return Err(BacktestError::InvalidParameters(format!(
                "commission_rate must be finite and >= 0 (got {})",
                self.commission_rate
            )));
        }
        if self.lot_size == 0 {
            return Err(BacktestError::InvalidParameters(
                "lot_size must be >= 1".to_string(),
            ));
        }
        if !self.corporate_action_tolerance.is_finite() || self.corporate_action_tolerance < 0.0 {
            return Err(BacktestError::InvalidParameters(format!(
                "corporate_action_tolerance must be finite and >= 0 (got {})",
                self.corporate_action_tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ZeroEquity,
    NonFiniteEquity,
}

/// Numeric trouble on a single day. The run continues; callers decide how
/// loudly to surface it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationWarning {
    pub day: usize,
    pub date: Option<NaiveDate>,
    pub kind: WarningKind,
    pub equity: f64,
}

impl std::fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            WarningKind::ZeroEquity => "equity is zero, actual position undefined",
            WarningKind::NonFiniteEquity => "equity is not finite",
        };
        match self.date {
            Some(date) => write!(f, "day {} ({date}): {what}", self.day),
            None => write!(f, "day {}: {what}", self.day),
        }
    }
}

use crate::errors::BacktestError;
use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub trading_days_per_year: f64,
    /// Annual rate; converted to a per-day rate and subtracted from daily
    /// returns before the Sharpe ratio.
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.trading_days_per_year.is_finite() || self.trading_days_per_year <= 0.0 {
            return Err(BacktestError::InvalidParameters(format!(
                "trading_days_per_year must be finite and > 0 (got {})",
                self.trading_days_per_year
            )));
        }
        if !self.risk_free_rate.is_finite() || self.risk_free_rate <= -1.0 {
            return Err(BacktestError::InvalidParameters(format!(
                "risk_free_rate must be finite and > -1 (got {})",
                self.risk_free_rate
            )));
        }
        Ok(())
    }

    pub fn periodic_risk_free_rate(&self) -> f64 {
        if self.risk_free_rate == 0.0 {
            return 0.0;
        }
        (1.0 + self.risk_free_rate).powf(1.0 / self.trading_days_per_year) - 1.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub days: usize,
    pub initial_equity: f64,
    pub final_equity: f64,
    pub annual_return: f64,
    pub sharpe_ratio: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
}

use crate::entities::metrics::{MetricsConfig, PerformanceSummary};
use crate::errors::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub summary: PerformanceSummary,
    pub daily_returns: Vec<f64>,
    /// Aligned with the equity series: `equity[i] / max(equity[..=i]) - 1`.
    pub drawdown: Vec<f64>,
}

/// `(last / first) ^ (N / days) - 1`, where `days` counts every row of the
/// equity series including the seed day.
pub fn annual_return(equity: &[f64], config: &MetricsConfig) -> Result<f64, BacktestError> {
    if equity.len() < 2 {
        return Err(BacktestError::InvalidInput(format!(
            "equity series needs at least 2 points, got {}",
            equity.len()
        )));
    }
    let first = equity[0];
    let last = equity[equity.len() - 1];
    if first == 0.0 || !first.is_finite() {
        return Err(BacktestError::InvalidInput(format!(
            "annual return is undefined for starting equity {first}"
        )));
    }
    Ok((last / first).powf(config.trading_days_per_year / equity.len() as f64) - 1.0)
}

/// Percentage change of consecutive equity points. The undefined first entry
/// is never produced and NaN changes are dropped.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .filter(|ret| !ret.is_nan())
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); NaN below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let avg = mean(values);
    let var = values
        .iter()
        .map(|value| {
            let diff = value - avg;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    var.sqrt()
}

/// Annualised Sharpe ratio. Zero or undefined dispersion yields exactly 0.
pub fn sharpe_ratio(returns: &[f64], config: &MetricsConfig) -> f64 {
    let rf = config.periodic_risk_free_rate();
    let excess: Vec<f64> = returns.iter().map(|ret| ret - rf).collect();
    let std = sample_std(&excess);
    if !std.is_finite() || std <= 0.0 {
        return 0.0;
    }
    mean(&excess) / std * config.trading_days_per_year.sqrt()
}

/// Annualised volatility; 0 when fewer than two returns exist.
///
/// A single return has no sample deviation. This reports 0 for it rather
/// than the NaN a pandas `std()` would give.
pub fn volatility(returns: &[f64], config: &MetricsConfig) -> f64 {
    let std = sample_std(returns);
    if std.is_nan() {
        return 0.0;
    }
    std * config.trading_days_per_year.sqrt()
}

/// Running-peak drawdown. NaN equity points do not move the peak.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NAN;
    equity
        .iter()
        .map(|&value| {
            if !value.is_nan() && (peak.is_nan() || value > peak) {
                peak = value;
            }
            value / peak - 1.0
        })
        .collect()
}

pub fn max_drawdown(equity: &[f64]) -> (f64, Vec<f64>) {
    let drawdown = drawdown_series(equity);
    let worst = drawdown
        .iter()
        .copied()
        .filter(|dd| !dd.is_nan())
        .fold(None, |acc: Option<f64>, dd| {
            Some(acc.map_or(dd, |current| current.min(dd)))
        })
        .unwrap_or(0.0);
    (worst, drawdown)
}

pub fn analyze_equity(
    equity: &[f64],
    config: &MetricsConfig,
) -> Result<PerformanceReport, BacktestError> {
    config.validate()?;
    let annual = annual_return(equity, config)?;
    let returns = daily_returns(equity);
    let sharpe = sharpe_ratio(&returns, config);
    let vol = volatility(&returns, config);
    let (worst, drawdown) = max_drawdown(equity);

    Ok(PerformanceReport {
        summary: PerformanceSummary {
            days: equity.len(),
            initial_equity: equity[0],
            final_equity: equity[equity.len() - 1],
            annual_return: annual,
            sharpe_ratio: sharpe,
            volatility: vol,
            max_drawdown: worst,
        },
        daily_returns: returns,
        drawdown,
    })
}

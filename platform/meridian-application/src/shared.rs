use crate::config::Config;
use meridian_domain::entities::metrics::{MetricsConfig, TRADING_DAYS_PER_YEAR};
use meridian_domain::entities::simulation::{
    SimulationParameters, CORPORATE_ACTION_TOLERANCE, LOT_SIZE,
};
use meridian_domain::value_objects::daily_bar::DailyBar;

pub const DEFAULT_DRAWDOWN_TOP_N: usize = 5;

pub fn build_simulation_parameters(config: &Config) -> SimulationParameters {
    let engine = config.engine.as_ref();
    SimulationParameters {
        initial_capital: config.run.initial_capital,
        slippage: config.costs.slippage,
        commission_rate: config.costs.commission_rate,
        lot_size: engine.and_then(|e| e.lot_size).unwrap_or(LOT_SIZE),
        corporate_action_tolerance: engine
            .and_then(|e| e.corporate_action_tolerance)
            .unwrap_or(CORPORATE_ACTION_TOLERANCE),
    }
}

pub fn build_metrics_config(config: &Config) -> MetricsConfig {
    let metrics = config.metrics.as_ref();
    MetricsConfig {
        trading_days_per_year: metrics
            .and_then(|m| m.trading_days_per_year)
            .unwrap_or(TRADING_DAYS_PER_YEAR),
        risk_free_rate: metrics.and_then(|m| m.risk_free_rate).unwrap_or(0.0),
    }
}

pub fn corporate_action_tolerance(config: &Config) -> f64 {
    config
        .engine
        .as_ref()
        .and_then(|e| e.corporate_action_tolerance)
        .unwrap_or(CORPORATE_ACTION_TOLERANCE)
}

pub fn analyzers_enabled(config: &Config) -> bool {
    config
        .report
        .as_ref()
        .and_then(|report| report.analyzers)
        .unwrap_or(true)
}

pub fn drawdown_top_n(config: &Config) -> usize {
    config
        .report
        .as_ref()
        .and_then(|report| report.drawdown_top_n)
        .unwrap_or(DEFAULT_DRAWDOWN_TOP_N)
}

pub fn summary_meta_json(
    config: &Config,
    bars: &[DailyBar],
    warnings: usize,
) -> serde_json::Value {
    serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": config.run.symbol,
        "start": bars.first().and_then(|bar| bar.date),
        "end": bars.last().and_then(|bar| bar.date),
        "rows": bars.len(),
        "warnings": warnings,
    })
}

pub fn config_snapshot_json(
    params: &SimulationParameters,
    metrics: &MetricsConfig,
) -> serde_json::Value {
    serde_json::json!({
        "simulation": {
            "initial_capital": params.initial_capital,
            "slippage": params.slippage,
            "commission_rate": params.commission_rate,
            "lot_size": params.lot_size,
            "corporate_action_tolerance": params.corporate_action_tolerance,
        },
        "metrics": {
            "trading_days_per_year": metrics.trading_days_per_year,
            "risk_free_rate": metrics.risk_free_rate,
        },
    })
}

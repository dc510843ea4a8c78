use crate::entities::metrics::{MetricsConfig, PerformanceSummary};
use crate::entities::simulation::{SimulationParameters, SimulationWarning};
use crate::errors::BacktestError;
use crate::services::analyzers::performance::analyze_equity;
use crate::services::audit::AuditEvent;
use crate::services::engine::simulator::Simulator;
use crate::value_objects::daily_bar::DailyBar;
use crate::value_objects::daily_state::DailyState;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct BacktestResults {
    pub states: Vec<DailyState>,
    pub daily_returns: Vec<f64>,
    /// Aligned with `states`.
    pub drawdown: Vec<f64>,
    pub summary: PerformanceSummary,
    pub warnings: Vec<SimulationWarning>,
    pub audit_events: Vec<AuditEvent>,
}

impl BacktestResults {
    pub fn equity(&self) -> Vec<f64> {
        self.states.iter().map(|state| state.equity).collect()
    }
}

/// Runs the simulator to completion, then hands the finished equity column
/// to the performance analyzer.
#[derive(Debug, Clone)]
pub struct BacktestRunner {
    run_id: String,
    params: SimulationParameters,
    metrics_config: MetricsConfig,
}

impl BacktestRunner {
    pub fn new(run_id: String, params: SimulationParameters, metrics_config: MetricsConfig) -> Self {
        Self {
            run_id,
            params,
            metrics_config,
        }
    }

    pub fn run(&self, bars: &[DailyBar]) -> Result<BacktestResults, BacktestError> {
        self.metrics_config.validate()?;

        let simulation = Simulator::new(self.params)?
            .with_run_id(self.run_id.clone())
            .run(bars)?;

        let equity: Vec<f64> = simulation.states.iter().map(|state| state.equity).collect();
        let report = analyze_equity(&equity, &self.metrics_config)?;

        let mut audit_events = simulation.audit_events;
        audit_events.push(AuditEvent {
            run_id: self.run_id.clone(),
            day: equity.len() - 1,
            date: bars.last().and_then(|bar| bar.date),
            stage: "analyzer".to_string(),
            action: "complete".to_string(),
            error: None,
            details: json!({
                "annual_return": report.summary.annual_return,
                "sharpe_ratio": report.summary.sharpe_ratio,
                "volatility": report.summary.volatility,
                "max_drawdown": report.summary.max_drawdown,
            }),
        });

        Ok(BacktestResults {
            states: simulation.states,
            daily_returns: report.daily_returns,
            drawdown: report.drawdown,
            summary: report.summary,
            warnings: simulation.warnings,
            audit_events,
        })
    }
}

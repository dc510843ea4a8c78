use crate::entities::simulation::{SimulationParameters, SimulationWarning, WarningKind};
use crate::errors::BacktestError;
use crate::services::audit::AuditEvent;
use crate::services::bar_table::validate_bars;
use crate::services::engine::corporate_action::{adjust_holdings, CorporateAction};
use crate::services::engine::rebalance::{RebalanceOutcome, RebalanceRequest, Rebalancer};
use crate::value_objects::daily_bar::DailyBar;
use crate::value_objects::daily_state::DailyState;
use crate::value_objects::rebalance_branch::RebalanceBranch;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// One state per input bar, index-aligned with the input.
    pub states: Vec<DailyState>,
    pub warnings: Vec<SimulationWarning>,
    pub audit_events: Vec<AuditEvent>,
    pub final_profit_baseline: f64,
}

/// Left-to-right fold over the input table. Day `i` reads only day `i - 1`'s
/// finished state and day `i`'s bar; nothing is mutated in place.
#[derive(Debug)]
pub struct Simulator {
    run_id: String,
    params: SimulationParameters,
    rebalancer: Rebalancer,
    warnings: Vec<SimulationWarning>,
    audit_events: Vec<AuditEvent>,
}

pub fn simulate(
    bars: &[DailyBar],
    params: &SimulationParameters,
) -> Result<SimulationRun, BacktestError> {
    Simulator::new(*params)?.run(bars)
}

impl Simulator {
    pub fn new(params: SimulationParameters) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self {
            run_id: "adhoc".to_string(),
            params,
            rebalancer: Rebalancer::new(&params),
            warnings: Vec::new(),
            audit_events: Vec::new(),
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run(mut self, bars: &[DailyBar]) -> Result<SimulationRun, BacktestError> {
        validate_bars(bars)?;

        self.push_event(
            0,
            bars[0].date,
            "engine",
            "start",
            json!({
                "days": bars.len(),
                "initial_capital": self.params.initial_capital,
                "slippage": self.params.slippage,
                "commission_rate": self.params.commission_rate,
                "lot_size": self.params.lot_size,
                "corporate_action_tolerance": self.params.corporate_action_tolerance,
            }),
        );

        let mut states = Vec::with_capacity(bars.len());
        states.push(DailyState::seed(self.params.initial_capital));
        for day in 1..bars.len() {
            let prev = states[day - 1];
            let next = self.step(day, &prev, &bars[day - 1], &bars[day]);
            states.push(next);
        }

        let last = states[states.len() - 1];
        self.push_event(
            states.len() - 1,
            bars[bars.len() - 1].date,
            "engine",
            "complete",
            json!({
                "final_equity": last.equity,
                "final_cash": last.cash,
                "final_held_shares": last.held_shares,
                "warnings": self.warnings.len(),
            }),
        );

        Ok(SimulationRun {
            states,
            warnings: self.warnings,
            audit_events: self.audit_events,
            final_profit_baseline: self.rebalancer.profit_baseline(),
        })
    }

    /// Corporate-action restatement, then rebalance, then mark to close.
    pub fn step(
        &mut self,
        day: usize,
        prev: &DailyState,
        prev_bar: &DailyBar,
        bar: &DailyBar,
    ) -> DailyState {
        let adjustment = adjust_holdings(
            prev,
            prev_bar.close,
            bar,
            self.params.corporate_action_tolerance,
        );
        if let Some(action) = adjustment.event {
            self.record_corporate_action(day, bar, &action);
        }

        let outcome = self.rebalancer.rebalance(&RebalanceRequest {
            prev_target: prev_bar.target_position,
            target: bar.target_position,
            open: bar.open,
            close: bar.close,
            prev_equity: prev.equity,
            prev_cash: prev.cash,
            held_shares: adjustment.held_shares,
        });
        self.record_trade(day, bar, &outcome);

        let state = DailyState::mark_to_close(
            outcome.held_shares,
            outcome.cash,
            bar.close,
            outcome.fees,
            outcome.branch,
            adjustment.event.is_some(),
            outcome.traded_shares,
        );
        self.check_equity(day, bar, &state);
        state
    }

    fn record_corporate_action(&mut self, day: usize, bar: &DailyBar, action: &CorporateAction) {
        self.push_event(
            day,
            bar.date,
            "corporate_action",
            "restate_holding",
            json!({
                "naive_return": action.naive_return,
                "reported_return": action.reported_return,
                "reference_price": action.reference_price,
                "shares_before": action.shares_before,
                "shares_after": action.shares_after,
            }),
        );
    }

    fn record_trade(&mut self, day: usize, bar: &DailyBar, outcome: &RebalanceOutcome) {
        let (action, price) = match outcome.branch {
            RebalanceBranch::NoRebalance => return,
            RebalanceBranch::Buy => ("buy", bar.open + self.params.slippage),
            RebalanceBranch::Sell => ("sell", bar.open - self.params.slippage),
        };
        self.push_event(
            day,
            bar.date,
            "trade",
            action,
            json!({
                "shares": outcome.traded_shares.abs(),
                "price": price,
                "theoretical_shares": outcome.theoretical_shares,
                "held_shares": outcome.held_shares,
                "cash": outcome.cash,
                "fees": outcome.fees,
                "commission_charged": outcome.commission_charged,
                "profit_baseline": self.rebalancer.profit_baseline(),
            }),
        );
    }

    fn check_equity(&mut self, day: usize, bar: &DailyBar, state: &DailyState) {
        let kind = if state.equity == 0.0 {
            WarningKind::ZeroEquity
        } else if !state.equity.is_finite() {
            WarningKind::NonFiniteEquity
        } else {
            return;
        };
        let warning = SimulationWarning {
            day,
            date: bar.date,
            kind,
            equity: state.equity,
        };
        self.audit_events.push(AuditEvent {
            run_id: self.run_id.clone(),
            day,
            date: bar.date,
            stage: "engine".to_string(),
            action: "warning".to_string(),
            error: Some(warning.to_string()),
            details: json!({ "kind": kind, "cash": state.cash, "stock_value": state.stock_value }),
        });
        self.warnings.push(warning);
    }

    fn push_event(
        &mut self,
        day: usize,
        date: Option<chrono::NaiveDate>,
        stage: &str,
        action: &str,
        details: serde_json::Value,
    ) {
        self.audit_events.push(AuditEvent {
            run_id: self.run_id.clone(),
            day,
            date,
            stage: stage.to_string(),
            action: action.to_string(),
            error: None,
            details,
        });
    }
}

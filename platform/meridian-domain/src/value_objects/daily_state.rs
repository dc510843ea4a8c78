use crate::value_objects::rebalance_branch::RebalanceBranch;
use serde::Serialize;

/// End-of-day portfolio record. `equity` is always computed last as
/// `cash + stock_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyState {
    pub held_shares: f64,
    pub stock_value: f64,
    pub cash: f64,
    pub equity: f64,
    pub actual_position: f64,
    pub fees: f64,
    /// `None` on the seed day.
    pub branch: Option<RebalanceBranch>,
    pub corporate_action: bool,
    /// Signed share delta traded that day (positive buys, negative sells).
    pub traded_shares: f64,
}

impl DailyState {
    pub fn seed(initial_capital: f64) -> Self {
        Self {
            held_shares: 0.0,
            stock_value: 0.0,
            cash: initial_capital,
            equity: initial_capital,
            actual_position: 0.0,
            fees: 0.0,
            branch: None,
            corporate_action: false,
            traded_shares: 0.0,
        }
    }

    /// Values the holdings at `close` and derives equity and the realised
    /// position. A zero equity yields a NaN position instead of an infinity.
    pub fn mark_to_close(
        held_shares: f64,
        cash: f64,
        close: f64,
        fees: f64,
        branch: RebalanceBranch,
        corporate_action: bool,
        traded_shares: f64,
    ) -> Self {
        let stock_value = held_shares * close;
        let equity = cash + stock_value;
        let actual_position = if equity == 0.0 {
            f64::NAN
        } else {
            stock_value / equity
        };
        Self {
            held_shares,
            stock_value,
            cash,
            equity,
            actual_position,
            fees,
            branch: Some(branch),
            corporate_action,
            traded_shares,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DailyState;
    use crate::value_objects::rebalance_branch::RebalanceBranch;

    #[test]
    fn seed_holds_only_cash() {
        let state = DailyState::seed(100_000.0);
        assert_eq!(state.held_shares, 0.0);
        assert_eq!(state.stock_value, 0.0);
        assert_eq!(state.actual_position, 0.0);
        assert_eq!(state.cash, 100_000.0);
        assert_eq!(state.equity, 100_000.0);
        assert!(state.branch.is_none());
    }

    #[test]
    fn mark_to_close_keeps_equity_identity() {
        let state = DailyState::mark_to_close(
            300.0,
            1234.5,
            10.25,
            0.0,
            RebalanceBranch::Buy,
            false,
            300.0,
        );
        assert_eq!(state.stock_value, 300.0 * 10.25);
        assert_eq!(state.equity, state.cash + state.stock_value);
        assert!(state.actual_position > 0.0 && state.actual_position < 1.0);
    }

    #[test]
    fn mark_to_close_zero_equity_is_nan_position() {
        let state = DailyState::mark_to_close(
            0.0,
            0.0,
            10.0,
            0.0,
            RebalanceBranch::NoRebalance,
            false,
            0.0,
        );
        assert_eq!(state.equity, 0.0);
        assert!(state.actual_position.is_nan());
    }
}

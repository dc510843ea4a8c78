use crate::value_objects::daily_bar::DailyBar;
use crate::value_objects::daily_state::DailyState;

/// An ex-dividend/ex-rights restatement of yesterday's holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorporateAction {
    pub naive_return: f64,
    pub reported_return: f64,
    /// Yesterday's close expressed in today's adjusted terms.
    pub reference_price: f64,
    pub shares_before: f64,
    pub shares_after: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingAdjustment {
    /// Holding fed to the rebalancer.
    pub held_shares: f64,
    pub event: Option<CorporateAction>,
}

pub fn is_corporate_action(naive_return: f64, reported_return: f64, tolerance: f64) -> bool {
    (naive_return - reported_return).abs() > tolerance
}

/// Restates yesterday's holding in today's adjusted-price terms when the raw
/// close-to-close return disagrees with the reported `Percentage` by more
/// than `tolerance`. Share counts are truncated toward zero.
pub fn adjust_holdings(
    prev: &DailyState,
    prev_close: f64,
    bar: &DailyBar,
    tolerance: f64,
) -> HoldingAdjustment {
    let naive_return = bar.naive_return(prev_close);
    if !is_corporate_action(naive_return, bar.percentage, tolerance) {
        return HoldingAdjustment {
            held_shares: prev.held_shares,
            event: None,
        };
    }

    let reference_price = bar.close / (bar.percentage + 1.0);
    let shares_after = (prev.stock_value / reference_price).trunc();
    HoldingAdjustment {
        held_shares: shares_after,
        event: Some(CorporateAction {
            naive_return,
            reported_return: bar.percentage,
            reference_price,
            shares_before: prev.held_shares,
            shares_after,
        }),
    }
}

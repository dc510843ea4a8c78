use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceBranch {
    NoRebalance,
    Buy,
    Sell,
}

impl RebalanceBranch {
    pub fn label(self) -> &'static str {
        match self {
            RebalanceBranch::NoRebalance => "no_rebalance",
            RebalanceBranch::Buy => "buy",
            RebalanceBranch::Sell => "sell",
        }
    }
}

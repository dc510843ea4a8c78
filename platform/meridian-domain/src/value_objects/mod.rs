pub mod daily_bar;
pub mod daily_state;
pub mod rebalance_branch;

pub mod backtest;
pub mod corporate_action;
pub mod rebalance;
pub mod simulator;

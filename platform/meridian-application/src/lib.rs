pub mod backtesting;
pub mod config;
pub mod experiments;
mod shared;
pub mod validation;

pub mod analyzers;
pub mod audit;
pub mod bar_table;
pub mod engine;

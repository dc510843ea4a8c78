pub mod artifacts;
pub mod bar_table;

pub mod bar_table;

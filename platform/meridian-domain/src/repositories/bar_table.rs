use crate::services::bar_table::TableQualityReport;
use crate::value_objects::daily_bar::DailyBar;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BarTableQuery {
    pub path: PathBuf,
    pub corporate_action_tolerance: f64,
}

pub trait BarTableRepository {
    fn load_bars(&self, query: &BarTableQuery) -> Result<(Vec<DailyBar>, TableQualityReport), String>;
}

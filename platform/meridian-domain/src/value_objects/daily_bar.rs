use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of input: prices, the reported return (which already
/// reflects dividends and rights issues) and the target fraction of equity
/// to hold in the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub close: f64,
    pub percentage: f64,
    pub target_position: f64,
}

impl DailyBar {
    pub fn new(open: f64, close: f64, percentage: f64, target_position: f64) -> Self {
        Self {
            date: None,
            open,
            close,
            percentage,
            target_position,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn naive_return(&self, prev_close: f64) -> f64 {
        self.close / prev_close - 1.0
    }
}

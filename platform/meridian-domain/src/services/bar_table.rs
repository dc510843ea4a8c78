use crate::errors::BacktestError;
use crate::services::engine::corporate_action::is_corporate_action;
use crate::value_objects::daily_bar::DailyBar;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableQualityReport {
    pub rows: usize,
    pub invalid_price: usize,
    pub missing_target: usize,
    pub negative_target: usize,
    pub missing_percentage: usize,
    pub duplicate_dates: usize,
    pub out_of_order_dates: usize,
    pub target_changes: usize,
    pub corporate_action_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub first_invalid_row: Option<usize>,
}

impl TableQualityReport {
    pub fn has_blocking_issues(&self) -> bool {
        self.rows < 2
            || self.invalid_price > 0
            || self.missing_target > 0
            || self.negative_target > 0
            || self.missing_percentage > 0
            || self.duplicate_dates > 0
            || self.out_of_order_dates > 0
    }
}

/// Rejects tables the simulator cannot walk. Row 0's `Percentage` is never
/// consumed, so it is allowed to be missing.
pub fn validate_bars(bars: &[DailyBar]) -> Result<(), BacktestError> {
    if bars.len() < 2 {
        return Err(BacktestError::InvalidInput(format!(
            "need at least 2 rows, got {}",
            bars.len()
        )));
    }

    let mut last_date: Option<NaiveDate> = None;
    for (row, bar) in bars.iter().enumerate() {
        if !bar.open.is_finite() || bar.open <= 0.0 {
            return Err(BacktestError::InvalidInput(format!(
                "row {row}: Open must be finite and > 0 (got {})",
                bar.open
            )));
        }
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(BacktestError::InvalidInput(format!(
                "row {row}: Close must be finite and > 0 (got {})",
                bar.close
            )));
        }
        if !bar.target_position.is_finite() {
            return Err(BacktestError::InvalidInput(format!(
                "row {row}: pos is missing or not a number"
            )));
        }
        // Long-only book: there is no short branch to route a negative target to.
        if bar.target_position < 0.0 {
            return Err(BacktestError::InvalidInput(format!(
                "row {row}: pos must be >= 0 (got {})",
                bar.target_position
            )));
        }
        if row > 0 {
            if !bar.percentage.is_finite() {
                return Err(BacktestError::InvalidInput(format!(
                    "row {row}: Percentage is missing or not a number"
                )));
            }
            if bar.percentage <= -1.0 {
                return Err(BacktestError::InvalidInput(format!(
                    "row {row}: Percentage must be > -1 (got {})",
                    bar.percentage
                )));
            }
        }
        if let Some(date) = bar.date {
            if let Some(prev) = last_date {
                if date <= prev {
                    return Err(BacktestError::InvalidInput(format!(
                        "row {row}: dates must be strictly increasing ({date} after {prev})"
                    )));
                }
            }
            last_date = Some(date);
        }
    }

    Ok(())
}

pub fn table_quality_from_bars(bars: &[DailyBar], tolerance: f64) -> TableQualityReport {
    let mut report = TableQualityReport {
        rows: bars.len(),
        ..TableQualityReport::default()
    };

    let mut last_date: Option<NaiveDate> = None;
    for (row, bar) in bars.iter().enumerate() {
        let mut invalid = false;
        if !bar.open.is_finite() || bar.open <= 0.0 || !bar.close.is_finite() || bar.close <= 0.0
        {
            report.invalid_price += 1;
            invalid = true;
        }
        if !bar.target_position.is_finite() {
            report.missing_target += 1;
            invalid = true;
        } else if bar.target_position < 0.0 {
            report.negative_target += 1;
            invalid = true;
        }
        if row > 0 && !bar.percentage.is_finite() {
            report.missing_percentage += 1;
            invalid = true;
        }
        if invalid && report.first_invalid_row.is_none() {
            report.first_invalid_row = Some(row);
        }

        if let Some(date) = bar.date {
            if report.first_date.is_none() {
                report.first_date = Some(date);
            }
            if let Some(prev) = last_date {
                if date == prev {
                    report.duplicate_dates += 1;
                } else if date < prev {
                    report.out_of_order_dates += 1;
                }
            }
            last_date = Some(date);
            report.last_date = Some(date);
        }
    }

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        if bar.target_position != prev.target_position {
            report.target_changes += 1;
        }
        if prev.close > 0.0
            && bar.percentage.is_finite()
            && is_corporate_action(bar.naive_return(prev.close), bar.percentage, tolerance)
        {
            report.corporate_action_days += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{table_quality_from_bars, validate_bars};
    use crate::entities::simulation::CORPORATE_ACTION_TOLERANCE;
    use crate::errors::BacktestError;
    use crate::value_objects::daily_bar::DailyBar;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    #[test]
    fn validate_requires_two_rows() {
        let err = validate_bars(&[DailyBar::new(10.0, 10.0, 0.0, 0.0)]).expect_err("one row");
        assert!(matches!(err, BacktestError::InvalidInput(_)));
        assert!(validate_bars(&[]).is_err());
    }

    #[test]
    fn validate_rejects_non_positive_prices() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, 0.0),
            DailyBar::new(0.0, 10.0, 0.0, 1.0),
        ];
        assert!(validate_bars(&bars).is_err());

        let bars = vec![
            DailyBar::new(10.0, -1.0, 0.0, 0.0),
            DailyBar::new(10.0, 10.0, 0.0, 1.0),
        ];
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn validate_rejects_missing_target_on_any_row() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, f64::NAN),
            DailyBar::new(10.0, 10.0, 0.0, 1.0),
        ];
        let err = validate_bars(&bars).expect_err("nan pos");
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn validate_ignores_first_row_percentage() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, f64::NAN, 0.0),
            DailyBar::new(10.0, 10.0, 0.0, 1.0),
        ];
        assert!(validate_bars(&bars).is_ok());

        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, 0.0),
            DailyBar::new(10.0, 10.0, f64::NAN, 1.0),
        ];
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn validate_rejects_negative_target() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, 0.0),
            DailyBar::new(10.0, 10.0, 0.0, -0.5),
        ];
        let err = validate_bars(&bars).expect_err("short target");
        assert!(matches!(err, BacktestError::InvalidInput(_)));
        assert!(err.to_string().contains("row 1: pos must be >= 0"));

        let report = table_quality_from_bars(&bars, CORPORATE_ACTION_TOLERANCE);
        assert_eq!(report.negative_target, 1);
        assert_eq!(report.first_invalid_row, Some(1));
        assert!(report.has_blocking_issues());
    }

    #[test]
    fn validate_rejects_total_loss_percentage() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, 0.0),
            DailyBar::new(10.0, 10.0, -1.0, 1.0),
        ];
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn validate_rejects_unordered_dates() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, 0.0).with_date(day(3)),
            DailyBar::new(10.0, 10.0, 0.0, 1.0).with_date(day(2)),
        ];
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn quality_report_counts_issues() {
        let bars = vec![
            DailyBar::new(10.0, 10.0, 0.0, 0.0).with_date(day(2)),
            DailyBar::new(10.0, 10.0, 0.0, 1.0).with_date(day(2)),
            DailyBar::new(10.0, 9.0, 0.05, 1.0).with_date(day(1)),
            DailyBar::new(-1.0, 9.0, f64::NAN, f64::NAN).with_date(day(4)),
        ];
        let report = table_quality_from_bars(&bars, CORPORATE_ACTION_TOLERANCE);
        assert_eq!(report.rows, 4);
        assert_eq!(report.duplicate_dates, 1);
        assert_eq!(report.out_of_order_dates, 1);
        assert_eq!(report.invalid_price, 1);
        assert_eq!(report.missing_target, 1);
        assert_eq!(report.negative_target, 0);
        assert_eq!(report.missing_percentage, 1);
        assert_eq!(report.first_invalid_row, Some(3));
        assert_eq!(report.target_changes, 2);
        assert_eq!(report.corporate_action_days, 1);
        assert!(report.has_blocking_issues());
    }
}

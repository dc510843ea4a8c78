use chrono::NaiveDate;
use meridian_domain::repositories::bar_table::{BarTableQuery, BarTableRepository};
use meridian_domain::services::bar_table::{table_quality_from_bars, TableQualityReport};
use meridian_domain::value_objects::daily_bar::DailyBar;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

/// One row of the daily input table. Extra columns (High, Low, Volume, an
/// index column) are ignored; empty numeric cells become NaN so the quality
/// report can count them instead of failing the whole load.
#[derive(Debug, Deserialize)]
pub struct DailyBarRecord {
    #[serde(rename = "Date", alias = "date", default)]
    pub date: Option<String>,
    #[serde(rename = "Open", alias = "open")]
    pub open: Option<f64>,
    #[serde(rename = "Close", alias = "close")]
    pub close: Option<f64>,
    #[serde(rename = "Percentage", alias = "percentage")]
    pub percentage: Option<f64>,
    #[serde(rename = "pos", alias = "Pos", alias = "position")]
    pub pos: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvBarTableRepository;

impl CsvBarTableRepository {
    pub fn new() -> Self {
        Self
    }
}

impl BarTableRepository for CsvBarTableRepository {
    fn load_bars(
        &self,
        query: &BarTableQuery,
    ) -> Result<(Vec<DailyBar>, TableQualityReport), String> {
        let start = Instant::now();
        let result = load_csv(&query.path, query.corporate_action_tolerance);
        let result_label = if result.is_ok() { "ok" } else { "err" };
        metrics::histogram!("meridian.infra.bar_table.load_ms", "result" => result_label)
            .record(start.elapsed().as_millis() as f64);
        result
    }
}

pub fn load_csv(
    path: &Path,
    corporate_action_tolerance: f64,
) -> Result<(Vec<DailyBar>, TableQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open input table {}: {}", path.display(), err))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut bars = Vec::new();
    for (row, result) in reader.deserialize::<DailyBarRecord>().enumerate() {
        let record = result.map_err(|err| format!("failed to parse input row {row}: {err}"))?;
        let date = match record.date.as_deref().filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(parse_date(raw).map_err(|err| format!("row {row}: {err}"))?),
            None => None,
        };
        bars.push(DailyBar {
            date,
            open: record.open.unwrap_or(f64::NAN),
            close: record.close.unwrap_or(f64::NAN),
            percentage: record.percentage.unwrap_or(f64::NAN),
            target_position: record.pos.unwrap_or(f64::NAN),
        });
    }

    let report = table_quality_from_bars(&bars, corporate_action_tolerance);
    tracing::debug!(
        path = %path.display(),
        rows = report.rows,
        corporate_action_days = report.corporate_action_days,
        "input table loaded"
    );
    Ok((bars, report))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    // Timestamps such as "2020-01-02 00:00:00" keep only the day.
    if let Some((day, _time)) = value.split_once([' ', 'T']) {
        if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return Ok(date);
        }
    }
    Err(format!("unsupported date format: {}", value))
}

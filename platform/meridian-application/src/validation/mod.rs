use crate::config::Config;
use crate::shared::corporate_action_tolerance;
use meridian_domain::repositories::bar_table::{BarTableQuery, BarTableRepository};
use meridian_domain::services::bar_table::{validate_bars, TableQualityReport};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

/// Error prefix callers can match on to tell a strict-mode rejection apart
/// from an I/O or parse failure.
pub const STRICT_FAILURE_PREFIX: &str = "strict validation failed";

pub fn validate(
    config: &Config,
    strict: bool,
    bar_table: &dyn BarTableRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    )
    .entered();

    let stage_start = Instant::now();
    let (bars, report) = bar_table.load_bars(&BarTableQuery {
        path: PathBuf::from(&config.paths.input_path),
        corporate_action_tolerance: corporate_action_tolerance(config),
    })?;
    metrics::histogram!("meridian.validate.load_table_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let table_error = validate_bars(&bars).err().map(|err| err.to_string());

    metrics::gauge!("meridian.validate.rows").set(report.rows as f64);
    metrics::gauge!("meridian.validate.invalid_price").set(report.invalid_price as f64);
    metrics::gauge!("meridian.validate.missing_target").set(report.missing_target as f64);
    metrics::gauge!("meridian.validate.negative_target").set(report.negative_target as f64);
    metrics::gauge!("meridian.validate.missing_percentage")
        .set(report.missing_percentage as f64);
    metrics::gauge!("meridian.validate.duplicate_dates").set(report.duplicate_dates as f64);
    metrics::gauge!("meridian.validate.out_of_order_dates").set(report.out_of_order_dates as f64);
    metrics::gauge!("meridian.validate.corporate_action_days")
        .set(report.corporate_action_days as f64);

    if strict {
        if let Some(err) = &table_error {
            return Err(format!("{STRICT_FAILURE_PREFIX}: {err}"));
        }
        if report.has_blocking_issues() {
            return Err(format!(
                "{STRICT_FAILURE_PREFIX}: table quality issues ({})",
                describe_issues(&report)
            ));
        }
    }

    if let Some(err) = &table_error {
        tracing::warn!(error = %err, "input table would be rejected by the simulator");
    }

    Ok(serde_json::json!({
        "input_path": config.paths.input_path,
        "table": table_quality_json(&report),
        "simulatable": table_error.is_none(),
        "error": table_error,
        "strict": strict,
    }))
}

fn describe_issues(report: &TableQualityReport) -> String {
    let mut parts = Vec::new();
    if report.rows < 2 {
        parts.push(format!("rows={}", report.rows));
    }
    for (label, count) in [
        ("invalid_price", report.invalid_price),
        ("missing_target", report.missing_target),
        ("negative_target", report.negative_target),
        ("missing_percentage", report.missing_percentage),
        ("duplicate_dates", report.duplicate_dates),
        ("out_of_order_dates", report.out_of_order_dates),
    ] {
        if count > 0 {
            parts.push(format!("{label}={count}"));
        }
    }
    parts.join(", ")
}

fn table_quality_json(report: &TableQualityReport) -> serde_json::Value {
    serde_json::json!({
        "rows": report.rows,
        "invalid_price": report.invalid_price,
        "missing_target": report.missing_target,
        "negative_target": report.negative_target,
        "missing_percentage": report.missing_percentage,
        "duplicate_dates": report.duplicate_dates,
        "out_of_order_dates": report.out_of_order_dates,
        "target_changes": report.target_changes,
        "corporate_action_days": report.corporate_action_days,
        "first_date": report.first_date,
        "last_date": report.last_date,
        "first_invalid_row": report.first_invalid_row,
    })
}

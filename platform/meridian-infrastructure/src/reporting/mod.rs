use meridian_domain::entities::metrics::PerformanceSummary;
use meridian_domain::services::audit::AuditEvent;
use meridian_domain::value_objects::daily_bar::DailyBar;
use meridian_domain::value_objects::daily_state::DailyState;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const DAILY_CSV_HEADER: [&str; 14] = [
    "Date",
    "Open",
    "Close",
    "Percentage",
    "pos",
    "heldShares",
    "stockValue",
    "cash",
    "equity",
    "actualPosition",
    "fees",
    "drawdown",
    "branch",
    "corporateAction",
];

pub fn write_audit_jsonl(path: &Path, events: &[AuditEvent]) -> Result<(), String> {
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create logs: {}", err))?;
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|err| format!("failed to serialize audit event: {}", err))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|err| format!("failed to write audit event: {}", err))?;
    }
    Ok(())
}

/// The input table augmented with the per-day portfolio record.
pub fn write_daily_csv(
    path: &Path,
    bars: &[DailyBar],
    states: &[DailyState],
    drawdown: &[f64],
) -> Result<(), String> {
    if bars.len() != states.len() || bars.len() != drawdown.len() {
        return Err(format!(
            "daily table columns are misaligned: {} bars, {} states, {} drawdown points",
            bars.len(),
            states.len(),
            drawdown.len()
        ));
    }

    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create daily csv {}: {}", path.display(), err))?;
    wtr.write_record(DAILY_CSV_HEADER)
        .map_err(|err| format!("failed to write daily csv header: {}", err))?;

    for ((bar, state), dd) in bars.iter().zip(states).zip(drawdown) {
        wtr.write_record([
            bar.date.map(|d| d.to_string()).unwrap_or_default(),
            bar.open.to_string(),
            bar.close.to_string(),
            bar.percentage.to_string(),
            bar.target_position.to_string(),
            state.held_shares.to_string(),
            state.stock_value.to_string(),
            state.cash.to_string(),
            state.equity.to_string(),
            state.actual_position.to_string(),
            state.fees.to_string(),
            dd.to_string(),
            state
                .branch
                .map(|branch| branch.label().to_string())
                .unwrap_or_default(),
            state.corporate_action.to_string(),
        ])
        .map_err(|err| format!("failed to write daily row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush daily csv: {}", err))
}

pub fn write_summary_json(
    path: &Path,
    summary: &PerformanceSummary,
    meta: Option<&serde_json::Value>,
    config_snapshot: Option<&serde_json::Value>,
) -> Result<(), String> {
    let json = serde_json::json!({
        "meta": meta,
        "config_snapshot": config_snapshot,
        "days": summary.days,
        "initial_equity": summary.initial_equity,
        "final_equity": summary.final_equity,
        "annual_return": summary.annual_return,
        "sharpe_ratio": summary.sharpe_ratio,
        "volatility": summary.volatility,
        "max_drawdown": summary.max_drawdown,
    });
    let json = serde_json::to_string_pretty(&json)
        .map_err(|err| format!("failed to serialize summary: {}", err))?;
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create summary: {}", err))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write summary: {}", err))
}

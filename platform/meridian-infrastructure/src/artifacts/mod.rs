use crate::reporting;
use meridian_domain::entities::metrics::PerformanceSummary;
use meridian_domain::repositories::artifacts::ArtifactWriter;
use meridian_domain::services::audit::AuditEvent;
use meridian_domain::value_objects::daily_bar::DailyBar;
use meridian_domain::value_objects::daily_state::DailyState;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Writes run artifacts straight to the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "meridian.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!(
        "meridian.infra.artifacts.write_ms",
        "kind" => kind,
        "result" => result_label
    )
    .record(start.elapsed().as_millis() as f64);
    if let Err(err) = result {
        tracing::warn!(kind, error = %err, "artifact write failed");
    }
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err));
        record_write_metrics("ensure_dir", start, &result);
        result
    }

    fn write_daily_csv(
        &self,
        path: &Path,
        bars: &[DailyBar],
        states: &[DailyState],
        drawdown: &[f64],
    ) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_daily_csv(path, bars, states, drawdown);
        record_write_metrics("daily_csv", start, &result);
        result
    }

    fn write_summary_json(
        &self,
        path: &Path,
        summary: &PerformanceSummary,
        meta: Option<&serde_json::Value>,
        config_snapshot: Option<&serde_json::Value>,
    ) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_summary_json(path, summary, meta, config_snapshot);
        record_write_metrics("summary_json", start, &result);
        result
    }

    fn write_analyzer_json(&self, path: &Path, value: &serde_json::Value) -> Result<(), String> {
        let start = Instant::now();
        let result = serde_json::to_string_pretty(value)
            .map_err(|err| format!("failed to serialize analyzer json: {err}"))
            .and_then(|json| {
                fs::write(path, json).map_err(|err| {
                    format!("failed to write analyzer json {}: {}", path.display(), err)
                })
            });
        record_write_metrics("analyzer_json", start, &result);
        result
    }

    fn write_audit_jsonl(&self, path: &Path, events: &[AuditEvent]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_audit_jsonl(path, events);
        record_write_metrics("logs_jsonl", start, &result);
        result
    }

    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::write(path, contents).map_err(|err| {
            format!(
                "failed to write config snapshot {}: {}",
                path.display(),
                err
            )
        });
        record_write_metrics("config_snapshot_toml", start, &result);
        result
    }
}

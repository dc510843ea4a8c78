use crate::entities::metrics::PerformanceSummary;
use crate::services::audit::AuditEvent;
use crate::value_objects::daily_bar::DailyBar;
use crate::value_objects::daily_state::DailyState;
use std::path::Path;

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    /// One row per input bar; `states` and `drawdown` are index-aligned with `bars`.
    fn write_daily_csv(
        &self,
        path: &Path,
        bars: &[DailyBar],
        states: &[DailyState],
        drawdown: &[f64],
    ) -> Result<(), String>;
    fn write_summary_json(
        &self,
        path: &Path,
        summary: &PerformanceSummary,
        meta: Option<&serde_json::Value>,
        config_snapshot: Option<&serde_json::Value>,
    ) -> Result<(), String>;
    fn write_analyzer_json(&self, path: &Path, value: &serde_json::Value) -> Result<(), String>;
    fn write_audit_jsonl(&self, path: &Path, events: &[AuditEvent]) -> Result<(), String>;
    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String>;
}

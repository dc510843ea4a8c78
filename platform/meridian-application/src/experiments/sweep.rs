use crate::config::Config;
use crate::shared::corporate_action_tolerance;
use meridian_domain::repositories::artifacts::ArtifactWriter;
use meridian_domain::repositories::bar_table::{BarTableQuery, BarTableRepository};
use meridian_domain::services::bar_table::TableQualityReport;
use meridian_domain::value_objects::daily_bar::DailyBar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::info_span;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepFile {
    pub base: SweepBase,
    pub sweep: SweepMeta,
    #[serde(default)]
    pub params: Vec<SweepParam>,
    pub leaderboard: Option<LeaderboardConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepBase {
    pub config: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepMeta {
    pub id: String,
    pub parallelism: Option<usize>,
    pub resume: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepParam {
    pub path: String,
    pub values: Vec<toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeaderboardConfig {
    pub sort_by: Option<String>,
    pub descending: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRunEntry {
    pub run_id: String,
    pub params: BTreeMap<String, toml::Value>,
    pub status: String,
    pub error: Option<String>,
    pub metrics: Option<RunMetrics>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunMetrics {
    pub days: u64,
    pub final_equity: f64,
    pub annual_return: f64,
    pub sharpe_ratio: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub sweep_id: String,
    pub sweep_dir: PathBuf,
    pub base_config: String,
    pub runs: Vec<SweepRunEntry>,
}

/// Config paths a sweep may override. Everything that selects the input
/// table or the output location stays fixed across the grid.
const ALLOWED_PARAM_PREFIXES: [&str; 4] = ["run.initial_capital", "costs.", "engine.", "metrics."];

pub fn run_sweep(
    sweep_path: &Path,
    bar_table: &dyn BarTableRepository,
    artifacts: &(dyn ArtifactWriter + Sync),
) -> Result<SweepResult, String> {
    let raw = std::fs::read_to_string(sweep_path).map_err(|err| {
        format!(
            "failed to read sweep config {}: {err}",
            sweep_path.display()
        )
    })?;
    let sweep: SweepFile = toml::from_str(&raw)
        .map_err(|err| format!("failed to parse sweep TOML {}: {err}", sweep_path.display()))?;

    let _span = info_span!("run_sweep", sweep_id = %sweep.sweep.id).entered();

    validate_param_paths(&sweep.params)?;

    let base_config_path = resolve_base_config_path(sweep_path, &sweep.base.config);
    let (base_config, base_toml_str) =
        crate::config::load_config_with_source(base_config_path.as_path())?;
    let base_toml_value: toml::Value = toml::from_str(&base_toml_str)
        .map_err(|err| format!("failed to parse base config TOML as value: {err}"))?;

    let out_dir = PathBuf::from(&base_config.paths.out_dir);
    let sweep_dir = out_dir.join("sweeps").join(&sweep.sweep.id);
    std::fs::create_dir_all(&sweep_dir)
        .map_err(|err| format!("failed to create sweep dir {}: {err}", sweep_dir.display()))?;

    let resume = sweep.sweep.resume.unwrap_or(false);

    // Every grid point reads the same table; load it once.
    let (bars, report) = bar_table.load_bars(&BarTableQuery {
        path: PathBuf::from(&base_config.paths.input_path),
        corporate_action_tolerance: corporate_action_tolerance(&base_config),
    })?;
    let in_memory_table = InMemoryBarTableRepository { bars, report };

    let grid = expand_grid(&sweep.params);
    let parallelism = normalize_parallelism(sweep.sweep.parallelism);
    tracing::info!(runs = grid.len(), parallelism, "sweep grid expanded");

    let mut entries: Vec<Option<SweepRunEntry>> = vec![None; grid.len()];
    let mut plans: Vec<SweepRunPlan> = Vec::new();

    for (order_idx, assignment) in grid.iter().enumerate() {
        let run_id = format!("{}__{}", sweep.sweep.id, assignment_hash(assignment));
        let summary_path = out_dir.join(&run_id).join("summary.json");
        if resume && summary_path.exists() {
            metrics::counter!("meridian.sweep.runs_total", "status" => "skipped").increment(1);
            entries[order_idx] = Some(SweepRunEntry {
                run_id,
                params: assignment.clone(),
                status: "skipped".to_string(),
                error: None,
                metrics: read_metrics_from_summary(&summary_path).ok(),
            });
            continue;
        }

        match build_run_config(&base_toml_value, assignment, &run_id) {
            Ok((config, config_toml)) => plans.push(SweepRunPlan {
                order_idx,
                run_id,
                params: assignment.clone(),
                config,
                config_toml,
                summary_path,
            }),
            Err(err) => {
                metrics::counter!("meridian.sweep.runs_total", "status" => "error").increment(1);
                tracing::warn!(run_id = %run_id, error = %err, "sweep grid point rejected");
                entries[order_idx] = Some(SweepRunEntry {
                    run_id,
                    params: assignment.clone(),
                    status: "error".to_string(),
                    error: Some(err),
                    metrics: None,
                });
            }
        }
    }

    let mut executed = if parallelism <= 1 || plans.len() <= 1 {
        execute_plans_serial(&plans, &in_memory_table, artifacts)
    } else {
        execute_plans_parallel(&plans, parallelism, &in_memory_table, artifacts)?
    };

    executed.sort_by_key(|(order_idx, _)| *order_idx);
    for (order_idx, entry) in executed {
        entries[order_idx] = Some(entry);
    }

    let runs = entries
        .into_iter()
        .map(|entry| {
            entry.ok_or_else(|| {
                format!(
                    "internal sweep error: missing run entry (sweep '{}')",
                    sweep.sweep.id
                )
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let result = SweepResult {
        sweep_id: sweep.sweep.id.clone(),
        sweep_dir: sweep_dir.clone(),
        base_config: base_config_path.display().to_string(),
        runs,
    };

    write_manifest(&sweep_dir, &result)?;
    write_results_csv(&sweep_dir, &result)?;
    write_leaderboard_csv(&sweep_dir, &result, sweep.leaderboard.as_ref())?;

    Ok(result)
}

#[derive(Debug, Clone)]
struct SweepRunPlan {
    order_idx: usize,
    run_id: String,
    params: BTreeMap<String, toml::Value>,
    config: Config,
    config_toml: String,
    summary_path: PathBuf,
}

fn normalize_parallelism(value: Option<usize>) -> usize {
    value.unwrap_or(1).max(1)
}

fn execute_plans_serial(
    plans: &[SweepRunPlan],
    bar_table: &(dyn BarTableRepository + Sync),
    artifacts: &(dyn ArtifactWriter + Sync),
) -> Vec<(usize, SweepRunEntry)> {
    plans
        .iter()
        .map(|plan| (plan.order_idx, execute_run_plan(plan, bar_table, artifacts)))
        .collect()
}

fn execute_plans_parallel(
    plans: &[SweepRunPlan],
    parallelism: usize,
    bar_table: &(dyn BarTableRepository + Sync),
    artifacts: &(dyn ArtifactWriter + Sync),
) -> Result<Vec<(usize, SweepRunEntry)>, String> {
    let worker_count = parallelism.max(1).min(plans.len());
    let next_index = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, SweepRunEntry)>();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let tx = tx.clone();
            let next_index_ref = &next_index;
            scope.spawn(move || loop {
                let plan_idx = next_index_ref.fetch_add(1, Ordering::Relaxed);
                if plan_idx >= plans.len() {
                    break;
                }

                let plan = &plans[plan_idx];
                let entry = execute_run_plan(plan, bar_table, artifacts);
                if tx.send((plan.order_idx, entry)).is_err() {
                    break;
                }
            });
        }

        drop(tx);

        let entries: Vec<(usize, SweepRunEntry)> = rx.iter().collect();
        if entries.len() != plans.len() {
            return Err(format!(
                "internal sweep error: expected {} results, got {}",
                plans.len(),
                entries.len()
            ));
        }

        Ok(entries)
    })
}

/// A failing grid point becomes an `error` entry; it never aborts the sweep.
fn execute_run_plan(
    plan: &SweepRunPlan,
    bar_table: &(dyn BarTableRepository + Sync),
    artifacts: &(dyn ArtifactWriter + Sync),
) -> SweepRunEntry {
    let result = crate::backtesting::run_backtest(
        &plan.config,
        &plan.config_toml,
        None,
        bar_table,
        artifacts,
    );

    match result {
        Ok(_) => {
            metrics::counter!("meridian.sweep.runs_total", "status" => "ok").increment(1);
            SweepRunEntry {
                run_id: plan.run_id.clone(),
                params: plan.params.clone(),
                status: "ok".to_string(),
                error: None,
                metrics: read_metrics_from_summary(&plan.summary_path).ok(),
            }
        }
        Err(err) => {
            metrics::counter!("meridian.sweep.runs_total", "status" => "error").increment(1);
            tracing::warn!(run_id = %plan.run_id, error = %err, "sweep run failed");
            SweepRunEntry {
                run_id: plan.run_id.clone(),
                params: plan.params.clone(),
                status: "error".to_string(),
                error: Some(err),
                metrics: None,
            }
        }
    }
}

/// Base config with one grid point applied, both parsed and as TOML text.
fn build_run_config(
    base: &toml::Value,
    assignment: &BTreeMap<String, toml::Value>,
    run_id: &str,
) -> Result<(Config, String), String> {
    let mut toml_value = base.clone();
    apply_assignment(&mut toml_value, assignment)?;
    set_run_id(&mut toml_value, run_id)?;

    let config_toml = toml::to_string_pretty(&toml_value)
        .map_err(|err| format!("failed to serialize sweep config TOML: {err}"))?;
    let config: Config = toml::from_str(&config_toml)
        .map_err(|err| format!("failed to parse generated config TOML: {err}"))?;
    Ok((config, config_toml))
}

fn resolve_base_config_path(sweep_path: &Path, base: &str) -> PathBuf {
    let p = PathBuf::from(base);
    if p.is_absolute() {
        p
    } else {
        sweep_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(p)
    }
}

fn validate_param_paths(params: &[SweepParam]) -> Result<(), String> {
    for p in params {
        let path = p.path.trim();
        if path.is_empty() {
            return Err("sweep param path cannot be empty".to_string());
        }
        if !ALLOWED_PARAM_PREFIXES
            .iter()
            .any(|prefix| path == prefix.trim_end_matches('.') || path.starts_with(prefix))
        {
            return Err(format!("sweep param path not allowed: {}", p.path));
        }
        if p.values.is_empty() {
            return Err(format!("sweep param has no values: {}", p.path));
        }
    }
    Ok(())
}

fn expand_grid(params: &[SweepParam]) -> Vec<BTreeMap<String, toml::Value>> {
    let mut out: Vec<BTreeMap<String, toml::Value>> = vec![BTreeMap::new()];
    for p in params {
        let mut next: Vec<BTreeMap<String, toml::Value>> = Vec::new();
        for base in &out {
            for v in &p.values {
                let mut m = base.clone();
                m.insert(p.path.clone(), v.clone());
                next.push(m);
            }
        }
        out = next;
    }
    out
}

fn assignment_hash(assignment: &BTreeMap<String, toml::Value>) -> String {
    let canonical = serde_json::to_string(assignment)
        .unwrap_or_else(|_| "{\"error\":\"assignment\"}".to_string());
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let bytes = hasher.finalize();
    to_hex_short(&bytes[..], 12)
}

fn to_hex_short(bytes: &[u8], chars: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(chars);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        if out.len() >= chars {
            break;
        }
        out.push(HEX[(b & 0x0f) as usize] as char);
        if out.len() >= chars {
            break;
        }
    }
    out
}

fn set_run_id(root: &mut toml::Value, run_id: &str) -> Result<(), String> {
    set_path_value(root, "run.run_id", toml::Value::String(run_id.to_string()))
}

fn apply_assignment(
    root: &mut toml::Value,
    assignment: &BTreeMap<String, toml::Value>,
) -> Result<(), String> {
    for (path, value) in assignment {
        set_path_value(root, path, value.clone())?;
    }
    Ok(())
}

/// Writes `value` at a dotted path, creating missing tables on the way.
/// Optional sections such as `[engine]` may be absent from the base config.
fn set_path_value(root: &mut toml::Value, path: &str, value: toml::Value) -> Result<(), String> {
    let parts: Vec<&str> = path
        .split('.')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err("empty path".to_string());
    };

    let mut cur = root;
    for key in parents {
        let table = cur
            .as_table_mut()
            .ok_or_else(|| format!("path is not a table: {}", path))?;
        cur = table
            .entry(key.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    let table = cur
        .as_table_mut()
        .ok_or_else(|| format!("path is not a table: {}", path))?;
    table.insert(last.to_string(), value);
    Ok(())
}

fn read_metrics_from_summary(path: &Path) -> Result<RunMetrics, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))?;
    let summary = value.get("summary").unwrap_or(&value);
    let float = |key: &str| summary.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0);
    Ok(RunMetrics {
        days: summary.get("days").and_then(|v| v.as_u64()).unwrap_or(0),
        final_equity: float("final_equity"),
        annual_return: float("annual_return"),
        sharpe_ratio: float("sharpe_ratio"),
        volatility: float("volatility"),
        max_drawdown: float("max_drawdown"),
    })
}

fn write_manifest(dir: &Path, result: &SweepResult) -> Result<(), String> {
    let path = dir.join("manifest.json");
    let json = serde_json::to_string_pretty(result)
        .map_err(|err| format!("failed to serialize manifest: {err}"))?;
    std::fs::write(&path, json)
        .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
    Ok(())
}

fn write_results_csv(dir: &Path, result: &SweepResult) -> Result<(), String> {
    let path = dir.join("results.csv");
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
    wtr.write_record([
        "run_id",
        "status",
        "days",
        "final_equity",
        "annual_return",
        "sharpe_ratio",
        "volatility",
        "max_drawdown",
        "error",
    ])
    .map_err(|err| format!("failed to write results header: {err}"))?;

    for r in &result.runs {
        let m = r.metrics;
        let record = vec![
            r.run_id.clone(),
            r.status.clone(),
            m.map(|m| m.days.to_string()).unwrap_or_default(),
            m.map(|m| format!("{}", m.final_equity)).unwrap_or_default(),
            m.map(|m| format!("{}", m.annual_return)).unwrap_or_default(),
            m.map(|m| format!("{}", m.sharpe_ratio)).unwrap_or_default(),
            m.map(|m| format!("{}", m.volatility)).unwrap_or_default(),
            m.map(|m| format!("{}", m.max_drawdown)).unwrap_or_default(),
            r.error.clone().unwrap_or_default(),
        ];
        wtr.write_record(record)
            .map_err(|err| format!("failed to write results row: {err}"))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush {}: {err}", path.display()))?;
    Ok(())
}

fn write_leaderboard_csv(
    dir: &Path,
    result: &SweepResult,
    cfg: Option<&LeaderboardConfig>,
) -> Result<(), String> {
    let sort_by = cfg
        .and_then(|c| c.sort_by.as_deref())
        .unwrap_or("sharpe_ratio")
        .trim()
        .to_lowercase();
    let descending = cfg.and_then(|c| c.descending).unwrap_or(true);

    let mut rows: Vec<(&SweepRunEntry, RunMetrics)> = result
        .runs
        .iter()
        .filter(|r| r.status != "error")
        .filter_map(|r| r.metrics.map(|m| (r, m)))
        .collect();
    rows.sort_by(|(_, a), (_, b)| {
        let av = metric_value(*a, &sort_by);
        let bv = metric_value(*b, &sort_by);
        let ord = bv.partial_cmp(&av).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord
        } else {
            ord.reverse()
        }
    });

    let path = dir.join("leaderboard.csv");
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
    wtr.write_record([
        "rank",
        "run_id",
        "days",
        "final_equity",
        "annual_return",
        "sharpe_ratio",
        "volatility",
        "max_drawdown",
    ])
    .map_err(|err| format!("failed to write leaderboard header: {err}"))?;

    for (idx, (r, m)) in rows.iter().enumerate() {
        let record = vec![
            (idx + 1).to_string(),
            r.run_id.clone(),
            m.days.to_string(),
            format!("{}", m.final_equity),
            format!("{}", m.annual_return),
            format!("{}", m.sharpe_ratio),
            format!("{}", m.volatility),
            format!("{}", m.max_drawdown),
        ];
        wtr.write_record(record)
            .map_err(|err| format!("failed to write leaderboard row: {err}"))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush {}: {err}", path.display()))?;
    Ok(())
}

fn metric_value(m: RunMetrics, key: &str) -> f64 {
    match key {
        "annual_return" => m.annual_return,
        "final_equity" => m.final_equity,
        "volatility" => m.volatility,
        "max_drawdown" | "max_dd" => m.max_drawdown,
        "days" => m.days as f64,
        _ => m.sharpe_ratio,
    }
}

#[derive(Default)]
struct InMemoryBarTableRepository {
    bars: Vec<DailyBar>,
    report: TableQualityReport,
}

impl BarTableRepository for InMemoryBarTableRepository {
    fn load_bars(
        &self,
        _query: &BarTableQuery,
    ) -> Result<(Vec<DailyBar>, TableQualityReport), String> {
        Ok((self.bars.clone(), self.report.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_infrastructure::artifacts::FilesystemArtifactWriter;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn expand_grid_is_deterministic() {
        let params = vec![
            SweepParam {
                path: "costs.slippage".to_string(),
                values: vec![toml::Value::Float(0.0), toml::Value::Float(0.01)],
            },
            SweepParam {
                path: "costs.commission_rate".to_string(),
                values: vec![toml::Value::Float(0.0), toml::Value::Float(0.001)],
            },
        ];
        let grid = expand_grid(&params);
        assert_eq!(grid.len(), 4);
        assert_eq!(
            grid[0].get("costs.slippage").and_then(|v| v.as_float()),
            Some(0.0)
        );
        assert_eq!(
            grid[0].get("costs.commission_rate").and_then(|v| v.as_float()),
            Some(0.0)
        );
        assert_eq!(
            grid[3].get("costs.slippage").and_then(|v| v.as_float()),
            Some(0.01)
        );
        assert_eq!(
            grid[3].get("costs.commission_rate").and_then(|v| v.as_float()),
            Some(0.001)
        );
    }

    #[test]
    fn set_path_value_creates_missing_sections() {
        let mut v: toml::Value = toml::from_str("[costs]\nslippage = 0.0\n").expect("toml");
        set_path_value(&mut v, "metrics.risk_free_rate", toml::Value::Float(0.02))
            .expect("create section");
        assert_eq!(
            v.get("metrics")
                .and_then(|m| m.get("risk_free_rate"))
                .and_then(|r| r.as_float()),
            Some(0.02)
        );

        let err = set_path_value(&mut v, "costs.slippage.inner", toml::Value::Integer(1))
            .expect_err("scalar in the middle of the path");
        assert!(err.contains("path is not a table"));
    }

    #[test]
    fn param_paths_are_restricted() {
        let param = |path: &str| SweepParam {
            path: path.to_string(),
            values: vec![toml::Value::Float(1.0)],
        };
        assert!(validate_param_paths(&[param("costs.slippage")]).is_ok());
        assert!(validate_param_paths(&[param("engine.lot_size")]).is_ok());
        assert!(validate_param_paths(&[param("run.initial_capital")]).is_ok());
        assert!(validate_param_paths(&[param("paths.input_path")]).is_err());
        assert!(validate_param_paths(&[param("run.symbol")]).is_err());
        assert!(validate_param_paths(&[SweepParam {
            path: "costs.slippage".to_string(),
            values: Vec::new(),
        }])
        .is_err());
    }

    #[test]
    fn normalize_parallelism_guards_invalid_values() {
        assert_eq!(normalize_parallelism(None), 1);
        assert_eq!(normalize_parallelism(Some(0)), 1);
        assert_eq!(normalize_parallelism(Some(4)), 4);
    }

    #[test]
    fn hex_prefix_has_requested_length() {
        assert_eq!(to_hex_short(&[0xab, 0xcd, 0xef], 5), "abcde");
        assert_eq!(to_hex_short(&[0x01], 12), "01");
    }

    fn test_temp_dir(prefix: &str) -> PathBuf {
        let unique = format!(
            "{}_{}_{}",
            prefix,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock before UNIX_EPOCH")
                .as_nanos()
        );
        std::env::temp_dir().join(unique)
    }

    fn sample_bars(count: usize) -> Vec<DailyBar> {
        let mut prev: Option<f64> = None;
        (0..count)
            .map(|index| {
                let close = 10.0 + (index % 7) as f64 * 0.5;
                let pct = prev.map(|p| close / p - 1.0).unwrap_or(0.0);
                prev = Some(close);
                let pos = if (index / 5) % 2 == 0 { 0.0 } else { 1.0 };
                DailyBar::new(close, close, pct, pos)
            })
            .collect()
    }

    struct SlowArtifacts {
        inner: FilesystemArtifactWriter,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ArtifactWriter for SlowArtifacts {
        fn ensure_dir(&self, path: &Path) -> Result<(), String> {
            let current = self.active.fetch_add(1, Ordering::Relaxed) + 1;
            self.max_active.fetch_max(current, Ordering::Relaxed);
            std::thread::sleep(Duration::from_millis(35));
            self.active.fetch_sub(1, Ordering::Relaxed);
            self.inner.ensure_dir(path)
        }

        fn write_daily_csv(
            &self,
            path: &Path,
            bars: &[DailyBar],
            states: &[meridian_domain::value_objects::daily_state::DailyState],
            drawdown: &[f64],
        ) -> Result<(), String> {
            self.inner.write_daily_csv(path, bars, states, drawdown)
        }

        fn write_summary_json(
            &self,
            path: &Path,
            summary: &meridian_domain::entities::metrics::PerformanceSummary,
            meta: Option<&serde_json::Value>,
            config_snapshot: Option<&serde_json::Value>,
        ) -> Result<(), String> {
            self.inner
                .write_summary_json(path, summary, meta, config_snapshot)
        }

        fn write_analyzer_json(&self, path: &Path, value: &serde_json::Value) -> Result<(), String> {
            self.inner.write_analyzer_json(path, value)
        }

        fn write_audit_jsonl(
            &self,
            path: &Path,
            events: &[meridian_domain::services::audit::AuditEvent],
        ) -> Result<(), String> {
            self.inner.write_audit_jsonl(path, events)
        }

        fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String> {
            self.inner.write_config_snapshot_toml(path, contents)
        }
    }

    fn write_sweep_fixture(temp_dir: &Path, parallelism: usize) -> PathBuf {
        write_sweep_fixture_with_params(
            temp_dir,
            parallelism,
            "path = \"costs.slippage\"\nvalues = [0.0, 0.05, 0.1]",
        )
    }

    fn write_sweep_fixture_with_params(temp_dir: &Path, parallelism: usize, params: &str) -> PathBuf {
        std::fs::create_dir_all(temp_dir).expect("temp dir");
        let out_dir = temp_dir.join("runs_out");
        let base_config = format!(
            r#"
[run]
run_id = "base_run"
symbol = "TEST"
initial_capital = 100000.0

[paths]
input_path = "unused.csv"
out_dir = "{}"

[costs]
slippage = 0.0
commission_rate = 0.0
"#,
            out_dir.display()
        );
        std::fs::write(temp_dir.join("base.toml"), base_config).expect("write base config");

        let sweep_path = temp_dir.join("sweep.toml");
        std::fs::write(
            &sweep_path,
            format!(
                r#"
[base]
config = "base.toml"

[sweep]
id = "slippage_demo"
parallelism = {parallelism}
resume = false

[[params]]
{params}

[leaderboard]
sort_by = "final_equity"
descending = true
"#
            ),
        )
        .expect("write sweep config");
        sweep_path
    }

    #[test]
    fn run_sweep_parallelism_executes_concurrently_and_keeps_order() {
        let temp_dir = test_temp_dir("meridian_sweep_parallel");
        let sweep_path = write_sweep_fixture(&temp_dir, 3);

        let bars = sample_bars(40);
        let table = InMemoryBarTableRepository {
            report: meridian_domain::services::bar_table::table_quality_from_bars(&bars, 0.001),
            bars,
        };
        let artifacts = SlowArtifacts {
            inner: FilesystemArtifactWriter::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        };

        let result = run_sweep(&sweep_path, &table, &artifacts).expect("run sweep");

        assert_eq!(result.runs.len(), 3);
        assert!(result.runs.iter().all(|run| run.status == "ok"));
        assert!(
            artifacts.max_active.load(Ordering::Relaxed) > 1,
            "parallel sweep should write run artifacts concurrently"
        );

        let expected_assignments = expand_grid(&[SweepParam {
            path: "costs.slippage".to_string(),
            values: vec![
                toml::Value::Float(0.0),
                toml::Value::Float(0.05),
                toml::Value::Float(0.1),
            ],
        }]);
        let expected_run_ids: Vec<String> = expected_assignments
            .iter()
            .map(|assignment| format!("slippage_demo__{}", assignment_hash(assignment)))
            .collect();
        let run_ids: Vec<String> = result.runs.iter().map(|run| run.run_id.clone()).collect();
        assert_eq!(run_ids, expected_run_ids);

        let leaderboard =
            std::fs::read_to_string(result.sweep_dir.join("leaderboard.csv")).expect("leaderboard");
        assert_eq!(leaderboard.lines().count(), 4);
        assert!(leaderboard.lines().nth(1).expect("leaderboard row").starts_with("1,"));
        assert!(result.sweep_dir.join("manifest.json").exists());
        assert!(result.sweep_dir.join("results.csv").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn run_sweep_resume_skips_finished_runs() {
        let temp_dir = test_temp_dir("meridian_sweep_resume");
        let sweep_path = write_sweep_fixture(&temp_dir, 1);
        let bars = sample_bars(20);
        let table = InMemoryBarTableRepository {
            report: meridian_domain::services::bar_table::table_quality_from_bars(&bars, 0.001),
            bars,
        };
        let artifacts = FilesystemArtifactWriter::new();

        let first = run_sweep(&sweep_path, &table, &artifacts).expect("first sweep");
        assert!(first.runs.iter().all(|run| run.status == "ok"));

        let raw = std::fs::read_to_string(&sweep_path).expect("read sweep");
        std::fs::write(&sweep_path, raw.replace("resume = false", "resume = true"))
            .expect("rewrite sweep");
        let second = run_sweep(&sweep_path, &table, &artifacts).expect("second sweep");
        assert!(second.runs.iter().all(|run| run.status == "skipped"));
        assert!(second.runs.iter().all(|run| run.metrics.is_some()));

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn run_sweep_records_bad_grid_point_and_keeps_going() {
        let temp_dir = test_temp_dir("meridian_sweep_bad_point");
        let sweep_path = write_sweep_fixture_with_params(
            &temp_dir,
            1,
            "path = \"costs.slippage\"\nvalues = [0.0, \"oops\"]",
        );
        let bars = sample_bars(20);
        let table = InMemoryBarTableRepository {
            report: meridian_domain::services::bar_table::table_quality_from_bars(&bars, 0.001),
            bars,
        };
        let artifacts = FilesystemArtifactWriter::new();

        let result = run_sweep(&sweep_path, &table, &artifacts).expect("sweep completes");
        let statuses: Vec<&str> = result.runs.iter().map(|run| run.status.as_str()).collect();
        assert_eq!(statuses, vec!["ok", "error"]);
        let failed = &result.runs[1];
        assert!(failed.metrics.is_none());
        assert!(failed
            .error
            .as_deref()
            .is_some_and(|err| err.contains("failed to parse generated config TOML")));

        assert!(result.sweep_dir.join("manifest.json").exists());
        assert!(result.sweep_dir.join("results.csv").exists());
        let leaderboard =
            std::fs::read_to_string(result.sweep_dir.join("leaderboard.csv")).expect("leaderboard");
        assert_eq!(leaderboard.lines().count(), 2);

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn run_sweep_fills_in_sections_missing_from_base_config() {
        let temp_dir = test_temp_dir("meridian_sweep_missing_section");
        let sweep_path = write_sweep_fixture_with_params(
            &temp_dir,
            2,
            "path = \"metrics.risk_free_rate\"\nvalues = [0.0, 0.02]",
        );
        let bars = sample_bars(30);
        let table = InMemoryBarTableRepository {
            report: meridian_domain::services::bar_table::table_quality_from_bars(&bars, 0.001),
            bars,
        };
        let artifacts = FilesystemArtifactWriter::new();

        let result = run_sweep(&sweep_path, &table, &artifacts).expect("run sweep");
        assert_eq!(result.runs.len(), 2);
        assert!(result.runs.iter().all(|run| run.status == "ok"));

        let snapshot = std::fs::read_to_string(
            temp_dir
                .join("runs_out")
                .join(&result.runs[1].run_id)
                .join("config_snapshot.toml"),
        )
        .expect("config snapshot");
        assert!(snapshot.contains("risk_free_rate = 0.02"));

        let _ = std::fs::remove_dir_all(&temp_dir);
    }
}

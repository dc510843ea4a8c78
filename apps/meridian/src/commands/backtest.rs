use std::path::PathBuf;

pub(super) fn run_backtest(
    config_path: PathBuf,
    out: Option<PathBuf>,
) -> Result<serde_json::Value, String> {
    let (config, config_toml) =
        meridian_application::config::load_config_with_source(&config_path)?;
    tracing::info!(
        config = %config_path.display(),
        run_id = %config.run.run_id,
        symbol = %config.run.symbol,
        initial_capital = config.run.initial_capital,
        slippage = config.costs.slippage,
        commission_rate = config.costs.commission_rate,
        "backtest requested"
    );

    let overall_start = std::time::Instant::now();
    let crate::infra::EngineDeps {
        bar_table,
        artifacts,
    } = crate::infra::build_engine_deps();

    let run_dir = meridian_application::backtesting::run_backtest(
        &config,
        &config_toml,
        out,
        bar_table.as_ref(),
        artifacts.as_ref(),
    )?;
    metrics::histogram!("meridian.cli.backtest.total_ms")
        .record(overall_start.elapsed().as_millis() as f64);

    Ok(serde_json::json!({
        "status": "ok",
        "mode": "backtest",
        "run_id": config.run.run_id,
        "total_ms": overall_start.elapsed().as_millis() as u64,
        "artifacts": {
            "run_dir": run_dir.display().to_string(),
            "daily_csv": run_dir.join("daily.csv").display().to_string(),
            "summary_json": run_dir.join("summary.json").display().to_string(),
            "logs_jsonl": run_dir.join("logs.jsonl").display().to_string(),
            "config_snapshot_toml": run_dir.join("config_snapshot.toml").display().to_string(),
            "analyzers_dir": run_dir.join("analyzers").display().to_string(),
        },
    }))
}

use crate::config::Config;
use crate::shared::{
    analyzers_enabled, build_metrics_config, build_simulation_parameters, config_snapshot_json,
    corporate_action_tolerance, drawdown_top_n, summary_meta_json,
};
use meridian_domain::repositories::artifacts::ArtifactWriter;
use meridian_domain::repositories::bar_table::{BarTableQuery, BarTableRepository};
use meridian_domain::services::analyzers::{built_in_analyzers, AnalyzerInput};
use meridian_domain::services::audit::AuditEvent;
use meridian_domain::services::engine::backtest::{BacktestResults, BacktestRunner};
use meridian_domain::value_objects::daily_bar::DailyBar;
use meridian_domain::value_objects::rebalance_branch::RebalanceBranch;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

pub fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    bar_table: &dyn BarTableRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    )
    .entered();

    let mut audit_extras: Vec<AuditEvent> = Vec::new();

    let stage_start = Instant::now();
    let (bars, report) = bar_table.load_bars(&BarTableQuery {
        path: PathBuf::from(&config.paths.input_path),
        corporate_action_tolerance: corporate_action_tolerance(config),
    })?;
    metrics::histogram!("meridian.backtest.load_table_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    audit_extras.push(timing_event(
        &config.run.run_id,
        "load_table",
        stage_start.elapsed().as_millis() as u64,
        serde_json::json!({
            "rows": report.rows,
            "target_changes": report.target_changes,
            "corporate_action_days": report.corporate_action_days,
            "duplicate_dates": report.duplicate_dates,
            "out_of_order_dates": report.out_of_order_dates,
        }),
    ));

    let params = build_simulation_parameters(config);
    let metrics_config = build_metrics_config(config);

    let stage_start = Instant::now();
    let results = BacktestRunner::new(config.run.run_id.clone(), params, metrics_config)
        .run(&bars)
        .map_err(|err| format!("backtest {} failed: {err}", config.run.run_id))?;
    let simulate_ms = stage_start.elapsed().as_millis() as f64;
    metrics::histogram!("meridian.backtest.simulate_ms").record(simulate_ms);
    audit_extras.push(timing_event(
        &config.run.run_id,
        "simulate",
        stage_start.elapsed().as_millis() as u64,
        serde_json::json!({}),
    ));

    record_run_metrics(&results);
    log_run(&results);

    let stage_start = Instant::now();
    let snapshot = config_snapshot_json(&params, &metrics_config);
    let run_dir = write_outputs(
        config,
        config_toml,
        out,
        &bars,
        results,
        &snapshot,
        artifacts,
        audit_extras,
    )?;
    metrics::histogram!("meridian.backtest.write_artifacts_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    Ok(run_dir)
}

fn record_run_metrics(results: &BacktestResults) {
    let mut trades = 0u64;
    let mut corporate_actions = 0u64;
    for state in &results.states {
        if state.corporate_action {
            corporate_actions += 1;
        }
        if matches!(
            state.branch,
            Some(RebalanceBranch::Buy) | Some(RebalanceBranch::Sell)
        ) && state.traded_shares != 0.0
        {
            trades += 1;
        }
    }

    metrics::counter!("meridian.backtest.days_total").increment(results.states.len() as u64);
    metrics::counter!("meridian.backtest.trades_total").increment(trades);
    metrics::counter!("meridian.backtest.corporate_actions_total").increment(corporate_actions);
    metrics::counter!("meridian.backtest.warnings_total").increment(results.warnings.len() as u64);
    metrics::gauge!("meridian.backtest.final_equity").set(results.summary.final_equity);
    metrics::gauge!("meridian.backtest.sharpe_ratio").set(results.summary.sharpe_ratio);
    metrics::gauge!("meridian.backtest.max_drawdown").set(results.summary.max_drawdown);
}

fn log_run(results: &BacktestResults) {
    for event in results
        .audit_events
        .iter()
        .filter(|event| event.stage == "corporate_action")
    {
        tracing::debug!(day = event.day, details = %event.details, "holding restated");
    }
    for warning in &results.warnings {
        tracing::warn!(
            day = warning.day,
            kind = ?warning.kind,
            equity = warning.equity,
            "simulation warning: {warning}"
        );
    }
    tracing::info!(
        days = results.summary.days,
        final_equity = results.summary.final_equity,
        annual_return = results.summary.annual_return,
        sharpe_ratio = results.summary.sharpe_ratio,
        volatility = results.summary.volatility,
        max_drawdown = results.summary.max_drawdown,
        "backtest complete"
    );
}

fn timing_event(
    run_id: &str,
    action: &str,
    duration_ms: u64,
    details: serde_json::Value,
) -> AuditEvent {
    AuditEvent {
        run_id: run_id.to_string(),
        day: 0,
        date: None,
        stage: "timing".to_string(),
        action: action.to_string(),
        error: None,
        details: serde_json::json!({
            "duration_ms": duration_ms,
            "details": details,
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_outputs(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    bars: &[DailyBar],
    results: BacktestResults,
    config_snapshot: &serde_json::Value,
    artifacts: &dyn ArtifactWriter,
    mut audit_extras: Vec<AuditEvent>,
) -> Result<PathBuf, String> {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_daily_csv(
        run_dir.join("daily.csv").as_path(),
        bars,
        &results.states,
        &results.drawdown,
    )?;

    let meta = summary_meta_json(config, bars, results.warnings.len());
    artifacts.write_summary_json(
        run_dir.join("summary.json").as_path(),
        &results.summary,
        Some(&meta),
        Some(config_snapshot),
    )?;

    if analyzers_enabled(config) {
        let analyzers_dir = run_dir.join("analyzers");
        artifacts.ensure_dir(&analyzers_dir)?;
        let input = AnalyzerInput {
            bars,
            states: &results.states,
            drawdown: &results.drawdown,
            summary: &results.summary,
        };
        for analyzer in built_in_analyzers(drawdown_top_n(config)) {
            let value = analyzer
                .analyze(&input)
                .map_err(|err| format!("analyzer {} failed: {err}", analyzer.name()))?;
            artifacts.write_analyzer_json(
                analyzers_dir
                    .join(format!("{}.json", analyzer.name()))
                    .as_path(),
                &value,
            )?;
        }
    }

    let mut audit_events = results.audit_events;
    audit_events.append(&mut audit_extras);
    audit_events.sort_by_key(|event| event.day);
    artifacts.write_audit_jsonl(run_dir.join("logs.jsonl").as_path(), &audit_events)?;

    artifacts
        .write_config_snapshot_toml(run_dir.join("config_snapshot.toml").as_path(), config_toml)?;

    Ok(run_dir)
}

use std::path::PathBuf;

pub(super) fn run_sweep(sweep_path: PathBuf) -> Result<serde_json::Value, String> {
    tracing::info!(sweep = %sweep_path.display(), "sweep requested");

    let crate::infra::SweepDeps {
        bar_table,
        artifacts,
    } = crate::infra::build_sweep_deps();
    let result = meridian_application::experiments::sweep::run_sweep(
        &sweep_path,
        bar_table.as_ref(),
        &artifacts,
    )?;

    let failed = result.runs.iter().filter(|run| run.status == "error").count();
    let skipped = result
        .runs
        .iter()
        .filter(|run| run.status == "skipped")
        .count();
    if failed > 0 {
        tracing::warn!(failed, "some sweep runs failed; see manifest.json");
    }

    Ok(serde_json::json!({
        "status": "ok",
        "mode": "sweep",
        "sweep_id": result.sweep_id,
        "runs": result.runs.len(),
        "failed": failed,
        "skipped": skipped,
        "artifacts": {
            "sweep_dir": result.sweep_dir.display().to_string(),
            "manifest_json": result.sweep_dir.join("manifest.json").display().to_string(),
            "results_csv": result.sweep_dir.join("results.csv").display().to_string(),
            "leaderboard_csv": result.sweep_dir.join("leaderboard.csv").display().to_string(),
        },
    }))
}

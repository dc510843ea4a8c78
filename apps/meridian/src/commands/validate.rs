use std::path::PathBuf;

pub(super) fn run_validate(
    config_path: PathBuf,
    strict: bool,
    out: Option<PathBuf>,
) -> Result<serde_json::Value, String> {
    let config = meridian_application::config::load_config(&config_path)?;
    tracing::info!(
        config = %config_path.display(),
        input_path = %config.paths.input_path,
        strict,
        "validate requested"
    );

    let crate::infra::ValidateDeps { bar_table } = crate::infra::build_validate_deps();
    let report = meridian_application::validation::validate(&config, strict, bar_table.as_ref())?;

    if let Some(out_path) = out {
        std::fs::write(&out_path, report.to_string())
            .map_err(|err| format!("failed to write report {}: {}", out_path.display(), err))?;
    }

    Ok(serde_json::json!({
        "status": "ok",
        "mode": "validate",
        "strict": strict,
        "run_id": config.run.run_id,
        "report": report,
    }))
}

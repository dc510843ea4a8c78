use std::net::SocketAddr;

/// `MERIDIAN_LOG` wins over `--log-level` so filters like
/// `meridian_application=debug` can be set without touching the command line.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), String> {
    let filter = std::env::var("MERIDIAN_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    match log_format.trim().to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
        other => return Err(format!("unsupported --log-format '{other}' (text|json)")),
    }
    Ok(())
}

fn resolve_metrics_addr(metrics_addr: Option<&str>) -> Option<String> {
    metrics_addr
        .map(str::to_string)
        .or_else(|| std::env::var("MERIDIAN_METRICS_ADDR").ok())
        .filter(|raw| !raw.trim().is_empty())
}

#[cfg(feature = "prometheus")]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = resolve_metrics_addr(metrics_addr) else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .trim()
        .parse()
        .map_err(|err| format!("invalid --metrics-addr (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    if resolve_metrics_addr(metrics_addr).is_some() {
        return Err("metrics exporter requires meridian feature `prometheus`".to_string());
    }
    Ok(None)
}

mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use meridian_application::validation::STRICT_FAILURE_PREFIX;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meridian")]
#[command(
    about = "Single-instrument daily portfolio simulator",
    version,
    arg_required_else_help = true
)]
#[command(
    after_help = "Examples:\n  meridian backtest --config configs/sample.toml --out runs/\n  meridian validate --config configs/sample.toml --strict\n  meridian sweep --sweep configs/sweep.toml\n"
)]
struct Cli {
    /// Log filter used when MERIDIAN_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// text | json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Serve Prometheus metrics on host:port (falls back to MERIDIAN_METRICS_ADDR).
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Simulate the configured table and write the run directory.
    Backtest {
        /// Config file path (TOML). If omitted, uses env MERIDIAN_CONFIG.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the input table without simulating it.
    Validate {
        /// Config file path (TOML). If omitted, uses env MERIDIAN_CONFIG.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Fail (exit code 2) on any table quality issue.
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Also write the JSON report to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a parameter grid over one base config.
    Sweep {
        #[arg(long)]
        sweep: PathBuf,
    },
}

fn resolve_config(config: Option<PathBuf>) -> Result<PathBuf, String> {
    config
        .or_else(|| {
            std::env::var("MERIDIAN_CONFIG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
        .ok_or_else(|| "missing --config and env MERIDIAN_CONFIG is not set".to_string())
}

fn exit_code_for(err: &str) -> i32 {
    if err.contains(STRICT_FAILURE_PREFIX) {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Backtest { config, out } => {
            resolve_config(config).map(|config| Command::Backtest { config, out })
        }
        CliCommand::Validate {
            config,
            strict,
            out,
        } => resolve_config(config).map(|config| Command::Validate {
            config,
            strict,
            out,
        }),
        CliCommand::Sweep { sweep } => Ok(Command::Sweep { sweep }),
    };

    match command.and_then(commands::run) {
        Ok(json) => {
            println!(
                "{}",
                serde_json::to_string(&json)
                    .unwrap_or_else(|_| "{\"status\":\"error\",\"error\":\"json\"}".to_string())
            );
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{exit_code_for, Cli};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn strict_failures_map_to_exit_code_two() {
        assert_eq!(
            exit_code_for("strict validation failed: table quality issues (rows=1)"),
            2
        );
        assert_eq!(exit_code_for("failed to read config x.toml: not found"), 1);
    }
}

mod backtest;
mod sweep;
mod validate;

use std::path::PathBuf;

pub enum Command {
    Backtest {
        config: PathBuf,
        out: Option<PathBuf>,
    },
    Validate {
        config: PathBuf,
        strict: bool,
        out: Option<PathBuf>,
    },
    Sweep {
        sweep: PathBuf,
    },
}

pub fn run(command: Command) -> Result<serde_json::Value, String> {
    match command {
        Command::Backtest { config, out } => backtest::run_backtest(config, out),
        Command::Validate {
            config,
            strict,
            out,
        } => validate::run_validate(config, strict, out),
        Command::Sweep { sweep } => sweep::run_sweep(sweep),
    }
}

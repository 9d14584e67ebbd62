//! Maintenance tool for a subscription store.
//!
//! # Responsibility
//! - Open (and initialize) a store file, run one expiry sweep, print the result.
//! - Keep output line-oriented so it can be piped into a notifier script.
//! - With `--log-dir`, record store events in rolling log files.
//!
//! Usage: `webpush_cli [--log-dir <dir>] <db-path> [<warning-secs> <expire-secs>]`

use std::path::PathBuf;
use std::process::ExitCode;
use webpush_core::{Store, StoreConfig, SweepConfig};

const USAGE: &str = "usage: webpush_cli [--log-dir <dir>] <db-path> [<warning-secs> <expire-secs>]";

#[derive(Debug)]
struct CliArgs {
    config: StoreConfig,
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let CliArgs { config, log_dir } = parse_args(args)?;
    config.validate().map_err(|err| err.to_string())?;

    if let Some(log_dir) = &log_dir {
        webpush_core::init_logging(webpush_core::default_log_level(), log_dir)
            .map_err(|err| err.to_string())?;
    }

    println!("webpush_core version={}", webpush_core::core_version());

    let store = Store::from_config(&config).map_err(|err| err.to_string())?;
    let outcome = store
        .sweep_with_config(&config.sweep)
        .map_err(|err| err.to_string())?;

    println!(
        "sweep expired_rows={} warned_rows={} targets={}",
        outcome.expired_rows,
        outcome.warned_rows,
        outcome.targets.len()
    );
    for target in &outcome.targets {
        println!(
            "warn endpoint={} user_id={}",
            target.endpoint,
            target.user_id.as_deref().unwrap_or("-")
        );
    }

    store.close().map_err(|err| err.to_string())
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let (log_dir, rest) = match args {
        [flag, dir, rest @ ..] if flag == "--log-dir" => (Some(PathBuf::from(dir)), rest),
        [flag] if flag == "--log-dir" => return Err("--log-dir requires a directory".to_string()),
        _ => (None, args),
    };
    Ok(CliArgs {
        config: parse_config(rest)?,
        log_dir,
    })
}

fn parse_config(args: &[String]) -> Result<StoreConfig, String> {
    match args {
        [db_path] => Ok(StoreConfig::new(db_path)),
        [db_path, warning, expire] => Ok(StoreConfig {
            db_path: db_path.into(),
            sweep: SweepConfig {
                warning_after_secs: parse_secs("warning-secs", warning)?,
                expire_after_secs: parse_secs("expire-secs", expire)?,
            },
        }),
        _ => Err(USAGE.to_string()),
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64, String> {
    value
        .parse()
        .map_err(|err| format!("invalid {name} `{value}`: {err}"))
}

mod config;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use strata_runtime::StreamingManager;

use crate::config::{AppConfig, load_app_config};
use crate::session::SessionOptions;

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Headless chunk streaming driver")]
struct Cli {
    /// TOML config with `seed`, `save_dir`, `log_level` and world/streaming sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// World seed (overrides the config file)
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<i32>,
    /// Number of observer ticks to simulate
    #[arg(long, default_value_t = 200)]
    cycles: u32,
    /// Directory for modified chunks (overrides the config file)
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// off, error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,
    /// Milliseconds between ticks
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut cfg = match cli.config.as_deref() {
        Some(path) => match load_app_config(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if let Some(dir) = cli.save_dir {
        cfg.save_dir = Some(dir);
    }
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }

    let level = cfg.level().unwrap_or(LevelFilter::Info);
    if let Err(e) = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger unavailable: {e}");
    }
    if cfg.level().is_none() {
        log::warn!("unknown log level `{}`; using info", cfg.log_level);
    }

    log::info!("starting world with seed {}", cfg.seed);
    let mut mgr = match StreamingManager::start(cfg.start_options()) {
        Ok(mgr) => mgr,
        Err(e) => {
            log::error!("failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("spawn point {:?}", mgr.spawn_point());

    let opts = SessionOptions {
        ticks: cli.cycles,
        tick: Duration::from_millis(cli.tick_ms),
        ..SessionOptions::default()
    };
    let presenter = session::run(&mgr, &opts);
    let stats = mgr.stats();
    let report = mgr.shutdown();
    log::info!(
        "done: {} materialized, {} destroyed, {} quads, {} chunks generated, {} evicted, {} saved at shutdown",
        presenter.materialized,
        presenter.destroyed,
        presenter.quads,
        stats.generated_total,
        stats.evicted_total,
        report.saved
    );
    if report.failed > 0 {
        log::warn!("{} chunks could not be saved", report.failed);
    }
    ExitCode::SUCCESS
}

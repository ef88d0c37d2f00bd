//! CLI definition and dispatch.
//!
//! Every mode follows the same startup order: load config, open the
//! history store, authenticate against the venue (fatal on failure),
//! then run the mode.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::ig_venue_adapter::{IgCredentials, IgVenueAdapter};
use crate::adapters::sqlite_store_adapter::SqliteStoreAdapter;
use crate::domain::capture;
use crate::domain::engine;
use crate::domain::error::IgTraderError;
use crate::domain::scheduler;
use crate::domain::training;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "igtrader", about = "IG Markets trading bot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture historical prices into the local store
    CaptureData {
        #[arg(short, long)]
        config: PathBuf,
        /// Override [trading] history_start_date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,
    },
    /// Run the live trading loop until the process is stopped
    Trade {
        #[arg(short, long)]
        config: PathBuf,
        /// Override [trading] interval, in seconds
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Train the offline predictor from stored history
    Train {
        #[arg(short, long)]
        config: PathBuf,
        /// Output path for the model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Output path for the scaling bounds artifact
        #[arg(long)]
        scaling: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::CaptureData { config, start_date } => {
            run_capture_data(&config, start_date.as_deref())
        }
        Command::Trade { config, interval } => run_trade(&config, interval),
        Command::Train {
            config,
            model,
            scaling,
        } => run_train(&config, model.as_ref(), scaling.as_ref()),
    }
}

/// Trading parameters shared by all modes.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub epics: Vec<String>,
    pub interval: u32,
    pub history_start_date: NaiveDate,
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = IgTraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn parse_epics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn build_trading_config(adapter: &dyn ConfigPort) -> Result<TradingConfig, IgTraderError> {
    let epics_str =
        adapter
            .get_string("trading", "epics")
            .ok_or_else(|| IgTraderError::ConfigMissing {
                section: "trading".into(),
                key: "epics".into(),
            })?;
    let epics = parse_epics(&epics_str);
    if epics.is_empty() {
        return Err(IgTraderError::ConfigInvalid {
            section: "trading".into(),
            key: "epics".into(),
            reason: "no epics configured".into(),
        });
    }

    let interval = adapter.get_int("trading", "interval", 10);
    if interval <= 0 {
        return Err(IgTraderError::ConfigInvalid {
            section: "trading".into(),
            key: "interval".into(),
            reason: "interval must be a positive number of seconds".into(),
        });
    }

    let start_str = adapter
        .get_string("trading", "history_start_date")
        .ok_or_else(|| IgTraderError::ConfigMissing {
            section: "trading".into(),
            key: "history_start_date".into(),
        })?;
    let history_start_date = parse_date(&start_str)?;

    Ok(TradingConfig {
        epics,
        interval: interval as u32,
        history_start_date,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, IgTraderError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| IgTraderError::ConfigInvalid {
        section: "trading".into(),
        key: "history_start_date".into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

fn open_store(adapter: &FileConfigAdapter) -> Result<SqliteStoreAdapter, ExitCode> {
    let store = SqliteStoreAdapter::from_config(adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    store.initialize_schema().map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok(store)
}

fn authenticate(adapter: &FileConfigAdapter) -> Result<IgVenueAdapter, ExitCode> {
    let credentials = IgCredentials::from_config(adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    eprintln!(
        "Logging in to IG ({}) as {}",
        if credentials.demo { "demo" } else { "live" },
        credentials.username
    );
    IgVenueAdapter::login(&credentials).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_capture_data(config_path: &PathBuf, start_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut trading = match build_trading_config(&adapter) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(s) = start_override {
        trading.history_start_date = match parse_date(s) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
    }

    let store = match open_store(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let venue = match authenticate(&adapter) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let end_date = Utc::now().date_naive();
    eprintln!(
        "Capturing history for {} epics, {} to {}",
        trading.epics.len(),
        trading.history_start_date,
        end_date
    );

    match capture::run_capture(
        &venue,
        &store,
        &trading.epics,
        trading.history_start_date,
        end_date,
        trading.interval,
    ) {
        Ok(count) => {
            eprintln!("Captured {} records", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_trade(config_path: &PathBuf, interval_override: Option<u32>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut trading = match build_trading_config(&adapter) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(interval) = interval_override {
        if interval == 0 {
            eprintln!("error: interval must be a positive number of seconds");
            return ExitCode::from(2);
        }
        trading.interval = interval;
    }

    let store = match open_store(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let venue = match authenticate(&adapter) {
        Ok(v) => v,
        Err(code) => return code,
    };

    eprintln!(
        "Starting trading bot with an interval of {} seconds.",
        trading.interval
    );

    // The sender stays alive for the life of the loop: the scheduler only
    // returns when the process is stopped from outside.
    let (_stop_tx, stop_rx) = mpsc::channel::<()>();
    let epics = trading.epics;

    scheduler::run_every(
        Duration::from_secs(u64::from(trading.interval)),
        &stop_rx,
        || {
            eprintln!("Running trading logic...");
            let summary = engine::run_tick(&venue, &store, &epics);
            eprintln!(
                "Tick complete: {} evaluated, {} orders, {} skipped",
                summary.evaluated, summary.orders, summary.skipped
            );
        },
    );

    ExitCode::SUCCESS
}

fn run_train(
    config_path: &PathBuf,
    model_path: Option<&PathBuf>,
    scaling_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let store = match open_store(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    // The session is established before every mode; training itself never
    // touches the venue.
    if let Err(code) = authenticate(&adapter) {
        return code;
    }

    let records = match store.all_records() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Training on {} stored records", records.len());

    let model = match training::train_from_records(&records) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "Fit complete: {} epochs, final error {:.6}",
        model.report.epochs_run, model.report.final_error
    );

    let model_out = model_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("model.json"));
    let scaling_out = scaling_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("scaling.json"));

    if let Err(code) = write_artifact(&model_out, &model.predictor) {
        return code;
    }
    if let Err(code) = write_artifact(&scaling_out, &model.scaling) {
        return code;
    }

    eprintln!(
        "Model written to {}, scaling to {}",
        model_out.display(),
        scaling_out.display()
    );
    ExitCode::SUCCESS
}

fn write_artifact<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), ExitCode> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        eprintln!("error: failed to encode artifact: {e}");
        ExitCode::from(1)
    })?;
    fs::write(path, json).map_err(|e| {
        eprintln!("error: failed to write {}: {}", path.display(), e);
        ExitCode::from(1)
    })
}

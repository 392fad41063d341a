use statushub::device_pair::{DevicePair, render_view};
use statushub::error::StatushubError;
use statushub::logger::{initialize as LoggerInitialize, level_from_env};

use relay_core::config::RelayConfig;
use relay_core::requester::RefreshView;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

const CONFIG_DIR_NAME: &str = "statushub";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(RefreshView::Listing(_)) => ExitCode::SUCCESS,
        Ok(RefreshView::Message(_)) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RefreshView, StatushubError> {
    let config_dir = config_dir()?;

    create_dir_all(&config_dir).map_err(|e| StatushubError::Statushub {
        message: format!("Failed to create config directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&config_dir, level_from_env())?;

    info!("StatusHub relay starting");
    info!("Config directory: {}", config_dir.display());

    let mut config = RelayConfig::load(&config_dir)?;
    if config.apply_env_overrides()? {
        info!("Dashboard settings taken from the environment");
    }
    let settings = config.dashboard_settings()?;

    let pair = DevicePair::start(settings, config.refresh_timeout()).await?;
    let view = pair.refresh().await;
    println!("{}", render_view(&view));
    pair.shutdown().await;

    Ok(view)
}

fn config_dir() -> Result<PathBuf, StatushubError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| StatushubError::Statushub {
            message: String::from("No config directory on this platform"),
            location: ErrorLocation::from(Location::caller()),
        })
}

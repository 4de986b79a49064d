pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::rates::RatesArgs;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Rates(RatesArgs),
    Setup,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("sitefx starting...");

    match command {
        AppCommand::Setup => cli::setup::setup(),
        AppCommand::Rates(args) => {
            let config = load_config(config_path)?;
            cli::rates::run(&config, &args).await
        }
    }
}

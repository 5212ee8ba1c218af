//! registry-sync: keeps registry item hierarchies in line with spreadsheet extracts
//!
//! # Usage
//!
//! ```text
//! registry-sync <appius|mto|delivery-order|notification> <CONFIG_SUFFIX> [--config-dir DIR]
//! ```

mod api;
mod cli;
mod config;
mod logging;
mod transfer;

use anyhow::{Context, Result};
use clap::Parser;

use api::{ClientConfig, Credentials, Gateway, RegistryClient};
use cli::Cli;
use config::Config;
use transfer::types::AttributeDeclaration;
use transfer::{Synchronizer, excel, files};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let log_file = config.log_file(&cli.config_suffix, chrono::Local::now().date_naive());
    if let Err(e) = logging::init(&log_file) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    log::info!("Start {} ({})", cli.mode, cli.config_suffix);

    let declarations = match load_declarations(&config) {
        Ok(declarations) => declarations,
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    let gateway = match connect(&config).await {
        Ok(gateway) => gateway,
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Category failures are logged inside the run; the session is closed either way
    if let Err(e) = run(&cli, &config, &declarations, &gateway).await {
        log::error!("{:#}", e);
    }

    gateway.into_backend().close();
    log::info!("Finish");
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load(&cli.config_dir, &cli.config_suffix)?;
    config.validate(cli.mode)?;
    Ok(config)
}

fn load_declarations(config: &Config) -> Result<Vec<AttributeDeclaration>> {
    let declarations = excel::read_declarations(&config.attributes_file, &config.mapping_sheet)
        .context("Failed to read attribute mapping")?;
    config.validate_key(&declarations)?;
    log::info!("Declared attributes {}", declarations.len());
    Ok(declarations)
}

async fn connect(config: &Config) -> Result<Gateway<RegistryClient>> {
    let credentials = Credentials::load(&config.auth_data_file)?;
    let client_config = ClientConfig::new(&config.url, config.request_timeout());
    let client = RegistryClient::connect(&client_config, &credentials)
        .await
        .context("Failed to open registry session")?;
    log::info!("Session is opened");
    Ok(Gateway::new(client).with_page_size(config.search_page_size))
}

async fn run(
    cli: &Cli,
    config: &Config,
    declarations: &[AttributeDeclaration],
    gateway: &Gateway<RegistryClient>,
) -> Result<()> {
    files::apply_renames(&config.files_directory, &config.file_renames)?;

    let mut synchronizer = Synchronizer::new(gateway, config, cli.mode, declarations);
    let summary = synchronizer.run().await?;

    log::info!(
        "Processed {} categories of {} roots, {} failed",
        summary.reports.len() + summary.failed.len(),
        summary.roots,
        summary.failed.len()
    );
    for name in &summary.failed {
        log::warn!("Category {} failed", name);
    }
    Ok(())
}

//! Pagerform CLI
//!
//! Reconcile individual `PagerDuty` objects from the command line.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagerform_provider::ProviderConfig;
use tracing_subscriber::{EnvFilter, fmt};

/// Pagerform CLI: create, read, update, delete and import `PagerDuty` objects.
#[derive(Parser, Debug)]
#[command(name = "pagerform", version, about)]
struct Cli {
    /// TOML file with a `[pagerduty]` table. Environment variables are used
    /// when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `PagerDuty` REST API token.
    #[arg(long, env = "PAGERDUTY_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// REST API base URL.
    #[arg(long, env = "PAGERDUTY_API_URL", global = true)]
    api_url: Option<String>,

    /// Skip the credential probe when connecting.
    #[arg(long, global = true)]
    skip_credentials_validation: bool,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile a single managed object.
    Resource(commands::resource::ResourceArgs),
    /// Find an existing object by name or email.
    Lookup(commands::lookup::LookupArgs),
    /// Check that the configured token is accepted.
    ValidateToken,
    /// Delete add-ons left behind by test runs.
    Sweep,
}

impl Cli {
    fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let mut config = match &self.config {
            Some(path) => ProviderConfig::from_file(path)?,
            None => ProviderConfig::from_env(),
        };
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.clone());
        }
        if self.skip_credentials_validation {
            config = config.with_skip_credentials_validation(true);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.provider_config()?;

    match cli.command {
        Command::ValidateToken => commands::token::run(&config, cli.format).await,
        Command::Resource(ref args) => {
            let api = config.client().await?;
            commands::resource::run(api.as_ref(), args, cli.format).await
        }
        Command::Lookup(ref args) => {
            let api = config.client().await?;
            commands::lookup::run(api.as_ref(), args, cli.format).await
        }
        Command::Sweep => {
            let api = config.client().await?;
            commands::sweep::run(api.as_ref(), cli.format).await
        }
    }
}

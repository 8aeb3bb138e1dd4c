//! tbnctl - command line administration client for the Turbine Labs API
//!
//! CRUD over zones, clusters, domains, routes, shared rules, proxies, users
//! and access tokens, plus zone export/import and deep deletion.

mod api;
mod cli;
mod config;
mod deleter;
mod error;
mod filter;
mod model;
mod output;
mod porter;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};
use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command results
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_canceled(&err) => {
            output::info(&format!("{:#}", err));
            ExitCode::from(2)
        }
        Err(err) => {
            output::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        api_url,
        api_key,
        format,
        command,
        ..
    } = cli;

    let config = if needs_credentials(&command) {
        Config::load(api_url, api_key, format)?
    } else {
        Config::load_optional(api_url, api_key, format)
    };

    match command {
        Commands::List(args) => cli::list::execute(&config, args).await,
        Commands::Get(args) => cli::get::execute(&config, args).await,
        Commands::Create(args) => cli::create::execute(&config, args).await,
        Commands::Edit(args) => cli::edit::execute(&config, args).await,
        Commands::Delete(args) => cli::delete::execute(&config, args).await,
        Commands::InitZone(args) => cli::init_zone::execute(&config, args).await,
        Commands::ExportZone(args) => cli::export_zone::execute(&config, args).await,
        Commands::ImportZone(args) => cli::import_zone::execute(&config, args).await,
        Commands::AccessTokens(args) => cli::access_tokens::execute(&config, args).await,
        Commands::Login(args) => cli::login::execute(&config, args).await,
        Commands::Logout => cli::logout::execute(),
    }
}

/// Login and logout work without an API key or cached token
fn needs_credentials(command: &Commands) -> bool {
    !matches!(command, Commands::Login(_) | Commands::Logout)
}

/// Whether the operator declined a prompt somewhere down the error chain
fn is_canceled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<error::Error>()
            .is_some_and(error::Error::is_canceled)
    })
}

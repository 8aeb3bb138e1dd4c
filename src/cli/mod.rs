//! CLI commands module

pub mod access_tokens;
pub mod create;
pub mod delete;
pub mod edit;
pub mod export_zone;
pub mod get;
pub mod import_zone;
pub mod init_zone;
pub mod input;
pub mod list;
pub mod login;
pub mod logout;

use clap::{Parser, Subcommand};

use crate::config::OutputFormat;
use crate::model::ObjectKind;

/// tbnctl - Turbine Labs API command line client
#[derive(Parser, Debug)]
#[command(name = "tbnctl")]
#[command(version)]
#[command(
    about = "Command line administration client for the Turbine Labs API",
    long_about = None
)]
#[command(propagate_version = true)]
#[command(after_help = format!("Object types: {}", ObjectKind::names()))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL of the API
    #[arg(long, global = true, env = "TBN_API_URL")]
    pub api_url: Option<String>,

    /// API key; when unset the token saved by `login` is used
    #[arg(long, global = true, env = "TBN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Codec for records read and printed
    #[arg(short, long, global = true, env = "TBN_FORMAT", value_enum)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List objects of a type, optionally filtered by attribute
    List(list::ListArgs),

    /// Print one object
    Get(get::GetArgs),

    /// Create an object from stdin or an editor
    Create(create::CreateArgs),

    /// Modify an object from stdin or an editor
    Edit(edit::EditArgs),

    /// Delete an object, optionally with everything depending on it
    Delete(delete::DeleteArgs),

    /// Initialize a zone with routes, domains and proxies
    InitZone(init_zone::InitZoneArgs),

    /// Print a zone and its contents as a portable document
    ExportZone(export_zone::ExportZoneArgs),

    /// Create a zone from an exported document
    ImportZone(import_zone::ImportZoneArgs),

    /// Manage access tokens of the current user
    AccessTokens(access_tokens::AccessTokensArgs),

    /// Log in and cache an access token
    Login(login::LoginArgs),

    /// Forget the cached access token
    Logout,
}

//! Get command

use anyhow::{Context, Result};
use clap::Args;

use crate::api::{dispatch, ApiClient};
use crate::config::Config;
use crate::model::ObjectKind;
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Object type
    #[arg(value_enum)]
    pub kind: ObjectKind,

    /// Key of the object
    pub key: String,
}

pub async fn execute(config: &Config, args: GetArgs) -> Result<()> {
    let client = ApiClient::new(config.clone())?;

    let object = dispatch::get(&client, args.kind, &args.key)
        .await
        .with_context(|| format!("Unable to get {} {}", args.kind, args.key))?;

    output::print_output(&object, config.output_format)?;
    Ok(())
}

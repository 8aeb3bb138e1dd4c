//! Create command

use anyhow::{Context, Result};
use clap::Args;

use crate::api::{dispatch, ApiClient};
use crate::cli::input;
use crate::config::Config;
use crate::model::ObjectKind;
use crate::output;

/// The new object is read from stdin when something is piped in, e.g.
/// `cat cluster.json | tbnctl create cluster`; otherwise an empty object
/// is opened in `$EDITOR`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Object type
    #[arg(value_enum)]
    pub kind: ObjectKind,
}

pub async fn execute(config: &Config, args: CreateArgs) -> Result<()> {
    let format = config.output_format;
    let text = input::stdin_or_editor(format, || {
        Ok(output::encode(&dispatch::zero(args.kind), format)?)
    })?;

    let object = dispatch::decode(args.kind, &text, format)
        .with_context(|| format!("Unable to decode {}", args.kind))?;

    let client = ApiClient::new(config.clone())?;
    let created = dispatch::create(&client, &object)
        .await
        .with_context(|| format!("Unable to create {}", args.kind))?;

    output::print_output(&created, format)?;
    output::success(&format!("Created {} {}", created.kind(), created.key()));
    Ok(())
}

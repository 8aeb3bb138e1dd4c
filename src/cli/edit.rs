//! Edit command

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::api::{dispatch, ApiClient};
use crate::cli::input;
use crate::config::Config;
use crate::model::ObjectKind;
use crate::output;

/// The new version is read from stdin when something is piped in;
/// otherwise the current version is fetched by key and opened in
/// `$EDITOR`. The checksum of the new version must match the stored one.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Object type
    #[arg(value_enum)]
    pub kind: ObjectKind,

    /// Key of the object; required unless the new version is piped in
    pub key: Option<String>,
}

pub async fn execute(config: &Config, args: EditArgs) -> Result<()> {
    let client = ApiClient::new(config.clone())?;
    let format = config.output_format;

    let text = match input::piped_stdin()? {
        Some(text) => text,
        None => {
            let Some(key) = args.key.as_deref() else {
                bail!("a key is required unless the new {} is piped in", args.kind);
            };
            let current = dispatch::get(&client, args.kind, key)
                .await
                .with_context(|| format!("Unable to get {} {}", args.kind, key))?;
            input::edit_text(&output::encode(&current, format)?, format)?
        }
    };

    let object = dispatch::decode(args.kind, &text, format)
        .with_context(|| format!("Unable to decode {}", args.kind))?;

    if let Some(key) = args.key.as_deref() {
        if object.key() != key {
            bail!(
                "key of the edited {} ({}) does not match {}",
                args.kind,
                object.key(),
                key
            );
        }
    }

    let modified = dispatch::modify(&client, &object)
        .await
        .with_context(|| format!("Unable to modify {} {}", args.kind, object.key()))?;

    output::print_output(&modified, format)?;
    output::success(&format!("Modified {} {}", args.kind, modified.key()));
    Ok(())
}

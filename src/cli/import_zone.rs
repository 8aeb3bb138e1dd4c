//! Import zone command

use anyhow::{Context, Result};
use clap::Args;

use crate::api::ApiClient;
use crate::cli::input;
use crate::config::Config;
use crate::output;
use crate::porter::{self, ZoneObjects};

/// The document, as printed by `export-zone`, is read from stdin when
/// something is piped in and from `$EDITOR` otherwise.
///
/// Import is not transactional: when a create fails, the objects created
/// before it stay in place and are printed along with the error.
#[derive(Args, Debug)]
pub struct ImportZoneArgs {
    /// Name of the new zone
    pub name: String,
}

pub async fn execute(config: &Config, args: ImportZoneArgs) -> Result<()> {
    let format = config.output_format;
    let text = input::stdin_or_editor(format, || Ok(String::new()))?;
    let doc: ZoneObjects = output::decode(&text, format).context("Unable to decode zone document")?;

    let client = ApiClient::new(config.clone())?;
    match porter::import_zone(&client, &args.name, doc).await {
        Ok(created) => {
            output::print_output(&created, format)?;
            output::success(&format!(
                "Imported zone {} ({} objects)",
                args.name,
                created.len()
            ));
            Ok(())
        }
        Err(err) => {
            if !err.created.is_empty() {
                output::warning("Objects created before the import failed:");
                output::print_output(&err.created, format)?;
            }
            Err(err).with_context(|| format!("Unable to import zone {}", args.name))
        }
    }
}

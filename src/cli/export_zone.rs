//! Export zone command

use anyhow::{Context, Result};
use clap::Args;

use crate::api::ApiClient;
use crate::config::Config;
use crate::output;
use crate::porter;

/// Keys are replaced with names derived from each record (domains become
/// host:port, routes host:port/path), checksums and cluster instances are
/// dropped. The result can be fed to `import-zone`.
#[derive(Args, Debug)]
pub struct ExportZoneArgs {
    /// Name or key of the zone
    pub zone: String,
}

pub async fn execute(config: &Config, args: ExportZoneArgs) -> Result<()> {
    let client = ApiClient::new(config.clone())?;

    let doc = porter::export_zone(&client, &args.zone)
        .await
        .with_context(|| format!("Unable to export zone {}", args.zone))?;

    output::print_output(&doc, config.output_format)?;
    output::info(&format!(
        "Exported zone {} ({} objects)",
        doc.zone.name,
        doc.len()
    ));
    Ok(())
}

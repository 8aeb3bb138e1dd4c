//! Delete command

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use crate::api::{dispatch, ApiClient};
use crate::cli::input;
use crate::config::Config;
use crate::deleter::{self, DeletePlan};
use crate::model::ObjectKind;
use crate::output;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Object type
    #[arg(value_enum)]
    pub kind: ObjectKind,

    /// Key of the object
    pub key: String,

    /// Also delete (or, for proxies, modify) everything that references
    /// the object. Applies to zone, domain, route and shared_rules.
    #[arg(long)]
    pub deep: bool,

    /// Skip the deep deletion confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn execute(config: &Config, args: DeleteArgs) -> Result<()> {
    let client = ApiClient::new(config.clone())?;

    if args.deep {
        let plan = DeletePlan::for_kind(&client, args.kind, &args.key)
            .await
            .with_context(|| format!("Unable to plan deletion of {} {}", args.kind, args.key))?;

        match plan {
            Some(plan) => return deep_delete(&client, &plan, args.yes).await,
            None => output::warning(&format!("--deep ignored for {} delete", args.kind)),
        }
    }

    let object = dispatch::get(&client, args.kind, &args.key)
        .await
        .with_context(|| format!("Unable to get {} {}", args.kind, args.key))?;

    dispatch::delete(&client, args.kind, &args.key, object.checksum())
        .await
        .with_context(|| format!("Unable to delete {} {}", args.kind, args.key))?;

    output::print_output(&object, config.output_format)?;
    output::success(&format!("Deleted {} {}", args.kind, args.key));
    Ok(())
}

async fn deep_delete(client: &ApiClient, plan: &DeletePlan, yes: bool) -> Result<()> {
    debug!("deep deletion plan has {} change(s)", plan.len());
    let applied = deleter::run(client, plan, |report| {
        if yes {
            eprint!("{}", report);
            return Ok(true);
        }
        input::confirm(&format!("{}Proceed?", report))
    })
    .await?;

    output::success(&format!("Deep deletion applied {} change(s)", applied));
    Ok(())
}

//! Access tokens command

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::api::{ApiClient, ConfigService};
use crate::config::Config;
use crate::model::{AccessToken, AccessTokenFilter, AccessTokenKey};
use crate::output;

#[derive(Args, Debug)]
pub struct AccessTokensArgs {
    #[command(subcommand)]
    pub command: AccessTokensCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccessTokensCommand {
    /// List access tokens
    List,

    /// Create an access token; the signed token is only shown once
    Add {
        /// Summary of the intended token use
        description: String,
    },

    /// Remove an access token
    Remove {
        /// Key of the access token
        key: String,
    },
}

pub async fn execute(config: &Config, args: AccessTokensArgs) -> Result<()> {
    let client = ApiClient::new(config.clone())?;
    let format = config.output_format;

    match args.command {
        AccessTokensCommand::List => {
            let tokens: Vec<AccessToken> = client
                .index(&[])
                .await
                .context("Unable to list access tokens")?;
            output::print_output(&tokens, format)?;
        }

        AccessTokensCommand::Add { description } => {
            let token = client
                .create(&AccessToken {
                    description,
                    ..Default::default()
                })
                .await
                .context("Unable to create access token")?;
            output::print_output(&token, format)?;
            output::warning("Store the signed token now; it cannot be retrieved again");
        }

        AccessTokensCommand::Remove { key } => {
            let key = AccessTokenKey::from(key);
            let mut found: Vec<AccessToken> = client
                .index(&[AccessTokenFilter {
                    access_token_key: Some(key.clone()),
                    ..Default::default()
                }])
                .await
                .with_context(|| format!("Unable to look up access token {}", key))?;
            if found.len() != 1 {
                bail!("unable to locate access token {}", key);
            }
            let token = found.remove(0);

            client
                .delete::<AccessToken>(&key, &token.checksum)
                .await
                .with_context(|| format!("Unable to remove access token {}", key))?;
            output::print_output(&token, format)?;
            output::success(&format!("Removed access token {}", key));
        }
    }

    Ok(())
}

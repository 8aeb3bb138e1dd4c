//! Login command

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::cli::input;
use crate::config::{Config, TokenCache, AUTH_CLIENT_ID, AUTH_CLIENT_KEY, AUTH_PROVIDER_URL};
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// User name to log in as; prompted for when omitted
    #[arg(long)]
    pub username: Option<String>,

    /// Password; prompted for when omitted
    #[arg(long, env = "TBN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Token endpoint response of the identity provider
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cache(self, username: String, now: DateTime<Utc>) -> TokenCache {
        TokenCache {
            username,
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

pub async fn execute(config: &Config, args: LoginArgs) -> Result<()> {
    let cache = TokenCache::load()?;

    let username = match args.username {
        Some(u) => u,
        None => input::prompt("Username", Some(&cache.username))?,
    };
    if username.trim().is_empty() {
        bail!("Username must not be blank");
    }

    let password = match args.password {
        Some(p) => p,
        None => input::prompt_secret("Password")?,
    };
    if password.is_empty() {
        bail!("password must not be empty");
    }

    let client = Client::builder()
        .user_agent(concat!("tbnctl/", env!("CARGO_PKG_VERSION")))
        .timeout(config.timeout)
        .build()?;
    let token = request_token(&client, AUTH_PROVIDER_URL, &username, &password).await?;

    let path = token
        .into_cache(username.clone(), Utc::now())
        .save()
        .context("unable to save new token")?;
    debug!("token cached in {}", path.display());

    output::success(&format!("Logged in as {}", username));
    Ok(())
}

/// OAuth2 password grant against the provider's token endpoint
async fn request_token(
    client: &Client,
    provider_url: &str,
    username: &str,
    password: &str,
) -> Result<TokenResponse> {
    let url = format!(
        "{}/protocol/openid-connect/token",
        provider_url.trim_end_matches('/')
    );
    let body = [
        ("grant_type", "password"),
        ("client_id", AUTH_CLIENT_ID),
        ("client_secret", AUTH_CLIENT_KEY),
        ("username", username),
        ("password", password),
    ]
    .iter()
    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&");

    debug!("POST {}", url);
    let response = client
        .post(&url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(anyhow!(
            "unable to authenticate using username {:?} and password: {} {}",
            username,
            status,
            text.trim()
        ));
    }

    serde_json::from_str(&text).context("unexpected token response")
}

//! Logout command

use anyhow::{Context, Result};

use crate::config::TokenCache;
use crate::output;

pub fn execute() -> Result<()> {
    let mut cache = TokenCache::load()?;
    cache.clear_token();
    let path = cache.save().context("Unable to invalidate cached auth token")?;

    output::success(&format!("Logged out ({})", path.display()));
    Ok(())
}

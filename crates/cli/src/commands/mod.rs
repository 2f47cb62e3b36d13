pub mod config;
pub mod fetch;
pub mod negotiate;

use std::env;

use anyhow::{bail, Context, Result};

use rebill_core::{AccountCode, Credentials};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(error: &anyhow::Error) -> Self {
        Self { exit_code: 1, output: format!("error: {error:#}") }
    }
}

pub(crate) fn credentials_from_env() -> Result<Credentials> {
    let username = env::var("REBILL_USERNAME")
        .context("REBILL_USERNAME is not set; export the back-office username")?;
    let password = env::var("REBILL_PASSWORD")
        .context("REBILL_PASSWORD is not set; export the back-office password")?;
    Ok(Credentials::new(username, password))
}

pub(crate) fn account_codes(raw: &[String]) -> Result<Vec<AccountCode>> {
    if raw.is_empty() {
        bail!("no account codes given; pass at least one --code");
    }
    Ok(raw.iter().map(|code| AccountCode(code.clone())).collect())
}

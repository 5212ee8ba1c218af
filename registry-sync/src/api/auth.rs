//! Token acquisition for the registry API

use std::path::Path;

use anyhow::{Context, Result, bail};

use super::models::TokenInfo;

/// Environment variable that overrides the credentials file contents
pub const AUTH_ENV_VAR: &str = "REGISTRY_AUTH";

/// Form-encoded credentials for the password grant
/// (`grant_type=password&username=..&password=..&client_id=..&client_secret=..`)
#[derive(Clone)]
pub struct Credentials {
    form: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(form: impl Into<String>) -> Self {
        Self {
            form: form.into().trim().to_string(),
        }
    }

    /// Load credentials from `REGISTRY_AUTH`, falling back to the given file
    pub fn load(auth_file: &Path) -> Result<Self> {
        if let Ok(form) = std::env::var(AUTH_ENV_VAR) {
            if !form.trim().is_empty() {
                log::debug!("Using credentials from {}", AUTH_ENV_VAR);
                return Ok(Self::new(form));
            }
        }

        let form = std::fs::read_to_string(auth_file)
            .with_context(|| format!("Failed to read credentials file: {}", auth_file.display()))?;
        if form.trim().is_empty() {
            bail!("Credentials file is empty: {}", auth_file.display());
        }
        Ok(Self::new(form))
    }

    pub fn form(&self) -> &str {
        &self.form
    }
}

/// Request a bearer token from `{base_url}connect/token`
///
/// Any failure here is fatal for the run: without a token no other call can succeed.
pub async fn acquire_token(
    http: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
) -> Result<TokenInfo> {
    let url = format!("{}connect/token", base_url);

    let response = http
        .post(&url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(credentials.form().to_string())
        .send()
        .await
        .with_context(|| format!("Token request to {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Token request rejected with status {}: {}", status, body);
    }

    let token: TokenInfo = response
        .json()
        .await
        .context("Failed to parse token response")?;

    log::info!(
        "Token acquired (type {}, expires in {}s)",
        token.token_type.as_deref().unwrap_or("bearer"),
        token.expires_in.unwrap_or_default()
    );
    Ok(token)
}

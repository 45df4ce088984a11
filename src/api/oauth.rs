//! Keeps the OAuth access token for the Sheets and Drive APIs fresh.
//!
//! The consent flow that first produces `token.json` happens outside this app. Here we only load
//! the credential files and, when the access token is about to expire, exchange the refresh token
//! for a new one and save it back to `token.json`.

use crate::api::files::{File, SecretFile, TokenFile};
use crate::error::Res;
use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{
    ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken, TokenResponse, TokenUrl,
};
use std::path::Path;
use tracing::{debug, info};

/// Google omits `expires_in` only in error cases, but assume an hour if it does.
const DEFAULT_EXPIRY_SECS: i64 = 3600;

/// An OAuth client that only knows its token endpoint.
type RefreshClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the client credentials and the current token.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Loads and validates both credential files.
    pub(crate) async fn load(
        secret_path: impl AsRef<Path>,
        token_path: impl AsRef<Path>,
    ) -> Res<Self> {
        let secret_path = secret_path.as_ref();
        let token_path = token_path.as_ref();
        let secret = SecretFile::load(secret_path)
            .await
            .with_context(|| format!("Bad client secret file at {}", secret_path.display()))?;
        let token = TokenFile::load(token_path)
            .await
            .with_context(|| format!("Bad token file at {}", token_path.display()))?;
        Ok(Self {
            secret,
            token: File::new(token_path, token),
        })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// Returns an access token, refreshing it first if it is expired or about to be.
    pub(crate) async fn token_with_refresh(&mut self) -> Res<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Exchanges the refresh token for a new access token and saves it.
    async fn refresh(&mut self) -> Res<()> {
        debug!(
            "The access token expired at {}, refreshing",
            self.token.data().expires_at()
        );
        let refresh_token = self.token.data().refresh_token();
        if refresh_token.is_empty() {
            bail!("The token file has no refresh token");
        }

        let client = refresh_client(&self.secret)?;
        let http_client = reqwest::ClientBuilder::new()
            // The token endpoint is never followed through a redirect.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to build the HTTP client")?;
        let refreshed = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| anyhow!("Token refresh failed: {e}"))?;

        let expires_in = refreshed
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_EXPIRY_SECS));
        self.token.data_mut().update(
            refreshed.access_token().secret().to_string(),
            Utc::now() + expires_in,
            refreshed.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save().await?;
        info!("Refreshed the access token in {}", self.token.path().display());
        Ok(())
    }
}

fn refresh_client(secret: &SecretFile) -> Res<RefreshClient> {
    let token_url = TokenUrl::new(secret.token_uri().to_string())
        .with_context(|| format!("Invalid token_uri '{}'", secret.token_uri()))?;
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_token_uri(token_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;
    use tempfile::TempDir;

    async fn provider(
        dir: &TempDir,
        token_uri: &str,
        refresh_token: &str,
        expires_at: &str,
    ) -> TokenProvider {
        let secret = dir.path().join("client_secret.json");
        let token = dir.path().join("token.json");
        utils::write(
            &secret,
            format!(
                r#"{{"installed": {{
                    "client_id": "id",
                    "client_secret": "shh",
                    "redirect_uris": ["http://localhost"],
                    "token_uri": "{token_uri}"
                }}}}"#
            ),
        )
        .await
        .unwrap();
        utils::write(
            &token,
            format!(
                r#"{{
                    "scopes": [
                        "https://www.googleapis.com/auth/spreadsheets",
                        "https://www.googleapis.com/auth/drive.readonly"
                    ],
                    "access_token": "current",
                    "refresh_token": "{refresh_token}",
                    "expires_at": "{expires_at}"
                }}"#
            ),
        )
        .await
        .unwrap();
        TokenProvider::load(&secret, &token).await.unwrap()
    }

    #[tokio::test]
    async fn test_unexpired_token_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let mut p = provider(&dir, "not a url", "rt", "2099-01-01T00:00:00Z").await;
        assert_eq!(p.token_with_refresh().await.unwrap(), "current");
    }

    #[tokio::test]
    async fn test_refresh_needs_a_refresh_token() {
        let dir = TempDir::new().unwrap();
        let token_uri = "https://oauth2.googleapis.com/token";
        let mut p = provider(&dir, token_uri, "", "2020-01-01T00:00:00Z").await;
        let message = p.token_with_refresh().await.unwrap_err().to_string();
        assert!(message.contains("no refresh token"));
    }

    #[tokio::test]
    async fn test_refresh_rejects_a_bad_token_uri() {
        let dir = TempDir::new().unwrap();
        let mut p = provider(&dir, "not a url", "rt", "2020-01-01T00:00:00Z").await;
        let message = format!("{:?}", p.token_with_refresh().await.unwrap_err());
        assert!(message.contains("Invalid token_uri 'not a url'"));
        assert_eq!(p.token(), "current");
    }
}

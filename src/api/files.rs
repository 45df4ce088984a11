//! Serialization structures for the Google OAuth credential files.
//! - `client_secret.json`: the OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the access and refresh tokens for that client

use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// The OAuth client must list this redirect.
const REDIRECT: &str = "http://localhost";

/// Holds the `path` a piece of JSON data came from so it can be saved back to the same place.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Saves the data as pretty JSON, readable only by the owner.
    pub(super) async fn save(&self) -> Res<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write(&self.path, json).await?;
        utils::restrict_permissions(&self.path)
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// The `client_secret.json` file downloaded from Google Cloud Console for a Desktop application.
/// Google wraps the credentials in an "installed" object.
///
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(crate) async fn load(path: &Path) -> Res<SecretFile> {
        utils::deserialize(path)
            .await
            .context("Unable to read the client secret file")
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    redirect_uris: RedirectUris,
    #[serde(default)]
    auth_uri: String,
    token_uri: String,
}

#[derive(Default, Debug, Clone)]
struct RedirectUris(Vec<String>);

impl Serialize for RedirectUris {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RedirectUris {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec = Vec::<String>::deserialize(deserializer)?;
        if !vec.iter().any(|s| is_valid_redirect(s)) {
            return Err(D::Error::custom(format!(
                "At least one of the redirects needs to be {REDIRECT}, but this was not found. \
                When creating the OAuth client, you must include '{REDIRECT}'"
            )));
        }
        Ok(RedirectUris(vec))
    }
}

fn is_valid_redirect(s: &str) -> bool {
    s == REDIRECT || s == "http://127.0.0.1"
}

/// The tokens granted to the OAuth client.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    pub(crate) async fn load(p: impl AsRef<Path>) -> Res<Self> {
        let token_file: Self = utils::deserialize(p.as_ref())
            .await
            .context("Unable to deserialize the token JSON file")?;
        token_file.validate_scopes()?;
        Ok(token_file)
    }

    fn validate_scopes(&self) -> Res<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True if the token is expired or will expire within 5 minutes.
    pub(super) fn is_expired(&self) -> bool {
        let buffer = chrono::Duration::minutes(5);
        self.expires_at <= Utc::now() + buffer
    }

    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_json(dir: &TempDir, json: &str) -> PathBuf {
        let p = dir.path().join("file.json");
        utils::write(&p, json).await.unwrap();
        p
    }

    #[tokio::test]
    async fn test_client_secret_good_redirect() {
        let dir = TempDir::new().unwrap();
        let p = write_json(
            &dir,
            r#"{
                "installed": {
                    "client_id": "abc.apps.googleusercontent.com",
                    "client_secret": "shh",
                    "redirect_uris": ["http://127.0.0.1", "https://example.com:4040/whatever"],
                    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                    "token_uri": "https://oauth2.googleapis.com/token"
                }
            }"#,
        )
        .await;
        let secret = SecretFile::load(&p).await.unwrap();
        assert_eq!(secret.client_id(), "abc.apps.googleusercontent.com");
        assert_eq!(secret.client_secret(), "shh");
        assert_eq!(secret.token_uri(), "https://oauth2.googleapis.com/token");
    }

    #[tokio::test]
    async fn test_client_secret_bad_redirect() {
        let dir = TempDir::new().unwrap();
        let p = write_json(
            &dir,
            r#"{
                "installed": {
                    "client_id": "abc.apps.googleusercontent.com",
                    "client_secret": "shh",
                    "redirect_uris": ["http://localhost:9900"],
                    "token_uri": "https://oauth2.googleapis.com/token"
                }
            }"#,
        )
        .await;
        let message = format!("{:?}", SecretFile::load(&p).await.unwrap_err());
        assert!(message.contains("At least one of the redirects needs to be http://localhost"));
    }

    #[tokio::test]
    async fn test_token_file_missing_scope() {
        let dir = TempDir::new().unwrap();
        let p = write_json(
            &dir,
            r#"{
                "scopes": ["https://www.googleapis.com/auth/spreadsheets"],
                "access_token": "abc12",
                "refresh_token": "xyz89",
                "expires_at": "2025-01-01T00:00:00Z"
            }"#,
        )
        .await;
        let message = TokenFile::load(&p).await.unwrap_err().to_string();
        assert!(message.contains("https://www.googleapis.com/auth/drive.readonly"));
    }

    #[tokio::test]
    async fn test_token_file_expiry() {
        let dir = TempDir::new().unwrap();
        let p = write_json(
            &dir,
            r#"{
                "scopes": [
                    "https://www.googleapis.com/auth/spreadsheets",
                    "https://www.googleapis.com/auth/drive.readonly"
                ],
                "access_token": "abc12",
                "refresh_token": "xyz89",
                "expires_at": "2025-01-01T00:00:00Z"
            }"#,
        )
        .await;
        let mut token = TokenFile::load(&p).await.unwrap();
        assert!(token.is_expired());
        token.update(
            "new".to_string(),
            Utc::now() + chrono::Duration::hours(1),
            None,
        );
        assert!(!token.is_expired());
        assert_eq!(token.access_token(), "new");
        assert_eq!(token.refresh_token(), "xyz89");
    }
}

//! Configuration file handling for finboard.
//!
//! The configuration file is stored at `$FINBOARD_HOME/config.json`. It selects the record store
//! (a local CSV file or a Google sheet) and holds the settings that store needs, along with backup
//! settings and credential file paths.

use crate::api::DEFAULT_SHEET_NAME;
use crate::backup::Backup;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "finboard";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const SECRETS: &str = ".secrets";
const BACKUPS: &str = ".backups";
const CACHE: &str = ".cache";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";
const TRANSACTIONS_CSV: &str = "transactions.csv";
const CACHE_JSON: &str = "transactions.json";

/// Which record store holds the transactions.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// A CSV file on the local filesystem.
    #[default]
    Local,
    /// A tab in a Google sheet.
    Sheet,
}

serde_plain::derive_display_from_serialize!(StoreKind);
serde_plain::derive_fromstr_from_deserialize!(StoreKind);

/// The settings needed to create a new home directory.
#[derive(Debug, Clone)]
pub enum StoreSettings {
    /// Use a local CSV file. When `transactions_path` is `None` the file is
    /// `$FINBOARD_HOME/transactions.csv`.
    Local { transactions_path: Option<PathBuf> },
    /// Use a Google sheet. The credential files are copied into `$FINBOARD_HOME/.secrets`.
    Sheet {
        sheet_url: String,
        sheet_name: Option<String>,
        client_secret: PathBuf,
        token: PathBuf,
    },
}

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FINBOARD_HOME` and from there it loads `$FINBOARD_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    secrets: PathBuf,
    cache: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory and its subdirectories, writes an initial `config.json` and, for
    /// the sheet store, copies the credential files into `.secrets`.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail or if the sheet URL has no spreadsheet id.
    pub async fn create(dir: impl Into<PathBuf>, settings: StoreSettings) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the finboard home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let cache = root.join(CACHE);
        utils::make_dir(&cache).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = match settings {
            StoreSettings::Local { transactions_path } => ConfigFile {
                store: StoreKind::Local,
                transactions_path,
                ..ConfigFile::default()
            },
            StoreSettings::Sheet {
                sheet_url,
                sheet_name,
                client_secret,
                token,
            } => {
                extract_spreadsheet_id(&sheet_url)
                    .context("Failed to extract spreadsheet ID from sheet URL")?;
                let secret_destination = secrets.join(CLIENT_SECRET_JSON);
                utils::copy(&client_secret, &secret_destination).await?;
                utils::restrict_permissions(&secret_destination)?;
                let token_destination = secrets.join(TOKEN_JSON);
                utils::copy(&token, &token_destination).await?;
                utils::restrict_permissions(&token_destination)?;
                ConfigFile {
                    store: StoreKind::Sheet,
                    sheet_url: Some(sheet_url),
                    sheet_name,
                    ..ConfigFile::default()
                }
            }
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            backups,
            secrets,
            cache,
            config_file,
        })
    }

    /// This will
    /// - validate that `finboard_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the backups and secrets directories exist
    /// - return the loaded configuration object
    ///
    /// The sheet URL is not checked here. That happens when the sheet store is opened.
    ///
    /// # Errors
    /// Any failure is a `Config` error.
    pub async fn load(finboard_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(finboard_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The finboard home directory is missing. Run 'finboard init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            backups: root.join(BACKUPS),
            secrets: root.join(SECRETS),
            cache: root.join(CACHE),
            root,
            config_file,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn store(&self) -> StoreKind {
        self.config_file.store
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// The local CSV file, resolved against the home directory if relative.
    pub fn transactions_path(&self) -> PathBuf {
        self.resolve(self.config_file.transactions_path())
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.config_file.sheet_url.as_deref()
    }

    pub fn sheet_name(&self) -> &str {
        self.config_file
            .sheet_name
            .as_deref()
            .unwrap_or(DEFAULT_SHEET_NAME)
    }

    /// The spreadsheet id taken from the configured sheet URL.
    ///
    /// # Errors
    /// Fails if there is no sheet URL or if it does not contain an id.
    pub fn spreadsheet_id(&self) -> Res<&str> {
        let url = self
            .sheet_url()
            .context("The sheet store is selected but config.json has no sheet_url")?;
        extract_spreadsheet_id(url).context("Failed to extract spreadsheet ID from sheet URL")
    }

    /// Where the normalized dataset snapshot is kept between runs.
    pub fn cache_path(&self) -> PathBuf {
        self.cache.join(CACHE_JSON)
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(&self.backups, self.backup_copies())
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    /// Checks if `p` is relative, and if so, resolves it. Returns it unchanged if it is absolute.
    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finboard",
///   "config_version": 1,
///   "store": "sheet",
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "sheet_name": "Transactions",
///   "backup_copies": 5,
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "finboard"
    app_name: String,

    config_version: u8,

    #[serde(default)]
    store: StoreKind,

    /// Defaults to $FINBOARD_HOME/transactions.csv
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transactions_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sheet_url: Option<String>,

    /// Defaults to "Transactions"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sheet_name: Option<String>,

    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// Defaults to $FINBOARD_HOME/.secrets/client_secret.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Defaults to $FINBOARD_HOME/.secrets/token.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            store: StoreKind::Local,
            transactions_path: None,
            sheet_url: None,
            sheet_name: None,
            backup_copies: BACKUP_COPIES,
            client_secret_path: None,
            token_path: None,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn transactions_path(&self) -> PathBuf {
        self.transactions_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(TRANSACTIONS_CSV))
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL, e.g.
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit`.
fn extract_spreadsheet_id(url: &str) -> Res<&str> {
    let url = url.trim();
    if url.is_empty() {
        bail!("The sheet URL is empty");
    }

    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split(['?', '#'])
                .next()
                .unwrap_or(id_part);
            if id.is_empty() {
                break;
            }
            return Ok(id);
        }
    }
    bail!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    )
}

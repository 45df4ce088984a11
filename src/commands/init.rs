use crate::args::InitArgs;
use crate::commands::Out;
use crate::config::{StoreKind, StoreSettings};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::{anyhow, Context};
use std::path::Path;

/// Creates the data directory, its subdirectories and an initial `config.json` for the store
/// chosen in `args`.
///
/// # Arguments
/// - `finboard_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/finboard`
/// - `args` - For the sheet store, `--sheet-url`, `--client-secret` and `--token` are required.
///   The credential files are copied into `$FINBOARD_HOME/.secrets`.
///
/// # Errors
/// - A `Request` error if a sheet setting is missing.
/// - A `Config` error if any file operations fail or the sheet URL is invalid.
pub async fn init(finboard_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let settings = settings(args).pub_result(ErrorType::Request)?;
    let config = Config::create(finboard_home, settings)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the finboard directory at {} using the {} store",
        config.root().display(),
        config.store()
    )
    .into())
}

fn settings(args: &InitArgs) -> anyhow::Result<StoreSettings> {
    let required = |value: Option<&Path>, flag: &str| {
        value
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("--{flag} is required for the sheet store"))
    };
    Ok(match args.store() {
        StoreKind::Local => StoreSettings::Local {
            transactions_path: args.transactions().map(Path::to_path_buf),
        },
        StoreKind::Sheet => StoreSettings::Sheet {
            sheet_url: args
                .sheet_url()
                .context("--sheet-url is required for the sheet store")?
                .to_string(),
            sheet_name: args.sheet_name().map(String::from),
            client_secret: required(args.client_secret(), "client-secret")?,
            token: required(args.token(), "token")?,
        },
    })
}

use crate::api::Mode;
use crate::args::ExportArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::export::export as to_csv;
use crate::filter::filter;
use crate::session::Session;
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// What `finboard export` wrote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExportSummary {
    /// The number of transaction rows, not counting the header.
    pub rows: usize,
    /// The output file, or `stdout`.
    pub destination: String,
}

/// Filters the configured store's transactions and writes them as CSV to `--output`, or to stdout
/// when no output is given.
///
/// # Errors
/// - A `Config` error if the store cannot be opened.
/// - A `Store` error if loading fails.
/// - An `Output` error if the CSV cannot be written.
pub async fn export(config: &Config, mode: Mode, args: &ExportArgs) -> Result<Out<ExportSummary>> {
    let mut session = Session::open(config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    let transactions = session
        .transactions()
        .await
        .context("Unable to load transactions")
        .pub_result(ErrorType::Store)?;

    let f = args.filter();
    let subset = filter(
        &transactions,
        f.from(),
        f.to(),
        f.category().clone(),
        f.kind().clone(),
    );
    let bytes = to_csv(&subset).pub_result(ErrorType::Output)?;

    let destination = match args.output() {
        Some(path) => {
            utils::write(path, &bytes)
                .await
                .pub_result(ErrorType::Output)?;
            path.display().to_string()
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&bytes)
                .await
                .context("Unable to write to stdout")
                .pub_result(ErrorType::Output)?;
            stdout
                .flush()
                .await
                .context("Unable to flush stdout")
                .pub_result(ErrorType::Output)?;
            "stdout".to_string()
        }
    };

    let summary = ExportSummary {
        rows: subset.len(),
        destination,
    };
    Ok(Out::new(
        format!(
            "Exported {} transactions to {}",
            summary.rows, summary.destination
        ),
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::FilterArgs;
    use crate::filter::Selection;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_export_filtered_to_file() {
        let env = TestEnv::new_local().await;
        env.write_transactions(
            "Date,Category,Description,Amount,Type,Payment_Method\n\
             2024-01-02,Food,Lunch,12,Expense,Cash\n\
             2024-01-03,Salary,Pay,900,Income,Transfer\n\
             2024-01-04,Food,Dinner,30,Expense,Card\n",
        )
        .await;
        let output = env.root().join("out.csv");
        let args = ExportArgs::new(
            FilterArgs::new(
                None,
                None,
                Selection::Only("Food".to_string()),
                Selection::All,
            ),
            Some(output.clone()),
        );

        let out = export(env.config(), Mode::Test, &args).await.unwrap();
        assert_eq!(out.structure().unwrap().rows, 2);
        let text = utils::read(&output).await.unwrap();
        assert_eq!(
            text,
            "Date,Category,Description,Amount,Type,Payment_Method\n\
             2024-01-02,Food,Lunch,12,Expense,Cash\n\
             2024-01-04,Food,Dinner,30,Expense,Card\n"
        );
    }

    #[tokio::test]
    async fn test_export_to_missing_directory_is_output_error() {
        let env = TestEnv::new_local().await;
        let args = ExportArgs::new(
            FilterArgs::default(),
            Some(env.root().join("no").join("such").join("dir.csv")),
        );
        let err = export(env.config(), Mode::Test, &args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Output);
    }
}

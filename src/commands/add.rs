use crate::api::Mode;
use crate::args::AddArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::NewEntry;
use crate::session::Session;
use crate::{Config, Result};
use anyhow::Context;
use chrono::Local;

/// Validates the transaction described by `args` and appends it to the configured store. The date
/// defaults to today.
///
/// # Errors
/// - A `Request` error if the transaction is invalid, e.g. a negative amount.
/// - A `Config` error if the store cannot be opened.
/// - A `Store` error if the append fails.
pub async fn add(config: &Config, mode: Mode, args: &AddArgs) -> Result<Out<NewEntry>> {
    let date = args.date().unwrap_or_else(|| Local::now().date_naive());
    let entry = NewEntry::new(
        date,
        args.category(),
        args.description(),
        args.amount(),
        args.kind(),
        args.payment_method(),
    )
    .context("The transaction is invalid")
    .pub_result(ErrorType::Request)?;

    let mut session = Session::open(config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    session
        .append(&entry)
        .await
        .context("Unable to save the transaction")
        .pub_result(ErrorType::Store)?;

    Ok(Out::new(
        format!(
            "Added a {} {} on {} in '{}'",
            entry.amount(),
            entry.r#type(),
            entry.date(),
            args.category()
        ),
        entry,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryType;
    use crate::test::TestEnv;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_add_rejects_negative_amount() {
        let env = TestEnv::new_local().await;
        let args = AddArgs::new(
            None,
            "Food",
            "",
            Decimal::from(-5),
            EntryType::Expense,
            "",
        );
        let err = add(env.config(), Mode::Test, &args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        assert!(!env.config().transactions_path().exists());
    }

    #[tokio::test]
    async fn test_add_defaults_to_today() {
        let env = TestEnv::new_local().await;
        let args = AddArgs::new(None, "Food", "Snack", Decimal::from(3), EntryType::Expense, "Cash");
        let out = add(env.config(), Mode::Test, &args).await.unwrap();
        let entry = out.structure().unwrap();
        assert_eq!(entry.date(), Local::now().date_naive());
        assert!(env.config().transactions_path().is_file());
    }

    #[tokio::test]
    async fn test_add_to_sheet_store() {
        let env = TestEnv::new_sheet().await;
        let args = AddArgs::new(
            NaiveDate::from_ymd_opt(2025, 10, 2),
            "Salary",
            "Pay",
            Decimal::from(4200),
            EntryType::Income,
            "Direct Deposit",
        );
        add(env.config(), Mode::Test, &args).await.unwrap();

        // 17 seeded rows under the header, then ours
        let tab = env.sheet_tab();
        assert_eq!(tab.len(), 19);
        assert_eq!(
            tab[18],
            vec!["2025-10-02", "Salary", "Pay", "4200", "Income", "Direct Deposit"]
        );
    }
}

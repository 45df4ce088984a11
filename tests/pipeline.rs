//! End-to-end runs of the commands against a temporary finboard home.

use chrono::NaiveDate;
use finboard::aggregate::DEFAULT_TOP_N;
use finboard::args::{AddArgs, ExportArgs, FilterArgs, InitArgs, ReportArgs};
use finboard::commands::{self, ReportFormat};
use finboard::filter::Selection;
use finboard::model::EntryType;
use finboard::{forecast_message, render_report, Config, ErrorType, Mode, StoreKind};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

fn report_args(filter: FilterArgs) -> ReportArgs {
    ReportArgs::new(filter, DEFAULT_TOP_N, ReportFormat::Text)
}

fn add_args(date: (i32, u32, u32), category: &str, amount: i64, kind: EntryType) -> AddArgs {
    AddArgs::new(
        NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        category,
        "",
        Decimal::from(amount),
        kind,
        "Cash",
    )
}

async fn init_local(dir: &TempDir) -> (PathBuf, Config) {
    let home = dir.path().join("finboard");
    commands::init(&home, &InitArgs::local(None)).await.unwrap();
    let config = Config::load(&home).await.unwrap();
    assert_eq!(config.store(), StoreKind::Local);
    (home, config)
}

/// Writes a client secret and an unexpired token with the scopes the sheet store requires.
async fn write_credentials(dir: &Path) -> (PathBuf, PathBuf) {
    let secret = dir.join("client_secret.json");
    let token = dir.join("token.json");
    tokio::fs::write(
        &secret,
        r#"{
            "installed": {
                "client_id": "pipeline-client-id",
                "client_secret": "pipeline-secret",
                "redirect_uris": ["http://localhost"],
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#,
    )
    .await
    .unwrap();
    tokio::fs::write(
        &token,
        r#"{
            "scopes": [
                "https://www.googleapis.com/auth/spreadsheets",
                "https://www.googleapis.com/auth/drive.readonly"
            ],
            "access_token": "pipeline-access",
            "refresh_token": "pipeline-refresh",
            "expires_at": "2099-01-01T00:00:00Z"
        }"#,
    )
    .await
    .unwrap();
    (secret, token)
}

#[tokio::test]
async fn test_empty_store_report() {
    let dir = TempDir::new().unwrap();
    let (_, config) = init_local(&dir).await;

    let out = commands::report(&config, Mode::Test, &report_args(FilterArgs::default()))
        .await
        .unwrap();
    let report = out.structure().unwrap();
    assert_eq!(report.count, 0);
    assert_eq!(report.from, None);
    assert_eq!(report.kpis.total_expense, Decimal::ZERO);
    assert!(report.monthly_trend.is_empty());
    assert!(report.top_expenses.is_empty());
    assert_eq!(
        forecast_message(&report.forecast),
        "Not enough months to forecast. Add more data over time."
    );
}

#[tokio::test]
async fn test_add_then_report() {
    let dir = TempDir::new().unwrap();
    let (_, config) = init_local(&dir).await;

    let entries = [
        add_args((2025, 10, 1), "Salary", 3000, EntryType::Income),
        add_args((2025, 10, 4), "Rent", 1200, EntryType::Expense),
        add_args((2025, 10, 9), "Groceries", 80, EntryType::Expense),
    ];
    for entry in &entries {
        commands::add(&config, Mode::Test, entry).await.unwrap();
    }

    let out = commands::report(&config, Mode::Test, &report_args(FilterArgs::default()))
        .await
        .unwrap();
    let report = out.structure().unwrap();
    assert_eq!(report.count, 3);
    assert_eq!(report.from, NaiveDate::from_ymd_opt(2025, 10, 1));
    assert_eq!(report.to, NaiveDate::from_ymd_opt(2025, 10, 9));
    assert_eq!(report.kpis.total_income, Decimal::from(3000));
    assert_eq!(report.kpis.total_expense, Decimal::from(1280));
    assert_eq!(report.kpis.savings, Decimal::from(1720));
    assert_eq!(report.monthly_trend.len(), 2);
    assert!(report
        .monthly_trend
        .iter()
        .all(|m| m.year_month.to_string() == "2025-10"));
    assert_eq!(report.top_expenses.len(), 2);
    assert_eq!(report.top_expenses[1].category(), "Rent");
    assert_eq!(
        report.facets.categories,
        vec!["All", "Groceries", "Rent", "Salary"]
    );

    // a later add is visible to the next report
    commands::add(
        &config,
        Mode::Test,
        &add_args((2025, 11, 2), "Rent", 1200, EntryType::Expense),
    )
    .await
    .unwrap();
    let filter = FilterArgs::new(
        NaiveDate::from_ymd_opt(2025, 11, 1),
        None,
        Selection::new(Some("Rent")),
        Selection::new(Some("Expense")),
    );
    let out = commands::report(&config, Mode::Test, &report_args(filter))
        .await
        .unwrap();
    let report = out.structure().unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.kpis.total_expense, Decimal::from(1200));

    let text = render_report(report, ReportFormat::Text).unwrap();
    assert!(text.contains("Rent"));
    let json = render_report(report, ReportFormat::Json).unwrap();
    assert!(json.contains("\"count\": 1"));
}

#[tokio::test]
async fn test_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let (_, config) = init_local(&dir).await;
    tokio::fs::write(
        config.transactions_path(),
        "Date,Category,Description,Amount,Type,Payment_Method\n\
         9/3/2025,Rent,September rent,\"$1,650.00\",Expense,Bank Transfer\n\
         not a date,Dining,Dropped,$10.00,Expense,Cash\n\
         2025-09-15,Utilities,\"Water, sewer\",$61.20,Expense,Checking\n\
         2025-09-01,Salary,Paycheck,\"$4,200.00\",Income,Direct Deposit\n",
    )
    .await
    .unwrap();

    let output = dir.path().join("out.csv");
    let filter = FilterArgs::new(None, None, Selection::All, Selection::new(Some("Expense")));
    let out = commands::export(
        &config,
        Mode::Test,
        &ExportArgs::new(filter, Some(output.clone())),
    )
    .await
    .unwrap();
    assert_eq!(out.structure().unwrap().rows, 2);

    let content = tokio::fs::read_to_string(&output).await.unwrap();
    assert!(content.starts_with("Date,Category,Description,Amount,Type,Payment_Method"));
    let rows = finboard::store::parse_csv(&content).unwrap();
    let exported = finboard::normalize::normalize(&rows);
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].date(), NaiveDate::from_ymd_opt(2025, 9, 3).unwrap());
    assert_eq!(exported[0].amount().value(), Decimal::from(1650));
    assert_eq!(exported[1].description(), "Water, sewer");
    assert!(exported.iter().all(|t| t.is_expense()));
}

#[tokio::test]
async fn test_sheet_store_reads_seeded_tab() {
    let dir = TempDir::new().unwrap();
    let (secret, token) = write_credentials(dir.path()).await;
    let home = dir.path().join("finboard");
    let id = Uuid::new_v4().to_string().replace('-', "");
    let url = format!("https://docs.google.com/spreadsheets/d/{id}/edit");
    commands::init(&home, &InitArgs::sheet(url, secret, token))
        .await
        .unwrap();
    let config = Config::load(&home).await.unwrap();
    assert_eq!(config.store(), StoreKind::Sheet);

    let out = commands::report(&config, Mode::Test, &report_args(FilterArgs::default()))
        .await
        .unwrap();
    let report = out.structure().unwrap();
    assert_eq!(report.count, 17);
    assert!(report.forecast.amount().is_some());
}

#[tokio::test]
async fn test_sheet_store_without_token_fails() {
    let dir = TempDir::new().unwrap();
    let (secret, token) = write_credentials(dir.path()).await;
    let home = dir.path().join("finboard");
    let url = "https://docs.google.com/spreadsheets/d/pipelineMissingToken/edit";
    commands::init(&home, &InitArgs::sheet(url, secret, token))
        .await
        .unwrap();
    let config = Config::load(&home).await.unwrap();
    tokio::fs::remove_file(config.token_path()).await.unwrap();

    let err = commands::report(&config, Mode::Test, &report_args(FilterArgs::default()))
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Config);

    let err = commands::add(
        &config,
        Mode::Test,
        &add_args((2025, 10, 1), "Food", 5, EntryType::Expense),
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Config);
    assert!(!config.transactions_path().exists());
}

#[tokio::test]
async fn test_unreadable_local_store_is_a_store_error() {
    let dir = TempDir::new().unwrap();
    let (_, config) = init_local(&dir).await;
    // a directory where the CSV file should be
    tokio::fs::create_dir_all(config.transactions_path())
        .await
        .unwrap();

    let err = commands::report(&config, Mode::Test, &report_args(FilterArgs::default()))
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Store);

    let err = commands::add(
        &config,
        Mode::Test,
        &add_args((2025, 10, 1), "Food", 5, EntryType::Expense),
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Store);

    let output = dir.path().join("out.csv");
    let err = commands::export(
        &config,
        Mode::Test,
        &ExportArgs::new(FilterArgs::default(), Some(output.clone())),
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Store);
    assert!(!output.exists());
}

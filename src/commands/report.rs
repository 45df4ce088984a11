use crate::aggregate::{
    breakdown_by_type_and_category, forecast_next_month_expense, kpis, monthly_trend,
    top_expenses, Breakdown, Forecast, Kpis, MonthlyTotal,
};
use crate::api::Mode;
use crate::args::{FilterArgs, ReportArgs};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::filter::{date_bounds, facets, filter, Facets};
use crate::model::Transaction;
use crate::session::Session;
use crate::{Config, Result};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything the dashboard shows for one filtered subset.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Report {
    /// The effective first date, after defaulting to the data. `None` only for an empty store.
    pub from: Option<NaiveDate>,
    /// The effective last date, after defaulting to the data. `None` only for an empty store.
    pub to: Option<NaiveDate>,
    pub category: String,
    pub r#type: String,
    /// The number of transactions in the subset.
    pub count: usize,
    pub kpis: Kpis,
    pub breakdown: Breakdown,
    pub monthly_trend: Vec<MonthlyTotal>,
    /// The largest expenses, largest last.
    pub top_expenses: Vec<Transaction>,
    pub forecast: Forecast,
    /// The filter choices available over the whole dataset.
    pub facets: Facets,
}

impl Report {
    /// Filters `transactions` and computes every aggregate over the subset.
    pub fn build(transactions: &[Transaction], args: &FilterArgs, top_n: usize) -> Self {
        let bounds = date_bounds(transactions);
        let subset = filter(
            transactions,
            args.from(),
            args.to(),
            args.category().clone(),
            args.kind().clone(),
        );
        Self {
            from: args.from().or(bounds.map(|(min, _)| min)),
            to: args.to().or(bounds.map(|(_, max)| max)),
            category: args.category().to_string(),
            r#type: args.kind().to_string(),
            count: subset.len(),
            kpis: kpis(&subset),
            breakdown: breakdown_by_type_and_category(&subset),
            monthly_trend: monthly_trend(&subset),
            top_expenses: top_expenses(&subset, top_n),
            forecast: forecast_next_month_expense(&subset),
            facets: facets(transactions),
        }
    }
}

/// Loads the configured store and builds a `Report` for the filters in `args`.
///
/// # Errors
/// - A `Config` error if the store cannot be opened.
/// - A `Store` error if loading fails.
pub async fn report(config: &Config, mode: Mode, args: &ReportArgs) -> Result<Out<Report>> {
    let mut session = Session::open(config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    let transactions = session
        .transactions()
        .await
        .context("Unable to load transactions")
        .pub_result(ErrorType::Store)?;
    let report = Report::build(&transactions, args.filter(), args.top());
    Ok(Out::new(
        format!(
            "Reporting on {} of {} transactions",
            report.count,
            transactions.len()
        ),
        report,
    ))
}

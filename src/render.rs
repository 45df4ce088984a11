//! Turns a `Report` into the text or JSON printed by `finboard report`.

use crate::aggregate::{CategoryTotal, Forecast, FORECAST_MONTHS};
use crate::commands::{Report, ReportFormat};
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::format_whole;
use crate::Result;
use anyhow::Context;
use std::fmt::Write;

const LABEL_WIDTH: usize = 24;
const VALUE_WIDTH: usize = 14;

/// Renders `report` in `format`.
///
/// # Errors
/// An `Output` error if the report cannot be serialized.
pub fn render(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => text(report).pub_result(ErrorType::Output),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .context("Unable to serialize the report")
            .pub_result(ErrorType::Output),
    }
}

/// The forecast sentence shown under the report.
pub fn forecast_message(forecast: &Forecast) -> String {
    match forecast {
        Forecast::Estimate { amount, .. } => format!(
            "Estimated next month's expense: {} (average of last {FORECAST_MONTHS} months)",
            format_whole(*amount)
        ),
        Forecast::InsufficientData { .. } => {
            "Not enough months to forecast. Add more data over time.".to_string()
        }
    }
}

fn text(report: &Report) -> Res<String> {
    let mut s = String::new();
    let range = match (report.from, report.to) {
        (Some(from), Some(to)) => format!("{from} to {to}"),
        _ => "no data".to_string(),
    };
    writeln!(
        s,
        "{range} | Category: {} | Type: {} | {} transactions",
        report.category, report.r#type, report.count
    )?;
    writeln!(s)?;

    let kpis = &report.kpis;
    for (label, value) in [
        ("Total Income", kpis.total_income),
        ("Total Expense", kpis.total_expense),
        ("Savings", kpis.savings),
        ("Average Daily Spend", kpis.average_daily_spend),
    ] {
        writeln!(s, "{label:<LABEL_WIDTH$}{:>VALUE_WIDTH$}", format_whole(value))?;
    }

    section(&mut s, "Income by Category", report.breakdown.income())?;
    section(&mut s, "Expense by Category", report.breakdown.expense())?;

    writeln!(s)?;
    writeln!(s, "Monthly Trend")?;
    if report.monthly_trend.is_empty() {
        writeln!(s, "  (none)")?;
    }
    for m in &report.monthly_trend {
        let label = format!("{}  {}", m.year_month, m.r#type);
        writeln!(
            s,
            "  {label:<w$}{:>VALUE_WIDTH$}",
            format_whole(m.amount),
            w = LABEL_WIDTH - 2
        )?;
    }

    writeln!(s)?;
    writeln!(s, "Top Expenses")?;
    if report.top_expenses.is_empty() {
        writeln!(s, "  (none)")?;
    }
    for t in &report.top_expenses {
        writeln!(
            s,
            "  {}  {:<16} {:<24}{:>VALUE_WIDTH$}",
            t.date(),
            display_category(t.category()),
            t.description(),
            format_whole(t.amount().value())
        )?;
    }

    writeln!(s)?;
    writeln!(s, "{}", forecast_message(&report.forecast))?;
    Ok(s)
}

fn section<'a>(
    s: &mut String,
    title: &str,
    groups: impl Iterator<Item = &'a CategoryTotal>,
) -> Res<()> {
    writeln!(s)?;
    writeln!(s, "{title}")?;
    let mut any = false;
    for g in groups {
        any = true;
        writeln!(
            s,
            "  {:<w$}{:>VALUE_WIDTH$}",
            display_category(&g.category),
            format_whole(g.amount),
            w = LABEL_WIDTH - 2
        )?;
    }
    if !any {
        writeln!(s, "  (none)")?;
    }
    Ok(())
}

fn display_category(category: &str) -> &str {
    if category.is_empty() {
        "(uncategorized)"
    } else {
        category
    }
}

//! Summary statistics over a subset of transactions.
//!
//! All functions here are pure and accept an empty subset.

use crate::model::{Amount, Transaction, TransactionType, YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The number of trailing months averaged by the baseline forecast.
pub const FORECAST_MONTHS: usize = 3;

/// The default number of rows returned by `top_expenses`.
pub const DEFAULT_TOP_N: usize = 15;

/// Headline numbers for a subset.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Kpis {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// Income minus expense, may be negative.
    pub savings: Decimal,
    /// The mean, over days that had any expense, of that day's total expense.
    pub average_daily_spend: Decimal,
}

pub fn total_income(transactions: &[Transaction]) -> Decimal {
    sum_where(transactions, Transaction::is_income)
}

pub fn total_expense(transactions: &[Transaction]) -> Decimal {
    sum_where(transactions, Transaction::is_expense)
}

fn sum_where(transactions: &[Transaction], predicate: impl Fn(&Transaction) -> bool) -> Decimal {
    transactions
        .iter()
        .filter(|t| predicate(t))
        .map(|t| t.amount())
        .sum::<Amount>()
        .value()
}

/// Adds `amount` to a running total. Totals saturate rather than overflow.
fn add_to(total: &mut Decimal, amount: Amount) {
    *total = total.saturating_add(amount.value());
}

/// Groups expenses by calendar date and averages the per-date totals. Zero when there are no
/// expenses.
pub fn average_daily_spend(transactions: &[Transaction]) -> Decimal {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.is_expense()) {
        add_to(by_date.entry(t.date()).or_default(), t.amount());
    }
    if by_date.is_empty() {
        return Decimal::ZERO;
    }
    let total = by_date.values().fold(Decimal::ZERO, |a, b| a.saturating_add(*b));
    total / Decimal::from(by_date.len())
}

pub fn kpis(transactions: &[Transaction]) -> Kpis {
    let total_income = total_income(transactions);
    let total_expense = total_expense(transactions);
    Kpis {
        total_income,
        total_expense,
        savings: total_income - total_expense,
        average_daily_spend: average_daily_spend(transactions),
    }
}

/// The total for one (type, category) group.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryTotal {
    pub r#type: TransactionType,
    /// May be empty; uncategorized transactions form their own group.
    pub category: String,
    pub amount: Decimal,
}

/// Totals grouped by (type, category), sorted by type then category.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Breakdown {
    groups: Vec<CategoryTotal>,
}

impl Breakdown {
    /// Every group, including types other than income and expense.
    pub fn groups(&self) -> &[CategoryTotal] {
        &self.groups
    }

    /// The income series.
    pub fn income(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.groups.iter().filter(|g| g.r#type.is_income())
    }

    /// The expense series.
    pub fn expense(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.groups.iter().filter(|g| g.r#type.is_expense())
    }
}

pub fn breakdown_by_type_and_category(transactions: &[Transaction]) -> Breakdown {
    let mut totals: BTreeMap<(&str, &str), Decimal> = BTreeMap::new();
    for t in transactions {
        add_to(
            totals
                .entry((t.r#type().as_str(), t.category()))
                .or_default(),
            t.amount(),
        );
    }
    let groups = totals
        .into_iter()
        .map(|((r#type, category), amount)| CategoryTotal {
            r#type: TransactionType::from(r#type),
            category: category.to_string(),
            amount,
        })
        .collect();
    Breakdown { groups }
}

/// The total for one (month, type) pair.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyTotal {
    pub year_month: YearMonth,
    pub r#type: TransactionType,
    pub amount: Decimal,
}

/// Totals grouped by (month, type), in ascending month order and then by type.
pub fn monthly_trend(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut totals: BTreeMap<(YearMonth, &str), Decimal> = BTreeMap::new();
    for t in transactions {
        add_to(
            totals
                .entry((t.year_month(), t.r#type().as_str()))
                .or_default(),
            t.amount(),
        );
    }
    totals
        .into_iter()
        .map(|((year_month, r#type), amount)| MonthlyTotal {
            year_month,
            r#type: TransactionType::from(r#type),
            amount,
        })
        .collect()
}

/// Selects the `n` largest expenses and returns them smallest first, ready to be drawn with the
/// largest last.
///
/// Ties are broken by original order: among equal amounts the earlier transaction is selected
/// first and also listed first.
pub fn top_expenses(transactions: &[Transaction], n: usize) -> Vec<Transaction> {
    let mut expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_expense()).collect();
    // Both sorts are stable.
    expenses.sort_by(|a, b| b.amount().cmp(&a.amount()));
    expenses.truncate(n);
    expenses.sort_by_key(|t| t.amount());
    expenses.into_iter().cloned().collect()
}

/// The baseline estimate for next month's expenses.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Forecast {
    /// Fewer than three months of expense data.
    InsufficientData { months: usize },
    /// The mean of the last three months of expenses.
    Estimate {
        amount: Decimal,
        based_on: Vec<YearMonth>,
    },
}

impl Forecast {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Forecast::InsufficientData { .. } => None,
            Forecast::Estimate { amount, .. } => Some(*amount),
        }
    }
}

/// Sums expenses per month and averages the three most recent months, chronologically.
pub fn forecast_next_month_expense(transactions: &[Transaction]) -> Forecast {
    let mut by_month: BTreeMap<YearMonth, Decimal> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.is_expense()) {
        add_to(by_month.entry(t.year_month()).or_default(), t.amount());
    }
    if by_month.len() < FORECAST_MONTHS {
        return Forecast::InsufficientData {
            months: by_month.len(),
        };
    }
    let last: Vec<(YearMonth, Decimal)> = by_month
        .into_iter()
        .rev()
        .take(FORECAST_MONTHS)
        .rev()
        .collect();
    let total = last
        .iter()
        .fold(Decimal::ZERO, |a, (_, amount)| a.saturating_add(*amount));
    Forecast::Estimate {
        amount: total / Decimal::from(FORECAST_MONTHS),
        based_on: last.into_iter().map(|(month, _)| month).collect(),
    }
}

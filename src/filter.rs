//! Selects the working subset of transactions for a report or export.

use crate::model::Transaction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The sentinel that means "no constraint" for the category and type filters.
pub const ALL: &str = "All";

/// Either no constraint, or an exact string that a field must equal.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `None` and the `All` sentinel both mean no constraint.
    pub fn new(value: Option<&str>) -> Self {
        match value {
            None => Selection::All,
            Some(ALL) => Selection::All,
            Some(s) => Selection::Only(s.to_string()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl FromStr for Selection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Selection::new(Some(s)))
    }
}

impl Display for Selection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::All => f.write_str(ALL),
            Selection::Only(s) => f.write_str(s),
        }
    }
}

/// A date range plus optional category and type constraints, combined with AND. Both date bounds
/// are inclusive.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Filter {
    from: NaiveDate,
    to: NaiveDate,
    category: Selection,
    r#type: Selection,
}

impl Filter {
    pub fn new(from: NaiveDate, to: NaiveDate, category: Selection, r#type: Selection) -> Self {
        Self {
            from,
            to,
            category,
            r#type,
        }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        let date = t.date();
        self.from <= date
            && date <= self.to
            && self.category.matches(t.category())
            && self.r#type.matches(t.r#type().as_str())
    }

    /// Returns the matching transactions in their original order. An inverted range matches
    /// nothing.
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect()
    }
}

/// Filters `transactions`, filling in any missing date bound from the data itself. An empty set
/// short-circuits to an empty result without looking for bounds.
pub fn filter(
    transactions: &[Transaction],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    category: Selection,
    r#type: Selection,
) -> Vec<Transaction> {
    let Some((min, max)) = date_bounds(transactions) else {
        return Vec::new();
    };
    Filter::new(from.unwrap_or(min), to.unwrap_or(max), category, r#type).apply(transactions)
}

/// The earliest and latest dates in `transactions`, or `None` if it is empty.
pub fn date_bounds(transactions: &[Transaction]) -> Option<(NaiveDate, NaiveDate)> {
    let min = transactions.iter().map(|t| t.date()).min()?;
    let max = transactions.iter().map(|t| t.date()).max()?;
    Some((min, max))
}

/// The choices a user can filter by, computed over the whole dataset.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Facets {
    /// The earliest date in the dataset.
    pub min_date: Option<NaiveDate>,
    /// The latest date in the dataset.
    pub max_date: Option<NaiveDate>,
    /// `All` followed by the distinct categories, sorted.
    pub categories: Vec<String>,
    /// `All` followed by the distinct types, sorted.
    pub types: Vec<String>,
}

pub fn facets(transactions: &[Transaction]) -> Facets {
    let bounds = date_bounds(transactions);
    let with_all = |values: BTreeSet<&str>| {
        std::iter::once(ALL)
            .chain(values)
            .map(String::from)
            .collect::<Vec<_>>()
    };
    Facets {
        min_date: bounds.map(|(min, _)| min),
        max_date: bounds.map(|(_, max)| max),
        categories: with_all(transactions.iter().map(|t| t.category()).collect()),
        types: with_all(transactions.iter().map(|t| t.r#type().as_str()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, TransactionType};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(date: NaiveDate, category: &str, r#type: &str) -> Transaction {
        Transaction::new(
            date,
            category,
            "",
            Amount::default(),
            TransactionType::from(r#type),
            "",
        )
    }

    fn data() -> Vec<Transaction> {
        vec![
            txn(ymd(2024, 1, 1), "Food", "Expense"),
            txn(ymd(2024, 1, 15), "Salary", "Income"),
            txn(ymd(2024, 2, 1), "Food", "Expense"),
            txn(ymd(2024, 3, 1), "Rent", "Expense"),
        ]
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let f = Filter::new(ymd(2024, 1, 1), ymd(2024, 2, 1), Selection::All, Selection::All);
        assert_eq!(f.apply(&data()).len(), 3);
    }

    #[test]
    fn test_category_and_type_are_anded() {
        let f = Filter::new(
            ymd(2024, 1, 1),
            ymd(2024, 12, 31),
            Selection::new(Some("Food")),
            Selection::new(Some("Expense")),
        );
        assert_eq!(f.apply(&data()).len(), 2);

        let f = Filter::new(
            ymd(2024, 1, 1),
            ymd(2024, 12, 31),
            Selection::new(Some("Food")),
            Selection::new(Some("Income")),
        );
        assert!(f.apply(&data()).is_empty());
    }

    #[test]
    fn test_all_sentinel_means_no_constraint() {
        assert_eq!(Selection::new(Some("All")), Selection::All);
        assert_eq!(Selection::new(None), Selection::All);
        assert_eq!("All".parse::<Selection>().unwrap(), Selection::All);
        let f = Filter::new(
            ymd(2024, 1, 1),
            ymd(2024, 12, 31),
            Selection::new(Some("All")),
            Selection::All,
        );
        assert_eq!(f.apply(&data()).len(), 4);
    }

    #[test]
    fn test_match_is_exact() {
        let f = Filter::new(
            ymd(2024, 1, 1),
            ymd(2024, 12, 31),
            Selection::new(Some("food")),
            Selection::All,
        );
        assert!(f.apply(&data()).is_empty());
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let f = Filter::new(ymd(2024, 3, 1), ymd(2024, 1, 1), Selection::All, Selection::All);
        assert!(f.apply(&data()).is_empty());
    }

    #[test]
    fn test_filter_defaults_bounds_from_data() {
        let out = filter(&data(), None, None, Selection::All, Selection::All);
        assert_eq!(out, data());
        let out = filter(&data(), Some(ymd(2024, 2, 1)), None, Selection::All, Selection::All);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_filter_empty_input() {
        let out = filter(
            &[],
            Some(ymd(2024, 1, 1)),
            Some(ymd(2024, 2, 1)),
            Selection::All,
            Selection::All,
        );
        assert!(out.is_empty());
        assert_eq!(date_bounds(&[]), None);
    }

    #[test]
    fn test_facets() {
        let f = facets(&data());
        assert_eq!(f.min_date, Some(ymd(2024, 1, 1)));
        assert_eq!(f.max_date, Some(ymd(2024, 3, 1)));
        assert_eq!(f.categories, vec!["All", "Food", "Rent", "Salary"]);
        assert_eq!(f.types, vec!["All", "Expense", "Income"]);

        let empty = facets(&[]);
        assert_eq!(empty.min_date, None);
        assert_eq!(empty.categories, vec!["All"]);
    }
}

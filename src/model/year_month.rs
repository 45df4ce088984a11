use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, used as the key for monthly grouping.
///
/// Serializes to a string like `"2024-03"`. Ordering is chronological, which is also the
/// lexicographic order of the string form.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (1..=12).contains(&month),
            "Month must be between 1 and 12, got {month}"
        );
        anyhow::ensure!(
            (0..=9999).contains(&year),
            "Year must be between 0 and 9999, got {year}"
        );
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        YearMonth::from_date(date)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Expected format: "2024-03"
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("YearMonth must be in format 'YYYY-MM', got: {s}"))?;
        anyhow::ensure!(
            year.len() == 4 && month.len() == 2,
            "YearMonth must be in format 'YYYY-MM', got: {s}"
        );
        let year = year
            .parse::<i32>()
            .map_err(|e| anyhow::anyhow!("Invalid year: {e}"))?;
        let month = month
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("Invalid month: {e}"))?;
        YearMonth::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        YearMonth::from_str(&s).map_err(serde::de::Error::custom)
    }
}

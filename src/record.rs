use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

pub const DEFAULT_REGION: &str = "All India";

/// Vehicle class. The three wheel-count classes are the canonical set;
/// labels the synonym table does not know are carried through upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    TwoWheeler,
    ThreeWheeler,
    FourWheeler,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::TwoWheeler => "2W",
            Category::ThreeWheeler => "3W",
            Category::FourWheeler => "4W",
            Category::Other(s) => s,
        }
    }

    /// Read back a stored or boundary value. Exact canonical strings map to
    /// the wheel classes, anything else is kept verbatim.
    pub fn from_canonical(s: &str) -> Category {
        match s {
            "2W" => Category::TwoWheeler,
            "3W" => Category::ThreeWheeler,
            "4W" => Category::FourWheeler,
            other => Category::Other(other.to_string()),
        }
    }

    /// Column key used by the chart pivot ("2w", "3w", "4w").
    pub fn chart_key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Grouping axis for metrics and charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Category,
    Manufacturer,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Manufacturer => "manufacturer",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized registration observation.
///
/// `year`, `month` and `quarter` are derived from `date` on access so they can
/// never disagree with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    pub category: Category,
    pub manufacturer: Option<String>,
    pub registrations: u64,
    pub region: String,
}

impl CanonicalRecord {
    pub fn new(date: NaiveDate, category: Category, registrations: u64) -> Self {
        CanonicalRecord {
            date,
            category,
            manufacturer: None,
            registrations,
            region: DEFAULT_REGION.to_string(),
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn quarter(&self) -> u32 {
        (self.date.month() - 1) / 3 + 1
    }

    /// Calendar month label, e.g. "2024-03".
    pub fn month_label(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }

    pub fn dimension(&self) -> Dimension {
        if self.manufacturer.is_some() {
            Dimension::Manufacturer
        } else {
            Dimension::Category
        }
    }

    /// Value of this record along `dim`. Manufacturer lookups on an aggregate
    /// record yield an empty string.
    pub fn dimension_value(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::Category => self.category.as_str(),
            Dimension::Manufacturer => self.manufacturer.as_deref().unwrap_or(""),
        }
    }

    /// Identity of the observation. Two records with equal keys describe the
    /// same count; storage mirrors this with its UNIQUE constraints.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date,
            manufacturer: self.manufacturer.clone(),
            category: self.category.clone(),
            region: self.region.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub date: NaiveDate,
    pub manufacturer: Option<String>,
    pub category: Category,
    pub region: String,
}

//! Deterministic fallback dataset, used when no real source yields records.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::IngestError;
use crate::record::{CanonicalRecord, Category, Dimension};

const ROSTER: &[(&str, Category)] = &[
    ("Hero MotoCorp", Category::TwoWheeler),
    ("TVS", Category::TwoWheeler),
    ("Bajaj", Category::TwoWheeler),
    ("Honda", Category::TwoWheeler),
    ("Yamaha", Category::TwoWheeler),
    ("Mahindra", Category::ThreeWheeler),
    ("Bajaj Auto", Category::ThreeWheeler),
    ("Piaggio", Category::ThreeWheeler),
    ("Maruti Suzuki", Category::FourWheeler),
    ("Hyundai", Category::FourWheeler),
    ("Tata", Category::FourWheeler),
    ("Mahindra", Category::FourWheeler),
    ("Kia", Category::FourWheeler),
];

/// Generate `months` monthly points ending at the first of `as_of`'s month.
/// Every `as_of` within one calendar month yields the same keys, so repeated
/// refreshes overwrite rather than add rows.
pub fn generate(
    dim: Dimension,
    as_of: NaiveDate,
    months: u32,
    region: &str,
) -> Result<Vec<CanonicalRecord>, IngestError> {
    if months == 0 {
        return Err(IngestError::Synthetic("lookback window is zero months".into()));
    }

    let too_early = || IngestError::Synthetic(format!("{} is too early for the window", as_of));
    let anchor = as_of.with_day(1).ok_or_else(too_early)?;

    let mut out = Vec::new();
    for step in 0..months {
        let i = i64::from(step);
        let date = anchor.checked_sub_months(Months::new(step)).ok_or_else(too_early)?;
        match dim {
            Dimension::Category => {
                let drift = i64::from(date.year()) - 2022;
                for (cat, base, per_step, per_year) in [
                    (Category::TwoWheeler, 150_000, 1_000, 5_000),
                    (Category::ThreeWheeler, 8_000, 50, 300),
                    (Category::FourWheeler, 45_000, 200, 1_500),
                ] {
                    let n = (base + per_step * i + per_year * drift).max(0) as u64;
                    out.push(CanonicalRecord::new(date, cat, n).with_region(region));
                }
            }
            Dimension::Manufacturer => {
                for (maker, cat) in ROSTER {
                    let n = match cat {
                        Category::TwoWheeler => 20_000 + 100 * i,
                        Category::ThreeWheeler => 2_000 + 20 * i,
                        _ => 8_000 + 50 * i,
                    } as u64;
                    out.push(
                        CanonicalRecord::new(date, cat.clone(), n)
                            .with_manufacturer(*maker)
                            .with_region(region),
                    );
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::record::DEFAULT_REGION;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn deterministic() {
        let a = generate(Dimension::Category, as_of(), 24, DEFAULT_REGION).unwrap();
        let b = generate(Dimension::Category, as_of(), 24, DEFAULT_REGION).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 24 * 3);
    }

    #[test]
    fn category_window() {
        let recs = generate(Dimension::Category, as_of(), 24, DEFAULT_REGION).unwrap();
        assert_eq!(recs[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(recs[0].category, Category::TwoWheeler);
        // 150k + 0 steps + 2 years of drift
        assert_eq!(recs[0].registrations, 160_000);
        let oldest = recs.iter().map(|r| r.date).min().unwrap();
        assert_eq!(oldest, NaiveDate::from_ymd_opt(2022, 7, 1).unwrap());
        assert!(recs.iter().all(|r| r.date.day() == 1));
        assert!(recs.iter().all(|r| r.manufacturer.is_none()));
    }

    #[test]
    fn manufacturer_keys_unique() {
        let recs = generate(Dimension::Manufacturer, as_of(), 24, DEFAULT_REGION).unwrap();
        assert_eq!(recs.len(), 24 * ROSTER.len());
        let keys: HashSet<_> = recs.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), recs.len());
        assert!(recs.iter().all(|r| r.manufacturer.is_some()));
    }

    #[test]
    fn same_month_same_keys() {
        let mid = generate(Dimension::Manufacturer, as_of(), 24, DEFAULT_REGION).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let late = generate(Dimension::Manufacturer, end, 24, DEFAULT_REGION).unwrap();
        assert_eq!(mid, late);
    }

    #[test]
    fn zero_window_is_an_error() {
        assert!(matches!(
            generate(Dimension::Category, as_of(), 0, DEFAULT_REGION),
            Err(IngestError::Synthetic(_))
        ));
    }
}

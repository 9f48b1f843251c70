use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::record::{CanonicalRecord, Category};

/// Rows kept for the dashboard chart.
pub const CHART_MONTHS: usize = 12;

/// Keys owned by `ChartRow` itself; columns with these names get a suffix.
const RESERVED_COLUMNS: &[&str] = &["month", "total"];

/// One month of the wide chart table: a column per dimension value plus total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRow {
    pub month: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, u64>,
    pub total: u64,
}

/// Pick the chart series. Selected manufacturers win when they have data;
/// otherwise category aggregates, optionally narrowed to one category.
pub fn build_chart(
    category_records: &[CanonicalRecord],
    manufacturer_records: &[CanonicalRecord],
    category: Option<&Category>,
    manufacturers: &[String],
) -> Vec<ChartRow> {
    if !manufacturers.is_empty() {
        let selected: Vec<&CanonicalRecord> = manufacturer_records
            .iter()
            .filter(|r| {
                r.manufacturer
                    .as_ref()
                    .is_some_and(|m| manufacturers.iter().any(|s| s == m))
            })
            .collect();
        let rows = pivot(&selected, |r| r.manufacturer.clone().unwrap_or_default());
        if !rows.is_empty() {
            return rows;
        }
    }

    let selected: Vec<&CanonicalRecord> = category_records
        .iter()
        .filter(|r| category.map_or(true, |c| &r.category == c))
        .collect();
    pivot(&selected, |r| r.category.chart_key())
}

/// Sum by (month, column), fill gaps with zero, keep the latest months.
pub fn pivot<F>(records: &[&CanonicalRecord], column: F) -> Vec<ChartRow>
where
    F: Fn(&CanonicalRecord) -> String,
{
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut months: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();

    for &r in records {
        let col = column_name(column(r));
        *months
            .entry(r.month_label())
            .or_default()
            .entry(col.clone())
            .or_default() += r.registrations;
        columns.insert(col);
    }

    let skip = months.len().saturating_sub(CHART_MONTHS);
    months
        .into_iter()
        .skip(skip)
        .map(|(month, sums)| {
            let values: BTreeMap<String, u64> = columns
                .iter()
                .map(|c| (c.clone(), sums.get(c).copied().unwrap_or(0)))
                .collect();
            let total = values.values().sum();
            ChartRow { month, values, total }
        })
        .collect()
}

fn column_name(name: String) -> String {
    if RESERVED_COLUMNS.contains(&name.as_str()) {
        format!("{}_", name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn rec(y: i32, m: u32, day: u32, cat: Category, n: u64) -> CanonicalRecord {
        CanonicalRecord::new(NaiveDate::from_ymd_opt(y, m, day).unwrap(), cat, n)
    }

    #[test]
    fn fills_missing_cells_and_totals() {
        let cats = vec![
            rec(2024, 1, 1, Category::TwoWheeler, 100),
            rec(2024, 1, 15, Category::TwoWheeler, 50),
            rec(2024, 1, 1, Category::FourWheeler, 30),
            rec(2024, 2, 1, Category::ThreeWheeler, 7),
        ];
        let rows = build_chart(&cats, &[], None, &[]);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].month, "2024-01");
        assert_eq!(rows[0].values["2w"], 150);
        assert_eq!(rows[0].values["3w"], 0);
        assert_eq!(rows[0].values["4w"], 30);
        assert_eq!(rows[1].values["2w"], 0);
        assert_eq!(rows[1].values["3w"], 7);

        for row in &rows {
            assert_eq!(row.total, row.values.values().sum::<u64>());
            assert_eq!(row.values.len(), 3);
        }
    }

    #[test]
    fn keeps_most_recent_twelve_months() {
        let cats: Vec<_> = (0..18)
            .map(|i| {
                let y = 2023 + i / 12;
                let m = (i % 12) as u32 + 1;
                rec(y, m, 1, Category::FourWheeler, 1)
            })
            .collect();
        let rows = build_chart(&cats, &[], None, &[]);
        assert_eq!(rows.len(), 12);
        assert_eq!(rows.first().unwrap().month, "2023-07");
        assert_eq!(rows.last().unwrap().month, "2024-06");

        let short = build_chart(&cats[..5], &[], None, &[]);
        assert_eq!(short.len(), 5);
    }

    #[test]
    fn manufacturer_series_when_selected() {
        let makers = vec![
            rec(2024, 3, 1, Category::FourWheeler, 40).with_manufacturer("Kia"),
            rec(2024, 3, 1, Category::FourWheeler, 60).with_manufacturer("Tata"),
            rec(2024, 4, 1, Category::FourWheeler, 10).with_manufacturer("Hyundai"),
        ];
        let cats = vec![rec(2024, 3, 1, Category::FourWheeler, 999)];
        let rows = build_chart(&cats, &makers, None, &["Kia".into(), "Tata".into()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values.keys().collect::<Vec<_>>(), vec!["Kia", "Tata"]);
        assert_eq!(rows[0].total, 100);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["month"], "2024-03");
        assert_eq!(json["Kia"], 40);
        assert_eq!(json["total"], 100);
    }

    #[test]
    fn unknown_manufacturers_fall_back_to_categories() {
        let cats = vec![
            rec(2024, 3, 1, Category::FourWheeler, 5),
            rec(2024, 3, 1, Category::TwoWheeler, 9),
        ];
        let rows = build_chart(&cats, &[], Some(&Category::TwoWheeler), &["Nobody".into()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values.len(), 1);
        assert_eq!(rows[0].values["2w"], 9);
        assert_eq!(rows[0].total, 9);
    }

    #[test]
    fn reserved_names_do_not_clash() {
        let makers = vec![
            rec(2024, 3, 1, Category::TwoWheeler, 4).with_manufacturer("total"),
            rec(2024, 3, 1, Category::TwoWheeler, 6).with_manufacturer("month"),
        ];
        let rows = build_chart(&[], &makers, None, &["total".into(), "month".into()]);
        assert_eq!(rows[0].values["total_"], 4);
        assert_eq!(rows[0].values["month_"], 6);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["month"], "2024-03");
        assert_eq!(json["total"], 10);
        assert_eq!(json["total_"], 4);
    }

    #[test]
    fn nothing_to_chart() {
        assert!(build_chart(&[], &[], None, &[]).is_empty());
    }
}

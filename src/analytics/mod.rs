//! Dashboard queries: stored records in, chart rows, metrics and insights out.

pub mod chart;
pub mod insights;
pub mod metrics;

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::db::{self, RecordFilter};
use crate::record::{CanonicalRecord, Category, Dimension};

pub use chart::{build_chart, ChartRow};
pub use insights::{build_insights, Insight};
pub use metrics::{compute_metrics, GroupMetric, Trend};

const INSIGHT_WINDOW_DAYS: i64 = 365;
const SUMMARY_TOP_MANUFACTURERS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct RegistrationQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub category: Option<Category>,
    pub manufacturers: Vec<String>,
}

impl RegistrationQuery {
    fn filter(&self) -> RecordFilter {
        RecordFilter {
            start: self.start,
            end: self.end,
            category: self.category.clone(),
            manufacturers: self.manufacturers.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationReport {
    pub chart_rows: Vec<ChartRow>,
    pub category_metrics: Vec<GroupMetric>,
    pub manufacturer_metrics: Vec<GroupMetric>,
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_registrations: u64,
    pub category_breakdown: BTreeMap<String, u64>,
    pub top_manufacturers: Vec<ManufacturerTotal>,
    pub data_period: DataPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManufacturerTotal {
    pub manufacturer: String,
    pub registrations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn compute_registrations(conn: &Connection, query: &RegistrationQuery) -> Result<RegistrationReport> {
    let filter = query.filter();
    let categories = db::fetch_records(conn, Dimension::Category, &filter)?;
    let manufacturers = db::fetch_records(conn, Dimension::Manufacturer, &filter)?;
    debug!(
        categories = categories.len(),
        manufacturers = manufacturers.len(),
        "Loaded records for registrations query"
    );

    Ok(RegistrationReport {
        chart_rows: build_chart(
            &categories,
            &manufacturers,
            query.category.as_ref(),
            &query.manufacturers,
        ),
        category_metrics: compute_metrics(&categories, Dimension::Category),
        manufacturer_metrics: compute_metrics(&manufacturers, Dimension::Manufacturer),
        summary: summarize(&categories, &manufacturers),
    })
}

/// Insights over the year ending at `today`. Empty when no category data falls in it.
pub fn compute_insights(conn: &Connection, today: NaiveDate) -> Result<Vec<Insight>> {
    let filter = RecordFilter {
        start: today.checked_sub_signed(Duration::days(INSIGHT_WINDOW_DAYS)),
        end: Some(today),
        ..Default::default()
    };
    let categories = db::fetch_records(conn, Dimension::Category, &filter)?;
    if categories.is_empty() {
        return Ok(Vec::new());
    }
    let manufacturers = db::fetch_records(conn, Dimension::Manufacturer, &filter)?;

    Ok(build_insights(
        &compute_metrics(&categories, Dimension::Category),
        &compute_metrics(&manufacturers, Dimension::Manufacturer),
    ))
}

pub fn list_manufacturers(conn: &Connection) -> Result<Vec<String>> {
    db::fetch_manufacturers(conn)
}

fn summarize(categories: &[CanonicalRecord], manufacturers: &[CanonicalRecord]) -> Option<Summary> {
    let start = categories.iter().map(|r| r.date).min()?;
    let end = categories.iter().map(|r| r.date).max()?;

    let mut breakdown: BTreeMap<String, u64> = BTreeMap::new();
    for r in categories {
        *breakdown.entry(r.category.as_str().to_string()).or_default() += r.registrations;
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut makers: Vec<ManufacturerTotal> = Vec::new();
    for r in manufacturers {
        let name = r.dimension_value(Dimension::Manufacturer);
        match index.get(name) {
            Some(&i) => makers[i].registrations += r.registrations,
            None => {
                index.insert(name, makers.len());
                makers.push(ManufacturerTotal {
                    manufacturer: name.to_string(),
                    registrations: r.registrations,
                });
            }
        }
    }
    makers.sort_by(|a, b| b.registrations.cmp(&a.registrations));
    makers.truncate(SUMMARY_TOP_MANUFACTURERS);

    Some(Summary {
        total_registrations: categories.iter().map(|r| r.registrations).sum(),
        category_breakdown: breakdown,
        top_manufacturers: makers,
        data_period: DataPeriod { start, end },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::insights::InsightKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let recs = vec![
            CanonicalRecord::new(d(2023, 1, 1), Category::FourWheeler, 800),
            CanonicalRecord::new(d(2024, 1, 1), Category::FourWheeler, 1000),
            CanonicalRecord::new(d(2024, 1, 1), Category::TwoWheeler, 3000),
            CanonicalRecord::new(d(2023, 1, 1), Category::FourWheeler, 100).with_manufacturer("Kia"),
            CanonicalRecord::new(d(2024, 1, 1), Category::FourWheeler, 200).with_manufacturer("Kia"),
            CanonicalRecord::new(d(2024, 1, 1), Category::FourWheeler, 500).with_manufacturer("Tata"),
        ];
        db::upsert_records(&conn, &recs).unwrap();
        conn
    }

    #[test]
    fn registrations_report() {
        let conn = seeded();
        let report = compute_registrations(&conn, &RegistrationQuery::default()).unwrap();

        assert_eq!(report.category_metrics[0].name(), "2W");
        let four = &report.category_metrics[1];
        assert_eq!(four.total_registrations, 1800);
        assert_eq!(four.yoy_change, 25.0);
        assert_eq!(four.trend, Trend::Up);

        assert_eq!(report.manufacturer_metrics[0].name(), "Tata");
        assert_eq!(report.manufacturer_metrics[1].yoy_change, 100.0);

        assert_eq!(report.chart_rows.len(), 2);
        assert_eq!(report.chart_rows[1].month, "2024-01");
        assert_eq!(report.chart_rows[1].total, 4000);

        let summary = report.summary.unwrap();
        assert_eq!(summary.total_registrations, 4800);
        assert_eq!(summary.category_breakdown["4W"], 1800);
        assert_eq!(summary.top_manufacturers[0].manufacturer, "Tata");
        assert_eq!(summary.top_manufacturers[1].registrations, 300);
        assert_eq!(summary.data_period.start, d(2023, 1, 1));
        assert_eq!(summary.data_period.end, d(2024, 1, 1));
    }

    #[test]
    fn filtered_query() {
        let conn = seeded();
        let query = RegistrationQuery {
            start: Some(d(2024, 1, 1)),
            category: Some(Category::FourWheeler),
            manufacturers: vec!["Kia".into()],
            ..Default::default()
        };
        let report = compute_registrations(&conn, &query).unwrap();
        assert_eq!(report.category_metrics.len(), 1);
        assert_eq!(report.category_metrics[0].yoy_change, 0.0);
        assert_eq!(report.manufacturer_metrics.len(), 1);
        assert_eq!(report.chart_rows.len(), 1);
        assert_eq!(report.chart_rows[0].values["Kia"], 200);
    }

    #[test]
    fn empty_store_has_no_summary() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let report = compute_registrations(&conn, &RegistrationQuery::default()).unwrap();
        assert!(report.summary.is_none());
        assert!(report.chart_rows.is_empty());
        assert!(compute_insights(&conn, d(2024, 6, 1)).unwrap().is_empty());
    }

    #[test]
    fn insights_use_trailing_year() {
        let conn = seeded();
        // 2023-01-01 is outside the window, so YoY is undefined and only shares remain
        let out = compute_insights(&conn, d(2024, 6, 1)).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|i| i.kind == InsightKind::MarketShare));
        assert_eq!(out[0].title, "2W holds 75.0% market share");

        assert!(compute_insights(&conn, d(2026, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn manufacturers_listed() {
        let conn = seeded();
        assert_eq!(list_manufacturers(&conn).unwrap(), vec!["Kia", "Tata"]);
    }
}

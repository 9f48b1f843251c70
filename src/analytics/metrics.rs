use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;

use crate::record::{CanonicalRecord, Dimension};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// Dimension value a metric belongs to. Serializes as `"category": "2W"` or
/// `"manufacturer": "Kia"` when flattened into the metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Category(String),
    Manufacturer(String),
}

impl GroupKey {
    fn new(dim: Dimension, value: &str) -> Self {
        match dim {
            Dimension::Category => GroupKey::Category(value.to_string()),
            Dimension::Manufacturer => GroupKey::Manufacturer(value.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            GroupKey::Category(v) | GroupKey::Manufacturer(v) => v,
        }
    }
}

/// Whether each change figure had a prior period to compare against.
/// A reported `0.0` is ambiguous without this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct History {
    pub yoy_defined: bool,
    pub qoq_defined: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetric {
    #[serde(flatten)]
    pub key: GroupKey,
    pub total_registrations: u64,
    pub yoy_change: f64,
    pub qoq_change: f64,
    pub trend: Trend,
    #[serde(skip)]
    pub history: History,
}

impl GroupMetric {
    pub fn name(&self) -> &str {
        self.key.value()
    }
}

/// Per-value totals and latest YoY / QoQ, largest total first.
///
/// Partitions keep the order in which their values first appear in
/// `records`, and the final sort is stable, so equal totals keep that order.
pub fn compute_metrics(records: &[CanonicalRecord], dim: Dimension) -> Vec<GroupMetric> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut partitions: Vec<(&str, Vec<&CanonicalRecord>)> = Vec::new();
    for r in records {
        let value = r.dimension_value(dim);
        match index.get(value) {
            Some(&i) => partitions[i].1.push(r),
            None => {
                index.insert(value, partitions.len());
                partitions.push((value, vec![r]));
            }
        }
    }

    let mut metrics: Vec<GroupMetric> = partitions
        .par_iter()
        .map(|(value, recs)| group_metric(GroupKey::new(dim, value), recs))
        .collect();

    metrics.sort_by(|a, b| b.total_registrations.cmp(&a.total_registrations));
    metrics
}

fn group_metric(key: GroupKey, recs: &[&CanonicalRecord]) -> GroupMetric {
    let mut yearly: BTreeMap<i32, u64> = BTreeMap::new();
    let mut quarterly: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    let mut total = 0u64;

    for r in recs {
        *yearly.entry(r.year()).or_default() += r.registrations;
        *quarterly.entry((r.year(), r.quarter())).or_default() += r.registrations;
        total += r.registrations;
    }

    let yoy = latest_change(yearly.values());
    let qoq = latest_change(quarterly.values());

    let trend = match yoy {
        Some(v) if v > 0.0 => Trend::Up,
        Some(v) if v < 0.0 => Trend::Down,
        _ => Trend::Stable,
    };

    GroupMetric {
        key,
        total_registrations: total,
        yoy_change: yoy.map(round2).unwrap_or(0.0),
        qoq_change: qoq.map(round2).unwrap_or(0.0),
        trend,
        history: History {
            yoy_defined: yoy.is_some(),
            qoq_defined: qoq.is_some(),
        },
    }
}

/// Change of the last point against the one before it, in series order.
/// `None` with fewer than two points or a zero base.
fn latest_change<'a>(series: impl DoubleEndedIterator<Item = &'a u64>) -> Option<f64> {
    let mut rev = series.rev();
    let current = *rev.next()?;
    let previous = *rev.next()?;
    pct_change(previous, current)
}

pub fn pct_change(previous: u64, current: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    change.is_finite().then_some(change)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

use serde::Serialize;

use super::metrics::GroupMetric;

pub const MAX_INSIGHTS: usize = 6;
const GROWTH_THRESHOLD: f64 = 10.0;
const MANUFACTURER_THRESHOLD: f64 = 5.0;
const TOP_MANUFACTURERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Growth,
    Manufacturer,
    MarketShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub value: f64,
    pub trend: Sentiment,
}

/// Growth, then manufacturer, then market-share insights, cut to the first six.
/// Market-share entries are the first to fall off when growth signals are plentiful.
pub fn build_insights(categories: &[GroupMetric], manufacturers: &[GroupMetric]) -> Vec<Insight> {
    let mut out = Vec::new();

    for m in categories.iter().filter(|m| m.yoy_change > GROWTH_THRESHOLD) {
        out.push(Insight {
            kind: InsightKind::Growth,
            title: format!("{} vehicles up {:.1}% YoY", m.name(), m.yoy_change),
            description: format!(
                "Strong growth in {} category with {} total registrations",
                m.name(),
                thousands(m.total_registrations)
            ),
            value: m.yoy_change,
            trend: Sentiment::Positive,
        });
    }

    let mut leaders: Vec<&GroupMetric> = manufacturers.iter().collect();
    leaders.sort_by(|a, b| b.yoy_change.total_cmp(&a.yoy_change));
    for m in leaders
        .into_iter()
        .take(TOP_MANUFACTURERS)
        .filter(|m| m.yoy_change > MANUFACTURER_THRESHOLD)
    {
        out.push(Insight {
            kind: InsightKind::Manufacturer,
            title: format!("{} leading growth", m.name()),
            description: format!(
                "YoY growth of {:.1}% with {} registrations",
                m.yoy_change,
                thousands(m.total_registrations)
            ),
            value: m.yoy_change,
            trend: Sentiment::Positive,
        });
    }

    let sum: u64 = categories.iter().map(|m| m.total_registrations).sum();
    if sum > 0 {
        for m in categories {
            let share = m.total_registrations as f64 / sum as f64 * 100.0;
            out.push(Insight {
                kind: InsightKind::MarketShare,
                title: format!("{} holds {:.1}% market share", m.name(), share),
                description: format!(
                    "Total registrations: {}",
                    thousands(m.total_registrations)
                ),
                value: share,
                trend: Sentiment::Neutral,
            });
        }
    }

    out.truncate(MAX_INSIGHTS);
    out
}

/// `1234567` -> `"1,234,567"`
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

use tracing::debug;

use super::html::{self, Row, Table};
use super::normalize::{normalize_category, parse_count, parse_date};
use crate::config::Vocabulary;
use crate::error::ParseError;
use crate::record::{CanonicalRecord, Dimension};

const CATEGORY_MIN_CELLS: usize = 3;
const MANUFACTURER_MIN_CELLS: usize = 4;

/// Turns scraped grids into canonical records for one dimension.
pub struct Extractor<'a> {
    vocab: &'a Vocabulary,
    region: &'a str,
}

impl<'a> Extractor<'a> {
    pub fn new(vocab: &'a Vocabulary, region: &'a str) -> Self {
        Extractor { vocab, region }
    }

    /// Run the document-shape chain: `<table>` grids first, then data `div`
    /// grids when tables produced nothing.
    pub fn extract_document(&self, html: &str, dim: Dimension) -> Vec<CanonicalRecord> {
        let records = self.extract_tables(&html::parse_tables(html), dim);
        if !records.is_empty() {
            return records;
        }
        let records = self.extract_tables(&html::parse_div_grids(html), dim);
        if !records.is_empty() {
            debug!("{} records recovered from div grids", records.len());
        }
        records
    }

    /// Extract from already-parsed groupings. Irrelevant groupings are
    /// skipped whole; unparseable rows are skipped one by one.
    pub fn extract_tables(&self, tables: &[Table], dim: Dimension) -> Vec<CanonicalRecord> {
        let keywords = match dim {
            Dimension::Category => &self.vocab.category_keywords,
            Dimension::Manufacturer => &self.vocab.manufacturer_keywords,
        };

        let mut out = Vec::new();
        for table in tables {
            let text = table.text_lower();
            if !keywords.iter().any(|kw| text.contains(kw.as_str())) {
                continue;
            }
            for (i, row) in table.rows.iter().enumerate().skip(1) {
                let parsed = match dim {
                    Dimension::Category => self.category_row(row),
                    Dimension::Manufacturer => self.manufacturer_row(row),
                };
                match parsed {
                    Ok(rec) => out.push(rec),
                    Err(e) => debug!("skipping {} row {}: {}", dim, i, e),
                }
            }
        }
        out
    }

    /// `date | category | count`
    fn category_row(&self, row: &Row) -> Result<CanonicalRecord, ParseError> {
        let [date, category, count] = cells::<3>(row, CATEGORY_MIN_CELLS)?;
        let date = parse_date(date)?;
        let category = normalize_category(category, self.vocab).ok_or(ParseError::Category)?;
        let registrations = parse_count(count).ok_or_else(|| ParseError::Count(count.to_string()))?;
        Ok(CanonicalRecord::new(date, category, registrations).with_region(self.region))
    }

    /// `date | manufacturer | category | count`
    fn manufacturer_row(&self, row: &Row) -> Result<CanonicalRecord, ParseError> {
        let [date, maker, category, count] = cells::<4>(row, MANUFACTURER_MIN_CELLS)?;
        let date = parse_date(date)?;
        let maker = maker.trim();
        if maker.is_empty() {
            return Err(ParseError::Manufacturer);
        }
        let category = normalize_category(category, self.vocab).ok_or(ParseError::Category)?;
        let registrations = parse_count(count).ok_or_else(|| ParseError::Count(count.to_string()))?;
        Ok(CanonicalRecord::new(date, category, registrations)
            .with_manufacturer(maker)
            .with_region(self.region))
    }
}

/// First `N` cells, after checking the row is at least `needed` wide.
fn cells<const N: usize>(row: &Row, needed: usize) -> Result<[&str; N], ParseError> {
    if row.len() < needed {
        return Err(ParseError::Shape { found: row.len(), needed });
    }
    let mut out = [""; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = row.cell(i).ok_or(ParseError::Shape { found: row.len(), needed })?;
    }
    Ok(out)
}

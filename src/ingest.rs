//! Refresh pipeline: primary report → alternate endpoints → synthetic floor,
//! then an idempotent upsert of whichever batch was accepted.

use std::fmt;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{Settings, Vocabulary};
use crate::db;
use crate::error::IngestError;
use crate::fetch::DocumentSource;
use crate::parser::Extractor;
use crate::record::{CanonicalRecord, Dimension};
use crate::synthetic;

/// Position in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Primary,
    Alternate(usize),
    Synthetic,
    Done(Provenance),
}

/// Which state produced the accepted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "index", rename_all = "snake_case")]
pub enum Provenance {
    Primary,
    Alternate(usize),
    Synthetic,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Primary => f.write_str("primary report"),
            Provenance::Alternate(i) => write!(f, "alternate source #{}", i + 1),
            Provenance::Synthetic => f.write_str("synthetic floor"),
        }
    }
}

/// What a state's attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Yielded,
    Empty,
}

/// Transition table. `None` means the chain is exhausted (only reachable when
/// the synthetic floor itself produced nothing).
pub fn transition(state: IngestState, outcome: StepOutcome, alternates: usize) -> Option<IngestState> {
    use IngestState::*;
    use StepOutcome::*;

    match (state, outcome) {
        (Done(p), _) => Some(Done(p)),
        (Primary, Yielded) => Some(Done(Provenance::Primary)),
        (Alternate(i), Yielded) => Some(Done(Provenance::Alternate(i))),
        (Synthetic, Yielded) => Some(Done(Provenance::Synthetic)),
        (Primary, Empty) if alternates > 0 => Some(Alternate(0)),
        (Primary, Empty) => Some(Synthetic),
        (Alternate(i), Empty) if i + 1 < alternates => Some(Alternate(i + 1)),
        (Alternate(_), Empty) => Some(Synthetic),
        (Synthetic, Empty) => None,
    }
}

/// Accepted batch for one dimension.
#[derive(Debug)]
pub struct Collected {
    pub provenance: Provenance,
    pub records: Vec<CanonicalRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionReport {
    pub dimension: &'static str,
    pub provenance: Provenance,
    pub extracted: usize,
    pub written: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub as_of: NaiveDate,
    pub dimensions: Vec<DimensionReport>,
}

/// Drives the fallback chain. Holds a lock so refreshes never overlap.
pub struct Ingestor<S> {
    source: S,
    settings: Settings,
    vocab: Vocabulary,
    in_flight: Mutex<()>,
}

impl<S: DocumentSource> Ingestor<S> {
    pub fn new(source: S, settings: Settings, vocab: Vocabulary) -> Self {
        Ingestor {
            source,
            settings,
            vocab,
            in_flight: Mutex::new(()),
        }
    }

    /// Run the chain for both dimensions and upsert the results.
    /// `as_of` anchors the synthetic window.
    pub async fn refresh(&self, conn: &Connection, as_of: NaiveDate) -> Result<RefreshReport, IngestError> {
        let _guard = self.in_flight.lock().await;

        let mut dimensions = Vec::new();
        for dim in [Dimension::Category, Dimension::Manufacturer] {
            let collected = self.collect(dim, as_of).await?;
            let written = db::upsert_records(conn, &collected.records)?;
            info!(
                "{} data from {}: {} records, {} written",
                dim,
                collected.provenance,
                collected.records.len(),
                written
            );
            dimensions.push(DimensionReport {
                dimension: dim.as_str(),
                provenance: collected.provenance,
                extracted: collected.records.len(),
                written,
            });
        }
        Ok(RefreshReport { as_of, dimensions })
    }

    /// Walk the state machine for one dimension until a state yields records.
    pub async fn collect(&self, dim: Dimension, as_of: NaiveDate) -> Result<Collected, IngestError> {
        let alternates = self.alternates(dim);
        let mut state = IngestState::Primary;
        let mut records = Vec::new();

        loop {
            records = match state {
                IngestState::Done(provenance) => return Ok(Collected { provenance, records }),
                IngestState::Primary => {
                    self.try_source(&self.settings.report_url, self.settings.primary_timeout(), dim)
                        .await
                }
                IngestState::Alternate(i) => {
                    let url = self.settings.alternate_url(&alternates[i]);
                    self.try_source(&url, self.settings.alternate_timeout(), dim).await
                }
                IngestState::Synthetic => {
                    warn!("No real {} data available; generating synthetic floor", dim);
                    synthetic::generate(dim, as_of, self.settings.synthetic_months, &self.settings.region)?
                }
            };

            let outcome = if records.is_empty() {
                StepOutcome::Empty
            } else {
                StepOutcome::Yielded
            };
            state = transition(state, outcome, alternates.len()).ok_or(IngestError::Exhausted(dim))?;
        }
    }

    fn alternates(&self, dim: Dimension) -> &[String] {
        match dim {
            Dimension::Category => &self.settings.category_alternates,
            Dimension::Manufacturer => &self.settings.manufacturer_alternates,
        }
    }

    /// Fetch + extract. Any failure is logged and reported as an empty yield.
    async fn try_source(&self, url: &str, timeout: std::time::Duration, dim: Dimension) -> Vec<CanonicalRecord> {
        match self.source.fetch(url, timeout).await {
            Ok(html) => {
                let records = Extractor::new(&self.vocab, &self.settings.region).extract_document(&html, dim);
                if records.is_empty() {
                    warn!("No {} rows found at {}", dim, url);
                } else {
                    info!("Extracted {} {} records from {}", records.len(), dim, url);
                }
                records
            }
            Err(e) => {
                warn!("Source unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

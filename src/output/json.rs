//! JSON rendering of batch results
//!
//! Each input URL becomes one array element:
//!
//! ```json
//! {"url": "...", "status": "partial", "attempts": 1,
//!  "record": {...}, "missingFields": ["name"]}
//! ```
//!
//! `record` is present for complete and partial outcomes, `missingFields`
//! only for partial ones, and `error` only for failures.

use crate::crawler::{CrawlBatchResult, OutcomeStatus, TaskError, TaskOutcome};
use crate::extract::Record;
use serde::Serialize;
use std::io::Write;

/// Serializable view of one task outcome
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEntry<'a> {
    pub url: &'a str,
    pub status: OutcomeStatus,
    pub attempts: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<&'a Record>,

    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub missing_fields: &'a [String],

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a TaskError>,
}

impl<'a> From<&'a TaskOutcome> for OutcomeEntry<'a> {
    fn from(outcome: &'a TaskOutcome) -> Self {
        let record = outcome.record();
        Self {
            url: &outcome.url,
            status: outcome.status(),
            attempts: outcome.attempts,
            record,
            missing_fields: record
                .map(|r| r.completeness.missing_fields())
                .unwrap_or(&[]),
            error: outcome.error(),
        }
    }
}

/// Entries for every outcome, in submission order
pub fn entries(batch: &CrawlBatchResult) -> Vec<OutcomeEntry<'_>> {
    batch.outcomes.iter().map(OutcomeEntry::from).collect()
}

/// Renders the batch as a JSON array
pub fn render_json(batch: &CrawlBatchResult, pretty: bool) -> serde_json::Result<String> {
    let entries = entries(batch);
    if pretty {
        serde_json::to_string_pretty(&entries)
    } else {
        serde_json::to_string(&entries)
    }
}

/// Writes the batch as a JSON array followed by a newline
pub fn write_json<W: Write>(
    mut writer: W,
    batch: &CrawlBatchResult,
    pretty: bool,
) -> std::io::Result<()> {
    let rendered = render_json(batch, pretty)?;
    writeln!(writer, "{}", rendered)?;
    writer.flush()
}

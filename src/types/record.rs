//! Structured domain records (tables, bookings, menu items, ...).
//!
//! The cache layer does not interpret record contents; it only guarantees
//! that each record is a JSON object.

use tracing::warn;

use crate::{MaitreError, Result};

/// A single record from a data file.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Parse a records document, dropping elements that are not objects.
pub fn parse_records(document: serde_json::Value) -> Result<Vec<Record>> {
    let serde_json::Value::Array(entries) = document else {
        return Err(MaitreError::InvalidInput(
            "records document must be a JSON array".into(),
        ));
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            serde_json::Value::Object(record) => Some(record),
            other => {
                warn!(index, found = %other, "skipping non-object record");
                None
            }
        })
        .collect())
}

//! Closing-price field selection for upstream payloads.
//!
//! Upstream payloads carry several price columns and sometimes a multi-level
//! column key (field, ticker). Selection is deterministic:
//!
//! 1. Compare the top level of each key against [`CLOSE_FIELD_PRIORITY`], after
//!    lower-casing and stripping spaces, underscores and dashes.
//! 2. The highest-priority match wins; among equal matches the left-most column wins.
//! 3. With no match, the left-most column is used.

use super::provider::DataError;

/// Field names accepted as the closing price, best first.
///
/// Adjusted close comes first because index payloads report it split- and
/// dividend-adjusted, matching the `auto_adjust` convention.
pub const CLOSE_FIELD_PRIORITY: &[&str] = &["adjclose", "close", "c"];

/// A named payload column with possibly missing cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadColumn {
    /// Column key, outermost level first (e.g. `["Close", "^GSPC"]`).
    pub key: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl PayloadColumn {
    pub fn new(key: &[&str], values: Vec<Option<f64>>) -> Self {
        Self {
            key: key.iter().map(|k| k.to_string()).collect(),
            values,
        }
    }

    fn top_level(&self) -> &str {
        self.key.first().map(String::as_str).unwrap_or("")
    }
}

fn normalize(field: &str) -> String {
    field
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pick the index of the closing-price column.
pub fn select_close_column(columns: &[PayloadColumn]) -> Result<usize, DataError> {
    if columns.is_empty() {
        return Err(DataError::ResponseFormatChanged(
            "payload has no price columns".into(),
        ));
    }

    for wanted in CLOSE_FIELD_PRIORITY {
        if let Some(pos) = columns
            .iter()
            .position(|c| normalize(c.top_level()) == *wanted)
        {
            return Ok(pos);
        }
    }
    Ok(0)
}

/// Pick the closing-price column and return its values.
pub fn select_close_values(columns: Vec<PayloadColumn>) -> Result<Vec<Option<f64>>, DataError> {
    let pos = select_close_column(&columns)?;
    Ok(columns
        .into_iter()
        .nth(pos)
        .map(|c| c.values)
        .unwrap_or_default())
}

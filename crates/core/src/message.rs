use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One notification exactly as exported, read once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub body: String,
    pub timestamp_millis: i64,
    /// Opaque source tag (the backup's `type` attribute).
    pub original_type: Option<String>,
}

impl RawMessage {
    pub fn new(body: impl Into<String>, timestamp_millis: i64) -> Self {
        Self { body: body.into(), timestamp_millis, original_type: None }
    }

    pub fn with_original_type(mut self, code: impl Into<String>) -> Self {
        self.original_type = Some(code.into());
        self
    }

    /// Wall-clock time of the message, in UTC.
    pub fn date_time(&self) -> Result<NaiveDateTime, CoreError> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| CoreError::InvalidTimestamp(self.timestamp_millis.to_string()))
    }
}

/// Fields pulled out of one body. `amount` is filled by the normalizer from
/// the matching template or the generic fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub amount: Option<Decimal>,
    /// Zero when the body names no fee.
    pub fee: Decimal,
    pub balance: Option<Decimal>,
    pub reference_id: Option<String>,
}

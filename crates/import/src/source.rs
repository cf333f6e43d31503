//! Reader for the `<smses><sms .../></smses>` backup export.

use std::path::Path;

use momo_core::{CoreError, RawMessage};
use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;

/// Faults of the import source as a whole. These abort a run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Cannot read import source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed SMS backup: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// One `<sms>` element. Only `body` and `date` feed the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceEntry {
    #[serde(rename = "@protocol", default)]
    pub protocol: Option<String>,
    #[serde(rename = "@address", default)]
    pub address: Option<String>,
    /// Epoch milliseconds, string-encoded.
    #[serde(rename = "@date", default)]
    pub date: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@body", default)]
    pub body: Option<String>,
    #[serde(rename = "@readable_date", default)]
    pub readable_date: Option<String>,
    #[serde(rename = "@contact_name", default)]
    pub contact_name: Option<String>,
}

impl SourceEntry {
    pub fn to_raw_message(&self) -> Result<RawMessage, CoreError> {
        let body = self.body.as_deref().ok_or(CoreError::MissingAttribute("body"))?;
        let date = self.date.as_deref().ok_or(CoreError::MissingAttribute("date"))?;
        let timestamp_millis = date
            .trim()
            .parse::<i64>()
            .map_err(|_| CoreError::InvalidTimestamp(date.to_string()))?;
        Ok(RawMessage {
            body: body.to_string(),
            timestamp_millis,
            original_type: self.kind.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Backup {
    #[serde(rename = "sms", default)]
    messages: Vec<SourceEntry>,
}

/// Parse a backup document held in memory. Entry order is preserved.
pub fn parse_backup(xml: &str) -> Result<Vec<SourceEntry>, SourceError> {
    let backup: Backup = from_str(xml)?;
    Ok(backup.messages)
}

pub fn read_backup(path: &Path) -> Result<Vec<SourceEntry>, SourceError> {
    let xml = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_backup(&xml)
}

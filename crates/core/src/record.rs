use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::category::Category;
use crate::error::CoreError;
use crate::message::ExtractedFields;

/// On-disk and in-database format of [`TransactionRecord::date_time`].
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Processed,
    PartiallyProcessed,
    Unprocessed,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Processed => "Processed",
            Status::PartiallyProcessed => "Partially Processed",
            Status::Unprocessed => "Unprocessed",
            Status::Error => "Error",
        }
    }

    pub fn bucket(self) -> Bucket {
        match self {
            Status::Processed | Status::PartiallyProcessed => Bucket::Processed,
            Status::Unprocessed => Bucket::Unprocessed,
            Status::Error => Bucket::Errors,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processed" => Ok(Status::Processed),
            "Partially Processed" | "PartiallyProcessed" => Ok(Status::PartiallyProcessed),
            "Unprocessed" => Ok(Status::Unprocessed),
            "Error" => Ok(Status::Error),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Output partition a record is routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Processed,
    Unprocessed,
    Errors,
}

/// The canonical record produced for every raw message.
///
/// Field order and serde names match the processed-output artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub raw_body: String,
    #[serde(rename = "date", with = "date_format", default)]
    pub date_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub original_type: Option<String>,
    #[serde(rename = "type")]
    pub category: Category,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub balance: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub fee: Decimal,
    #[serde(rename = "transaction_id", default)]
    pub reference_id: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl TransactionRecord {
    /// An empty, unclassified record for `raw_body`.
    pub fn new(raw_body: impl Into<String>) -> Self {
        Self {
            raw_body: raw_body.into(),
            date_time: None,
            original_type: None,
            category: Category::Unknown,
            amount: None,
            sender: None,
            receiver: None,
            balance: None,
            fee: Decimal::ZERO,
            reference_id: None,
            status: Status::Unprocessed,
            error_message: None,
        }
    }

    /// Copy extracted values onto the record.
    pub fn absorb(&mut self, fields: ExtractedFields) {
        self.amount = fields.amount;
        self.fee = fields.fee;
        self.balance = fields.balance;
        self.reference_id = fields.reference_id;
    }

    /// Flag as failed, keeping whatever was filled in so far.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = Status::Error;
        self.error_message = Some(message.into());
    }

    pub fn bucket(&self) -> Bucket {
        self.status.bucket()
    }

    /// Whether status, category and amount agree with each other.
    ///
    /// Error records may hold any partial combination.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            Status::Processed => self.category.is_known() && self.amount.is_some(),
            Status::PartiallyProcessed => !self.category.is_known() && self.amount.is_some(),
            Status::Unprocessed => !self.category.is_known() && self.amount.is_none(),
            Status::Error => self.error_message.is_some(),
        }
    }
}

mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| NaiveDateTime::parse_from_str(&s, DATE_FORMAT))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn sample() -> TransactionRecord {
        TransactionRecord {
            date_time: NaiveDate::from_ymd_opt(2024, 5, 10)
                .unwrap()
                .and_hms_opt(16, 30, 58),
            original_type: Some("1".to_string()),
            category: Category::IncomingMoney,
            amount: Some(Decimal::from(2000)),
            sender: Some("Jane Smith".to_string()),
            receiver: Some("You".to_string()),
            balance: Some(Decimal::from(15000)),
            reference_id: Some("12345".to_string()),
            status: Status::Processed,
            ..TransactionRecord::new("You have received 2000 RWF from Jane Smith.")
        }
    }

    #[test]
    fn absorb_copies_every_field() {
        let mut r = TransactionRecord::new("x");
        r.absorb(ExtractedFields {
            amount: Some(Decimal::from(1_234_567)),
            fee: Decimal::from(20),
            balance: Some(Decimal::from(5)),
            reference_id: Some("7".to_string()),
        });
        assert_eq!(r.amount, Some(Decimal::from(1_234_567)));
        assert_eq!(r.fee, Decimal::from(20));
        assert_eq!(r.balance, Some(Decimal::from(5)));
        assert_eq!(r.reference_id.as_deref(), Some("7"));
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(Status::PartiallyProcessed.to_string(), "Partially Processed");
        assert_eq!(Status::from_str("PartiallyProcessed").unwrap(), Status::PartiallyProcessed);
        assert!(Status::from_str("Done").is_err());
    }

    #[test]
    fn status_buckets() {
        assert_eq!(Status::Processed.bucket(), Bucket::Processed);
        assert_eq!(Status::PartiallyProcessed.bucket(), Bucket::Processed);
        assert_eq!(Status::Unprocessed.bucket(), Bucket::Unprocessed);
        assert_eq!(Status::Error.bucket(), Bucket::Errors);
    }

    #[test]
    fn serializes_in_artifact_shape() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["date"], "2024-05-10 16:30:58");
        assert_eq!(v["type"], "Incoming Money");
        assert_eq!(v["amount"], 2000.0);
        assert_eq!(v["fee"], 0.0);
        assert_eq!(v["balance"], 15000.0);
        assert_eq!(v["transaction_id"], "12345");
        assert_eq!(v["status"], "Processed");
        assert!(v.get("error_message").is_none());
    }

    #[test]
    fn absent_optionals_serialize_as_null() {
        let v = serde_json::to_value(TransactionRecord::new("Welcome")).unwrap();
        assert!(v["amount"].is_null());
        assert!(v["balance"].is_null());
        assert!(v["date"].is_null());
        assert_eq!(v["type"], "Unknown");
        assert_eq!(v["status"], "Unprocessed");
    }

    #[test]
    fn deserializes_artifact_shape() {
        let json = serde_json::to_string(&sample()).unwrap();
        let back: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn mark_error_keeps_partial_fields() {
        let mut r = sample();
        r.mark_error("boom");
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.amount, Some(Decimal::from(2000)));
        assert_eq!(r.error_message.as_deref(), Some("boom"));
        assert!(r.is_consistent());
    }

    #[test]
    fn consistency_rules() {
        assert!(sample().is_consistent());
        assert!(TransactionRecord::new("x").is_consistent());

        let mut processed_unknown = sample();
        processed_unknown.category = Category::Unknown;
        assert!(!processed_unknown.is_consistent());

        let mut unprocessed_with_amount = TransactionRecord::new("x");
        unprocessed_with_amount.amount = Some(Decimal::ONE);
        assert!(!unprocessed_with_amount.is_consistent());
    }
}

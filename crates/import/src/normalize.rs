use momo_core::{parse_amount, CoreError, ExtractedFields, RawMessage, Status, TransactionRecord};
use tracing::warn;

use crate::extract::Extractor;
use crate::rules::RuleTable;

/// Turns one raw message into exactly one [`TransactionRecord`].
#[derive(Clone, Copy)]
pub struct Normalizer<'r> {
    rules: &'r RuleTable,
}

impl Default for Normalizer<'static> {
    fn default() -> Self {
        Self { rules: RuleTable::builtin() }
    }
}

impl<'r> Normalizer<'r> {
    pub fn new(rules: &'r RuleTable) -> Self {
        Self { rules }
    }

    /// Never fails: a fault inside the message is recorded as `Status::Error`
    /// with every field computed before the fault left in place.
    pub fn normalize(&self, msg: &RawMessage) -> TransactionRecord {
        let mut record = TransactionRecord::new(msg.body.as_str());
        record.original_type = msg.original_type.clone();

        if let Err(e) = self.fill(msg, &mut record) {
            warn!(error = %e, body = %msg.body, "message could not be normalized");
            record.mark_error(e.to_string());
        }
        debug_assert!(record.is_consistent());
        record
    }

    fn fill(&self, msg: &RawMessage, record: &mut TransactionRecord) -> Result<(), CoreError> {
        let body = msg.body.as_str();

        let mut fields = Extractor::extract(body);
        let resolved = self.resolve(body, &mut fields, record);
        record.absorb(fields);
        resolved?;

        record.date_time = Some(msg.date_time()?);
        Ok(())
    }

    /// Category, parties and amount: from a template when one matches,
    /// otherwise from the first `<number> RWF` in the body.
    fn resolve(
        &self,
        body: &str,
        fields: &mut ExtractedFields,
        record: &mut TransactionRecord,
    ) -> Result<(), CoreError> {
        match self.rules.classify(body) {
            Some(c) => {
                record.category = c.category;
                let (sender, receiver) = c.parties();
                record.sender = Some(sender);
                record.receiver = Some(receiver);
                fields.amount = Some(parse_amount(c.amount)?);
                record.status = Status::Processed;
            }
            None => {
                fields.amount = Extractor::extract_amount(body)?;
                record.status = if fields.amount.is_some() {
                    Status::PartiallyProcessed
                } else {
                    Status::Unprocessed
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use momo_core::Category;
    use rust_decimal::Decimal;

    const TS: i64 = 1_715_358_658_000;

    fn normalize(body: &str) -> TransactionRecord {
        Normalizer::default().normalize(&RawMessage::new(body, TS))
    }

    #[test]
    fn incoming_money_fully_processed() {
        let r = normalize(
            "You have received 2,000 RWF from Jane Smith on 10 May. New balance is 15000 RWF. Ref: 12345.",
        );
        assert_eq!(r.category, Category::IncomingMoney);
        assert_eq!(r.amount, Some(Decimal::from(2000)));
        assert_eq!(r.sender.as_deref(), Some("Jane Smith"));
        assert_eq!(r.receiver.as_deref(), Some("You"));
        assert_eq!(r.balance, Some(Decimal::from(15000)));
        assert_eq!(r.reference_id.as_deref(), Some("12345"));
        assert_eq!(r.fee, Decimal::ZERO);
        assert_eq!(r.status, Status::Processed);
        assert_eq!(r.date_time.unwrap().to_string(), "2024-05-10 16:30:58");
    }

    #[test]
    fn outgoing_transfer_fully_processed() {
        let r = normalize("You have sent 500 RWF to John Doe. Your new balance is 14500 RWF.");
        assert_eq!(r.category, Category::MobileTransfer);
        assert_eq!(r.amount, Some(Decimal::from(500)));
        assert_eq!(r.sender.as_deref(), Some("You"));
        assert_eq!(r.receiver.as_deref(), Some("John Doe"));
        assert_eq!(r.balance, Some(Decimal::from(14500)));
        assert_eq!(r.status, Status::Processed);
    }

    #[test]
    fn amount_only_is_partially_processed() {
        let r = normalize("Your account was charged 1000 RWF.");
        assert_eq!(r.category, Category::Unknown);
        assert_eq!(r.amount, Some(Decimal::from(1000)));
        assert_eq!(r.sender, None);
        assert_eq!(r.status, Status::PartiallyProcessed);
    }

    #[test]
    fn no_amount_is_unprocessed() {
        let r = normalize("Welcome to our service.");
        assert_eq!(r.category, Category::Unknown);
        assert_eq!(r.amount, None);
        assert_eq!(r.status, Status::Unprocessed);
        assert!(r.date_time.is_some());
    }

    #[test]
    fn millions_keep_every_digit() {
        let r = normalize(
            "You have received 1,234,567 RWF from Jane Smith. New balance is 2,000,000 RWF. Ref: 7.",
        );
        assert_eq!(r.category, Category::IncomingMoney);
        assert_eq!(r.amount, Some(Decimal::from(1_234_567)));
        assert_eq!(r.balance, Some(Decimal::from(2_000_000)));
        assert_eq!(r.sender.as_deref(), Some("Jane Smith"));
        assert_eq!(r.status, Status::Processed);

        let r = normalize("Your account was charged 1,234,567 RWF. New balance is 2,000,000 RWF.");
        assert_eq!(r.category, Category::Unknown);
        assert_eq!(r.amount, Some(Decimal::from(1_234_567)));
        assert_eq!(r.balance, Some(Decimal::from(2_000_000)));
        assert_eq!(r.status, Status::PartiallyProcessed);
    }

    #[test]
    fn specific_template_beats_generic_fallback() {
        let r = normalize("Received 300 RWF from Alice. Your new balance is 900 RWF.");
        assert_eq!(r.status, Status::Processed);
        assert_eq!(r.category, Category::IncomingMoney);
        assert_eq!(r.amount, Some(Decimal::from(300)));
    }

    #[test]
    fn fee_is_carried_through() {
        let r = normalize("You paid 1,000 RWF to Cafe. New balance is 400 RWF. Fee: 15 RWF.");
        assert_eq!(r.category, Category::CodeHolderPayment);
        assert_eq!(r.receiver.as_deref(), Some("Cafe"));
        assert_eq!(r.fee, Decimal::from(15));
    }

    #[test]
    fn amount_overflow_marks_error_and_keeps_partials() {
        let body = format!(
            "You have received {} RWF from Jane. New balance is 10 RWF. Ref: 9.",
            "9".repeat(40)
        );
        let r = normalize(&body);
        assert_eq!(r.status, Status::Error);
        assert!(r.error_message.as_deref().unwrap().contains("Invalid amount"));
        assert_eq!(r.category, Category::IncomingMoney);
        assert_eq!(r.sender.as_deref(), Some("Jane"));
        assert_eq!(r.balance, Some(Decimal::from(10)));
        assert_eq!(r.reference_id.as_deref(), Some("9"));
        assert_eq!(r.amount, None);
        assert_eq!(r.raw_body, body);
    }

    #[test]
    fn out_of_range_timestamp_marks_error() {
        let msg = RawMessage::new("Your account was charged 1000 RWF.", i64::MAX);
        let r = Normalizer::default().normalize(&msg);
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.amount, Some(Decimal::from(1000)));
        assert_eq!(r.date_time, None);
    }

    #[test]
    fn normalization_is_deterministic() {
        let body = "You have sent 500 RWF to John Doe. Your new balance is 14500 RWF.";
        assert_eq!(normalize(body), normalize(body));
    }

    #[test]
    fn original_type_is_copied() {
        let msg = RawMessage::new("Welcome", TS).with_original_type("1");
        assert_eq!(Normalizer::default().normalize(&msg).original_type.as_deref(), Some("1"));
    }

    #[test]
    fn every_status_is_consistent() {
        for body in [
            "You have received 2000 RWF from A. New balance is 1 RWF.",
            "charged 1 RWF",
            "hello",
            "",
            "RWF RWF RWF",
        ] {
            let r = normalize(body);
            assert!(r.is_consistent(), "{body:?} -> {r:?}");
        }
    }

    #[test]
    fn custom_table_is_honoured() {
        let table = RuleTable::from_toml(
            r#"
            [[rule]]
            category = "Bank Deposits"
            patterns = ['Top-up (\d+) RWF via (.*?)\.']
            "#,
        )
        .unwrap();
        let r = Normalizer::new(&table).normalize(&RawMessage::new("Top-up 50 RWF via BK.", TS));
        assert_eq!(r.category, Category::BankDeposit);
        assert_eq!(r.sender.as_deref(), Some("BK"));
        assert_eq!(r.receiver.as_deref(), Some("You"));
    }
}

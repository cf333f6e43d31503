use std::sync::OnceLock;

use momo_core::{parse_amount, CoreError, ExtractedFields};
use regex::Regex;
use rust_decimal::Decimal;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

/// Amount as the notifications print it: `500`, `2,000`, `1,234,567`, `1,500.50`.
pub(crate) const AMOUNT: &str = r"\d+(?:,\d+)*(?:\.\d+)?";

re!(re_balance, &format!(r"balance is ({AMOUNT}) RWF"));
re!(re_fee, &format!(r"Fee: ({AMOUNT}) RWF"));
re!(re_reference, r"Ref: (\w+)|ID: (\w+)|TrxID: (\w+)|TransID: (\w+)");
re!(re_any_amount, &format!(r"({AMOUNT}) RWF"));

// ── Public extraction API ─────────────────────────────────────────────────────

/// Stateless recognizers for the category-independent fields.
///
/// Each recognizer runs on its own; one field failing to match never stops
/// another from being extracted.
pub struct Extractor;

impl Extractor {
    /// Balance, fee and reference id. `amount` is left for the classifier.
    pub fn extract(body: &str) -> ExtractedFields {
        ExtractedFields {
            amount: None,
            fee: Self::extract_fee(body),
            balance: Self::extract_balance(body),
            reference_id: Self::extract_reference_id(body),
        }
    }

    pub fn extract_balance(body: &str) -> Option<Decimal> {
        let c = re_balance().captures(body)?;
        parse_amount(c.get(1)?.as_str()).ok()
    }

    /// No fee phrase means no fee was charged.
    pub fn extract_fee(body: &str) -> Decimal {
        re_fee()
            .captures(body)
            .and_then(|c| parse_amount(c.get(1)?.as_str()).ok())
            .unwrap_or(Decimal::ZERO)
    }

    /// First populated group of `Ref:`, `ID:`, `TrxID:` or `TransID:`.
    pub fn extract_reference_id(body: &str) -> Option<String> {
        let c = re_reference().captures(body)?;
        c.iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// First `<number> RWF` anywhere in the body.
    ///
    /// `Ok(None)` when there is none; an error only when the number is
    /// outside the decimal range.
    pub fn extract_amount(body: &str) -> Result<Option<Decimal>, CoreError> {
        match re_any_amount().captures(body).and_then(|c| c.get(1)) {
            Some(m) => parse_amount(m.as_str()).map(Some),
            None => Ok(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::CoreError;

/// Parse an amount as printed in a notification, e.g. `2,000` or `1,500.50`.
///
/// Grouping commas are stripped. A trailing decimal point is tolerated for
/// templates loaded from a rule file that capture one.
pub fn parse_amount(raw: &str) -> Result<Decimal, CoreError> {
    let clean = raw.trim().replace(',', "");
    let clean = clean.strip_suffix('.').unwrap_or(&clean);
    if clean.is_empty() {
        return Err(CoreError::InvalidAmount(raw.to_string()));
    }
    Decimal::from_str(clean).map_err(|_| CoreError::InvalidAmount(raw.to_string()))
}

use std::collections::BTreeMap;
use std::fmt;

use momo_core::{Category, CategoryCount, FlowTotals, MonthlyVolume, Summary, TransactionRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-bucket counts reported at the end of every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub processed: usize,
    pub unprocessed: usize,
    pub errors: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.processed + self.unprocessed + self.errors
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} unprocessed={} errors={}",
            self.processed, self.unprocessed, self.errors
        )
    }
}

/// Aggregate in-memory records the way the dashboard summary does.
///
/// Records without an amount are ignored.
pub fn summarize(records: &[TransactionRecord]) -> Summary {
    let mut summary = Summary::default();
    let mut counts: Vec<(Category, u64)> = Category::ALL.iter().map(|c| (*c, 0)).collect();
    let mut monthly: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut flow = FlowTotals::default();

    for record in records {
        let Some(amount) = record.amount else {
            continue;
        };
        summary.total_transactions += 1;
        summary.total_amount += amount;
        summary.total_fees += record.fee;

        if let Some(slot) = counts.iter_mut().find(|(c, _)| *c == record.category) {
            slot.1 += 1;
        }
        if let Some(dt) = record.date_time {
            *monthly.entry(dt.format("%Y-%m").to_string()).or_default() += amount;
        }
        flow.add(record.category, amount);
    }

    if summary.total_transactions > 0 {
        summary.average_amount =
            (summary.total_amount / Decimal::from(summary.total_transactions)).round_dp(2);
    }

    // Stable sort keeps priority order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    summary.by_category = counts
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(name, count)| CategoryCount { name, count })
        .collect();
    summary.monthly_volume = monthly
        .into_iter()
        .map(|(month, total_amount)| MonthlyVolume { month, total_amount })
        .collect();
    summary.flow = flow;
    summary
}

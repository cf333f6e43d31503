use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::category::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: Category,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyVolume {
    /// `YYYY-MM`
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// Money in (Incoming Money, Bank Deposits) against everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub deposits: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub payments: Decimal,
}

impl FlowTotals {
    pub fn add(&mut self, category: Category, amount: Decimal) {
        if category.is_inflow() {
            self.deposits += amount;
        } else {
            self.payments += amount;
        }
    }
}

/// Dashboard aggregates over records that carry an amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_transactions: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_fees: Decimal,
    /// Most frequent first.
    pub by_category: Vec<CategoryCount>,
    /// Oldest month first.
    pub monthly_volume: Vec<MonthlyVolume>,
    pub flow: FlowTotals,
}

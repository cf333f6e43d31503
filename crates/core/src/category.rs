use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The account holder, as named on the "you" side of every classified record.
pub const ACCOUNT_HOLDER: &str = "You";

/// Transaction categories, in classification priority order.
///
/// The names are persisted verbatim and downstream filtering depends on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Incoming Money")]
    IncomingMoney,
    #[serde(rename = "Payments to Code Holders")]
    CodeHolderPayment,
    #[serde(rename = "Transfers to Mobile Numbers")]
    MobileTransfer,
    #[serde(rename = "Bank Deposits")]
    BankDeposit,
    #[serde(rename = "Airtime Bill Payments")]
    AirtimePayment,
    #[serde(rename = "Transactions Initiated by Third Parties")]
    ThirdPartyDebit,
    #[serde(rename = "Withdrawals from Agents")]
    AgentWithdrawal,
    #[default]
    Unknown,
}

impl Category {
    /// Every category, Unknown last.
    pub const ALL: [Category; 8] = [
        Category::IncomingMoney,
        Category::CodeHolderPayment,
        Category::MobileTransfer,
        Category::BankDeposit,
        Category::AirtimePayment,
        Category::ThirdPartyDebit,
        Category::AgentWithdrawal,
        Category::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::IncomingMoney => "Incoming Money",
            Category::CodeHolderPayment => "Payments to Code Holders",
            Category::MobileTransfer => "Transfers to Mobile Numbers",
            Category::BankDeposit => "Bank Deposits",
            Category::AirtimePayment => "Airtime Bill Payments",
            Category::ThirdPartyDebit => "Transactions Initiated by Third Parties",
            Category::AgentWithdrawal => "Withdrawals from Agents",
            Category::Unknown => "Unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != Category::Unknown
    }

    /// Money flowing into the account holder's wallet.
    pub fn is_inflow(self) -> bool {
        matches!(self, Category::IncomingMoney | Category::BankDeposit)
    }

    /// Fixed sender/receiver policy for this category.
    pub fn default_role(self) -> Role {
        if self.is_inflow() {
            Role::CounterpartySends
        } else {
            Role::HolderSends
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}

/// Which side of a transfer the captured counterparty sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// sender = counterparty, receiver = account holder
    CounterpartySends,
    /// sender = account holder, receiver = counterparty
    HolderSends,
}

impl Role {
    /// Returns `(sender, receiver)`.
    pub fn assign(self, counterparty: &str) -> (String, String) {
        let counterparty = counterparty.trim().to_string();
        match self {
            Role::CounterpartySends => (counterparty, ACCOUNT_HOLDER.to_string()),
            Role::HolderSends => (ACCOUNT_HOLDER.to_string(), counterparty),
        }
    }
}

use std::path::Path;
use std::sync::OnceLock;

use momo_core::{Category, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::extract::AMOUNT;

/// Built-in template table, in classification priority order.
///
/// Group 1 is the amount, group 2 the counterparty. `{amount}` is replaced
/// by the shared amount pattern before compiling.
const BUILTIN: &[(Category, &[&str])] = &[
    (
        Category::IncomingMoney,
        &[
            r"You have received ({amount}) RWF from (.*?)(?: on |\. New balance is|\.)",
            r"Received ({amount}) RWF from (.*?)\. Your new balance is",
        ],
    ),
    (
        Category::CodeHolderPayment,
        &[
            r"You paid ({amount}) RWF to (.*?)\. New balance is",
            r"Paid ({amount}) RWF to (.*?)\. Your new balance is",
        ],
    ),
    (
        Category::MobileTransfer,
        &[
            r"You have sent ({amount}) RWF to (.*?)\. Your new balance is",
            r"Sent ({amount}) RWF to (.*?)\. New balance is",
        ],
    ),
    (
        Category::BankDeposit,
        &[
            r"({amount}) RWF has been added to your mobile money account at .*? from (.*?)\. Your NEW BALANCE",
            r"Deposit of ({amount}) RWF from (.*?)\. Your new balance is",
        ],
    ),
    (
        Category::AirtimePayment,
        &[r"You have bought airtime worth ({amount}) RWF for (.*?)\. Your new balance is"],
    ),
    (
        Category::ThirdPartyDebit,
        &[r"({amount}) RWF has been deducted from your mobile money account by (.*?)\. Your new balance is"],
    ),
    (
        Category::AgentWithdrawal,
        &[r"You have withdrawn ({amount}) RWF from (.*?)\. Your new balance is"],
    ),
];

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Cannot read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Rule table is empty")]
    NoRules,
    #[error("Rule for '{0}' has no patterns")]
    NoPatterns(Category),
    #[error("'{0}' cannot be the target of a rule")]
    UnassignableCategory(Category),
    #[error("Invalid pattern for '{category}': {source}")]
    InvalidPattern {
        category: Category,
        #[source]
        source: regex::Error,
    },
    #[error("Pattern for '{category}' must capture amount and counterparty: {pattern}")]
    MissingCaptures { category: Category, pattern: String },
}

/// One category and the templates that recognise it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    /// Overrides the category's fixed sender/receiver policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub patterns: Vec<String>,
}

impl CategoryRule {
    pub fn role(&self) -> Role {
        self.role.unwrap_or_else(|| self.category.default_role())
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(rename = "rule", default)]
    rules: Vec<CategoryRule>,
}

/// Result of a successful classification. Captures borrow from the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub category: Category,
    pub role: Role,
    pub amount: &'a str,
    pub counterparty: &'a str,
}

impl Classification<'_> {
    /// `(sender, receiver)` for this match.
    pub fn parties(&self) -> (String, String) {
        self.role.assign(self.counterparty)
    }
}

/// Internal pairing of a rule with its precompiled templates.
#[derive(Debug)]
struct CompiledRule {
    rule: CategoryRule,
    templates: Vec<Regex>,
}

/// Ordered, read-only classification table.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    /// Rules are kept in the order given; that order is the priority.
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, RuleError> {
        if rules.is_empty() {
            return Err(RuleError::NoRules);
        }
        let compiled = rules
            .into_iter()
            .map(|rule| {
                if !rule.category.is_known() {
                    return Err(RuleError::UnassignableCategory(rule.category));
                }
                if rule.patterns.is_empty() {
                    return Err(RuleError::NoPatterns(rule.category));
                }
                let templates = rule
                    .patterns
                    .iter()
                    .map(|p| compile_template(rule.category, p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledRule { rule, templates })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { rules: compiled })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Self::new(file.rules)
    }

    pub fn from_file(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// The table at `path`, or the shipped one when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, RuleError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::new(Self::default_rules()),
        }
    }

    /// The shipped template table.
    pub fn default_rules() -> Vec<CategoryRule> {
        BUILTIN
            .iter()
            .map(|(category, patterns)| CategoryRule {
                category: *category,
                role: None,
                patterns: patterns.iter().map(|p| p.replace("{amount}", AMOUNT)).collect(),
            })
            .collect()
    }

    /// Shared instance of the shipped table, compiled on first use.
    pub fn builtin() -> &'static RuleTable {
        static TABLE: OnceLock<RuleTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            RuleTable::new(Self::default_rules()).expect("invalid built-in rule table")
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    /// First matching template wins, scanning categories and then their
    /// templates in declaration order. `None` means the category is Unknown.
    pub fn classify<'a>(&self, body: &'a str) -> Option<Classification<'a>> {
        for cr in &self.rules {
            for template in &cr.templates {
                let Some(c) = template.captures(body) else {
                    continue;
                };
                let (Some(amount), Some(counterparty)) = (c.get(1), c.get(2)) else {
                    continue;
                };
                debug!(category = %cr.rule.category, template = template.as_str(), "classified");
                return Some(Classification {
                    category: cr.rule.category,
                    role: cr.rule.role(),
                    amount: amount.as_str(),
                    counterparty: counterparty.as_str(),
                });
            }
        }
        None
    }
}

fn compile_template(category: Category, pattern: &str) -> Result<Regex, RuleError> {
    let re = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern { category, source })?;
    // Group 0 plus amount and counterparty.
    if re.captures_len() < 3 {
        return Err(RuleError::MissingCaptures { category, pattern: pattern.to_string() });
    }
    Ok(re)
}

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use momo_core::{
    Category, CategoryCount, FlowTotals, MonthlyVolume, Status, Summary, TransactionRecord,
    DATE_FORMAT,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use thiserror::Error;
use tracing::info;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Record {index} cannot be stored: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transaction_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT UNIQUE,
            type_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            amount REAL NOT NULL,
            fee REAL NOT NULL DEFAULT 0,
            balance REAL,
            sender TEXT,
            receiver TEXT,
            raw_body TEXT NOT NULL,
            status TEXT NOT NULL,
            FOREIGN KEY (type_id) REFERENCES transaction_types(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date)")
        .execute(pool)
        .await?;

    Ok(())
}

// ── Transaction types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionType {
    pub id: i64,
    pub name: String,
}

/// Insert every category name. Safe to call repeatedly.
pub async fn seed_transaction_types(pool: &DbPool) -> Result<(), StorageError> {
    for category in Category::ALL {
        sqlx::query("INSERT OR IGNORE INTO transaction_types (name) VALUES (?)")
            .bind(category.name())
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn get_transaction_types(pool: &DbPool) -> Result<Vec<TransactionType>, StorageError> {
    let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM transaction_types ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id, name)| TransactionType { id, name }).collect())
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Store processed records in one SQL transaction.
///
/// Any unusable record rolls the whole load back. Records whose reference
/// id is already stored are skipped. Returns the number of rows inserted.
pub async fn load_transactions(
    pool: &DbPool,
    records: &[TransactionRecord],
) -> Result<u64, StorageError> {
    let mut tx = pool.begin().await?;

    let type_ids: HashMap<String, i64> =
        sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM transaction_types")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, name)| (name, id))
            .collect();

    let mut inserted = 0;
    for (index, record) in records.iter().enumerate() {
        let invalid = |reason: String| StorageError::InvalidRecord { index, reason };

        if record.status == Status::Error {
            return Err(invalid("error records are not stored".to_string()));
        }
        let date = record
            .date_time
            .ok_or_else(|| invalid("missing date".to_string()))?;
        let amount = record
            .amount
            .and_then(|a| a.to_f64())
            .ok_or_else(|| invalid("missing amount".to_string()))?;
        let type_id = *type_ids
            .get(record.category.name())
            .ok_or_else(|| invalid(format!("unknown transaction type '{}'", record.category)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO transactions
                (transaction_id, type_id, date, amount, fee, balance, sender, receiver, raw_body, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(transaction_id) DO NOTHING
            "#,
        )
        .bind(record.reference_id.as_deref())
        .bind(type_id)
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(amount)
        .bind(record.fee.to_f64().unwrap_or(0.0))
        .bind(record.balance.and_then(|b| b.to_f64()))
        .bind(record.sender.as_deref())
        .bind(record.receiver.as_deref())
        .bind(record.raw_body.as_str())
        .bind(record.status.as_str())
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    info!(inserted, total = records.len(), "transactions loaded");
    Ok(inserted)
}

// ── Queries ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// `None` means every category.
    pub category: Option<Category>,
    /// Inclusive.
    pub start_date: Option<NaiveDate>,
    /// Inclusive of the whole day.
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive match on body, sender or receiver.
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub transaction_id: Option<String>,
    pub type_name: Category,
    pub date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub balance: Option<Decimal>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub raw_body: String,
    pub status: Status,
}

type TransactionRow = (
    i64,
    Option<String>,
    String,
    String,
    f64,
    f64,
    Option<f64>,
    Option<String>,
    Option<String>,
    String,
    String,
);

/// Newest first.
pub async fn query_transactions(
    pool: &DbPool,
    filter: &TransactionFilter,
) -> Result<Vec<StoredTransaction>, StorageError> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT t.id, t.transaction_id, tt.name, t.date, t.amount, t.fee, t.balance, \
         t.sender, t.receiver, t.raw_body, t.status \
         FROM transactions t JOIN transaction_types tt ON t.type_id = tt.id WHERE 1 = 1",
    );
    if let Some(category) = filter.category {
        qb.push(" AND tt.name = ").push_bind(category.name());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND t.date >= ").push_bind(start.format("%Y-%m-%d").to_string());
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND t.date < date(")
            .push_bind(end.format("%Y-%m-%d").to_string())
            .push(", '+1 day')");
    }
    if let Some(term) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let like = format!("%{term}%");
        qb.push(" AND (t.raw_body LIKE ")
            .push_bind(like.clone())
            .push(" OR t.sender LIKE ")
            .push_bind(like.clone())
            .push(" OR t.receiver LIKE ")
            .push_bind(like)
            .push(")");
    }
    qb.push(" ORDER BY t.date DESC, t.id DESC");

    let rows = qb.build_query_as::<TransactionRow>().fetch_all(pool).await?;
    rows.into_iter().map(row_to_transaction).collect()
}

fn row_to_transaction(r: TransactionRow) -> Result<StoredTransaction, StorageError> {
    let id = r.0;
    let corrupt = |reason: String| StorageError::CorruptRow { id, reason };
    Ok(StoredTransaction {
        id,
        transaction_id: r.1,
        type_name: r.2.parse::<Category>().map_err(|e: momo_core::CoreError| corrupt(e.to_string()))?,
        date: r.3,
        amount: from_real(r.4),
        fee: from_real(r.5),
        balance: r.6.map(from_real),
        sender: r.7,
        receiver: r.8,
        raw_body: r.9,
        status: r.10.parse::<Status>().map_err(|e: momo_core::CoreError| corrupt(e.to_string()))?,
    })
}

fn from_real(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or_default().round_dp(2)
}

// ── Summary ───────────────────────────────────────────────────────────────────

pub async fn get_summary(pool: &DbPool) -> Result<Summary, StorageError> {
    let (count, total, avg, fees) = sqlx::query_as::<_, (i64, f64, f64, f64)>(
        "SELECT COUNT(id), COALESCE(SUM(amount), 0.0), COALESCE(AVG(amount), 0.0), COALESCE(SUM(fee), 0.0) FROM transactions",
    )
    .fetch_one(pool)
    .await?;

    let by_type = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT tt.name, COUNT(t.id)
        FROM transaction_types tt JOIN transactions t ON t.type_id = tt.id
        GROUP BY tt.id, tt.name
        ORDER BY COUNT(t.id) DESC, tt.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let monthly = sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT strftime('%Y-%m', date) AS month, SUM(amount)
        FROM transactions
        GROUP BY month
        ORDER BY month
        "#,
    )
    .fetch_all(pool)
    .await?;

    let by_type_amount = sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT tt.name, SUM(t.amount)
        FROM transactions t JOIN transaction_types tt ON t.type_id = tt.id
        GROUP BY tt.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut by_category = Vec::with_capacity(by_type.len());
    for (name, n) in by_type {
        let name: Category = name
            .parse()
            .map_err(|e: momo_core::CoreError| StorageError::CorruptRow { id: 0, reason: e.to_string() })?;
        by_category.push(CategoryCount { name, count: n as u64 });
    }

    let mut flow = FlowTotals::default();
    for (name, sum) in by_type_amount {
        if let Ok(category) = name.parse::<Category>() {
            flow.add(category, from_real(sum));
        }
    }

    Ok(Summary {
        total_transactions: count as u64,
        total_amount: from_real(total),
        average_amount: from_real(avg),
        total_fees: from_real(fees),
        by_category,
        monthly_volume: monthly
            .into_iter()
            .map(|(month, total_amount)| MonthlyVolume { month, total_amount: from_real(total_amount) })
            .collect(),
        flow,
    })
}

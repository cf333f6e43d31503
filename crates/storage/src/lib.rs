pub mod db;

pub use db::{
    create_db, get_summary, get_transaction_types, load_transactions, query_transactions,
    seed_transaction_types, DbPool, StorageError, StoredTransaction, TransactionFilter,
    TransactionType,
};

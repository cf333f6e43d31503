pub mod category;
pub mod error;
pub mod message;
pub mod money;
pub mod record;
pub mod summary;

pub use category::{Category, Role, ACCOUNT_HOLDER};
pub use error::CoreError;
pub use message::{ExtractedFields, RawMessage};
pub use money::parse_amount;
pub use record::{Bucket, Status, TransactionRecord, DATE_FORMAT};
pub use summary::{CategoryCount, FlowTotals, MonthlyVolume, Summary};

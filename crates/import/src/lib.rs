pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod source;
pub mod stats;

pub use extract::Extractor;
pub use normalize::Normalizer;
pub use pipeline::{BatchOutcome, BatchPipeline, PipelineError, ReviewLog};
pub use rules::{CategoryRule, Classification, RuleError, RuleTable};
pub use source::{parse_backup, read_backup, SourceEntry, SourceError};
pub use stats::{summarize, BatchStats};

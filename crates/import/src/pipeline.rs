use std::io::{BufWriter, Write};
use std::path::Path;

use momo_core::{Bucket, RawMessage, TransactionRecord};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::normalize::Normalizer;
use crate::source::{read_backup, SourceEntry, SourceError};
use crate::stats::BatchStats;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("Cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Secondary artifact: everything that needs a human look.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    pub unprocessed: Vec<TransactionRecord>,
    pub errors: Vec<TransactionRecord>,
}

/// Records of one run, partitioned by bucket in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Processed and partially processed records.
    pub processed: Vec<TransactionRecord>,
    pub review: ReviewLog,
}

impl BatchOutcome {
    pub fn push(&mut self, record: TransactionRecord) {
        match record.bucket() {
            Bucket::Processed => self.processed.push(record),
            Bucket::Unprocessed => self.review.unprocessed.push(record),
            Bucket::Errors => self.review.errors.push(record),
        }
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            processed: self.processed.len(),
            unprocessed: self.review.unprocessed.len(),
            errors: self.review.errors.len(),
        }
    }

    /// Persist both artifacts. Neither path is touched unless both encode,
    /// and the processed output is replaced only once the review log is in
    /// place.
    pub fn write(&self, processed_path: &Path, review_path: &Path) -> Result<(), PipelineError> {
        let processed = stage_json(processed_path, &self.processed)?;
        let review = stage_json(review_path, &self.review)?;
        commit(review, review_path)?;
        commit(processed, processed_path)?;
        Ok(())
    }
}

/// Runs every message of an import source through the normalizer.
pub struct BatchPipeline<'r> {
    normalizer: Normalizer<'r>,
}

impl Default for BatchPipeline<'static> {
    fn default() -> Self {
        Self::new(Normalizer::default())
    }
}

impl<'r> BatchPipeline<'r> {
    pub fn new(normalizer: Normalizer<'r>) -> Self {
        Self { normalizer }
    }

    /// One record per entry. A malformed entry becomes an Error record
    /// carrying its raw body; the batch always runs to the end.
    pub fn process_entry(&self, entry: &SourceEntry) -> TransactionRecord {
        match entry.to_raw_message() {
            Ok(msg) => self.normalizer.normalize(&msg),
            Err(e) => {
                warn!(error = %e, date = ?entry.date, "skipping malformed message");
                let mut record = TransactionRecord::new(entry.body.clone().unwrap_or_default());
                record.original_type = entry.kind.clone();
                record.mark_error(e.to_string());
                record
            }
        }
    }

    pub fn run<'e, I>(&self, entries: I) -> BatchOutcome
    where
        I: IntoIterator<Item = &'e SourceEntry>,
    {
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            outcome.push(self.process_entry(entry));
        }
        outcome
    }

    /// For callers that already hold parsed messages.
    pub fn run_messages(&self, messages: &[RawMessage]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for msg in messages {
            outcome.push(self.normalizer.normalize(msg));
        }
        outcome
    }

    /// Read `input`, normalize every message and write both artifacts.
    ///
    /// A source that cannot be read or parsed aborts before anything is written.
    pub fn process_file(
        &self,
        input: &Path,
        processed_path: &Path,
        review_path: &Path,
    ) -> Result<BatchStats, PipelineError> {
        let entries = read_backup(input)?;
        info!(input = %input.display(), messages = entries.len(), "import source loaded");

        let outcome = self.run(&entries);
        outcome.write(processed_path, review_path)?;

        let stats = outcome.stats();
        info!(%stats, "processing complete");
        Ok(stats)
    }
}

// ── Artifact writing ──────────────────────────────────────────────────────────

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Write { path: path.display().to_string(), source }
}

/// Serialize into a temp file next to `path`.
fn stage_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<NamedTempFile, PipelineError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err(path))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err(path))?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut w, value)?;
        w.flush().map_err(write_err(path))?;
    }
    Ok(tmp)
}

fn commit(tmp: NamedTempFile, path: &Path) -> Result<(), PipelineError> {
    tmp.persist(path).map_err(|e| write_err(path)(e.error))?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_backup;
    use momo_core::{Category, Status};

    fn entry(body: &str, date: &str) -> SourceEntry {
        SourceEntry {
            body: Some(body.to_string()),
            date: Some(date.to_string()),
            kind: Some("1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn bad_date_is_isolated_to_its_message() {
        let entries = vec![
            entry("You have received 2000 RWF from Jane Smith. New balance is 15000 RWF.", "1715351458637"),
            entry("You have sent 500 RWF to John Doe. Your new balance is 14500 RWF.", "yesterday"),
            entry("Your account was charged 1000 RWF.", "1715369560245"),
        ];
        let outcome = BatchPipeline::default().run(&entries);

        assert_eq!(outcome.processed.len(), 2);
        assert_eq!(outcome.review.unprocessed.len(), 0);
        assert_eq!(outcome.review.errors.len(), 1);
        let err = &outcome.review.errors[0];
        assert_eq!(err.raw_body, "You have sent 500 RWF to John Doe. Your new balance is 14500 RWF.");
        assert_eq!(err.status, Status::Error);
        assert!(err.error_message.as_deref().unwrap().contains("yesterday"));
    }

    #[test]
    fn buckets_keep_source_order() {
        let entries = vec![
            entry("Your account was charged 1 RWF.", "1000"),
            entry("Hello", "2000"),
            entry("Received 3 RWF from A. Your new balance is 3 RWF.", "3000"),
            entry("Bye", "4000"),
        ];
        let outcome = BatchPipeline::default().run(&entries);
        assert_eq!(outcome.processed[0].status, Status::PartiallyProcessed);
        assert_eq!(outcome.processed[1].category, Category::IncomingMoney);
        assert_eq!(outcome.review.unprocessed[0].raw_body, "Hello");
        assert_eq!(outcome.review.unprocessed[1].raw_body, "Bye");
        assert_eq!(outcome.stats(), BatchStats { processed: 2, unprocessed: 2, errors: 0 });
    }

    #[test]
    fn every_message_failing_still_counts() {
        let entries = vec![entry("a", "x"), entry("b", "y"), SourceEntry::default()];
        let outcome = BatchPipeline::default().run(&entries);
        assert_eq!(outcome.stats(), BatchStats { processed: 0, unprocessed: 0, errors: 3 });
        assert_eq!(outcome.review.errors[2].raw_body, "");
    }

    #[test]
    fn run_messages_matches_entry_path() {
        let msgs = vec![RawMessage::new("Hello", 0), RawMessage::new("Paid 5 RWF to Shop. Your new balance is 1 RWF.", 0)];
        let outcome = BatchPipeline::default().run_messages(&msgs);
        assert_eq!(outcome.stats(), BatchStats { processed: 1, unprocessed: 1, errors: 0 });
        assert_eq!(outcome.processed[0].category, Category::CodeHolderPayment);
    }

    #[test]
    fn process_file_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sms.xml");
        let mut f = std::fs::File::create(&input).unwrap();
        write!(
            f,
            r#"<smses>
  <sms date="1715351458637" type="1" body="You have received 2,000 RWF from Jane Smith on 10 May. New balance is 15000 RWF. Ref: 12345." />
  <sms date="oops" type="1" body="You have sent 500 RWF to John Doe. Your new balance is 14500 RWF." />
  <sms date="1715369560245" type="1" body="Welcome to our service." />
</smses>"#
        )
        .unwrap();

        let processed = dir.path().join("out/processed.json");
        let review = dir.path().join("out/review.json");
        let stats = BatchPipeline::default().process_file(&input, &processed, &review).unwrap();
        assert_eq!(stats, BatchStats { processed: 1, unprocessed: 1, errors: 1 });

        let records: Vec<TransactionRecord> =
            serde_json::from_str(&std::fs::read_to_string(&processed).unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reference_id.as_deref(), Some("12345"));

        let log: ReviewLog = serde_json::from_str(&std::fs::read_to_string(&review).unwrap()).unwrap();
        assert_eq!(log.unprocessed[0].raw_body, "Welcome to our service.");
        assert_eq!(log.errors[0].status, Status::Error);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&processed).unwrap()).unwrap();
        assert_eq!(raw[0]["type"], "Incoming Money");
        assert_eq!(raw[0]["amount"], 2000.0);
    }

    #[test]
    fn unreadable_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("processed.json");
        let review = dir.path().join("review.json");

        let missing = BatchPipeline::default().process_file(&dir.path().join("nope.xml"), &processed, &review);
        assert!(matches!(missing, Err(PipelineError::Source(SourceError::Io { .. }))));

        let broken = dir.path().join("broken.xml");
        std::fs::write(&broken, "<smses><sms body=").unwrap();
        let malformed = BatchPipeline::default().process_file(&broken, &processed, &review);
        assert!(matches!(malformed, Err(PipelineError::Source(SourceError::Xml(_)))));

        assert!(!processed.exists());
        assert!(!review.exists());
    }

    #[test]
    fn failed_review_write_leaves_processed_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("processed.json");
        let review = dir.path().join("review");
        std::fs::write(&processed, "[\"previous run\"]").unwrap();
        std::fs::create_dir(&review).unwrap();
        std::fs::write(review.join("keep"), "x").unwrap();

        let outcome = BatchPipeline::default().run(&[entry("Hello", "1000")]);
        let err = outcome.write(&processed, &review).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
        assert_eq!(std::fs::read_to_string(&processed).unwrap(), "[\"previous run\"]");
    }

    #[test]
    fn empty_source_still_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.xml");
        std::fs::write(&input, "<smses count=\"0\"></smses>").unwrap();
        let processed = dir.path().join("p.json");
        let review = dir.path().join("r.json");
        let stats = BatchPipeline::default().process_file(&input, &processed, &review).unwrap();
        assert_eq!(stats.total(), 0);
        assert_eq!(std::fs::read_to_string(&processed).unwrap().trim(), "[]");
        let log: ReviewLog = serde_json::from_str(&std::fs::read_to_string(&review).unwrap()).unwrap();
        assert_eq!(log, ReviewLog::default());
    }

    #[test]
    fn parsed_backup_feeds_the_pipeline() {
        let entries = parse_backup(r#"<smses><sms date="0" body="Hi" /></smses>"#).unwrap();
        assert_eq!(BatchPipeline::default().run(&entries).review.unprocessed.len(), 1);
    }
}

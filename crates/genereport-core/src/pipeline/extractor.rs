//! Mutation extraction from stored result files.

use std::io::BufReader;

use tracing::info;

use super::{parse_mutations, PipelineError, PipelineResult};
use crate::config::ShortLinePolicy;
use crate::db::Database;
use crate::models::Mutation;
use crate::storage::ObjectStore;

/// Reads a result file's blob and persists its variants.
pub struct MutationExtractor<'a> {
    db: &'a Database,
    store: &'a dyn ObjectStore,
    short_line_policy: ShortLinePolicy,
}

impl<'a> MutationExtractor<'a> {
    pub fn new(db: &'a Database, store: &'a dyn ObjectStore) -> Self {
        Self {
            db,
            store,
            short_line_policy: ShortLinePolicy::default(),
        }
    }

    pub fn with_short_line_policy(mut self, policy: ShortLinePolicy) -> Self {
        self.short_line_policy = policy;
        self
    }

    /// Parse the result file and insert one mutation per data line.
    ///
    /// The whole stream is parsed before anything is written, and the rows go
    /// in as a single transaction: a bad line or an unreadable blob leaves the
    /// database untouched.
    pub fn extract(&self, result_file_id: &str) -> PipelineResult<Vec<Mutation>> {
        let file = self
            .db
            .get_result_file(result_file_id)?
            .ok_or_else(|| PipelineError::NotFound(format!("result file {}", result_file_id)))?;

        if !self.db.sample_exists(&file.sample_id)? {
            return Err(PipelineError::NotFound(format!("sample {}", file.sample_id)));
        }

        let reader = self.store.get(&file.storage_key)?;
        let parsed = parse_mutations(BufReader::new(reader), self.short_line_policy)?;

        let mutations: Vec<Mutation> = parsed
            .records
            .into_iter()
            .map(|record| Mutation::from_record(record, &file.sample_id, &file.result_file_id))
            .collect();

        self.db.insert_mutations(&mutations)?;

        info!(
            result_file_id,
            sample_id = %file.sample_id,
            mutations = mutations.len(),
            skipped_lines = parsed.skipped_lines.len(),
            "extracted mutations"
        );
        Ok(mutations)
    }
}

//! Mutation models.

use serde::{Deserialize, Serialize};

/// Clinical relevance of a variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelevanceTier {
    Low,
    Medium,
    High,
}

impl RelevanceTier {
    /// Match a token case-insensitively against the closed set.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(RelevanceTier::Low),
            "MEDIUM" => Some(RelevanceTier::Medium),
            "HIGH" => Some(RelevanceTier::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceTier::Low => "LOW",
            RelevanceTier::Medium => "MEDIUM",
            RelevanceTier::High => "HIGH",
        }
    }
}

/// A parsed variant that has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationRecord {
    pub gene: String,
    pub chromosome: String,
    /// e.g. "SNV", "DELETION", "INSERTION"
    pub mutation_type: String,
    pub relevance: RelevanceTier,
    pub comment: String,
}

/// A persisted variant finding. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mutation {
    /// UUID
    pub mutation_id: String,
    pub sample_id: String,
    /// Result file the variant was extracted from
    pub result_file_id: String,
    pub gene: String,
    pub chromosome: String,
    pub mutation_type: String,
    pub relevance: RelevanceTier,
    pub comment: String,
    pub created_at: String,
}

impl Mutation {
    /// Bind a parsed record to its sample and source file.
    pub fn from_record(record: MutationRecord, sample_id: &str, result_file_id: &str) -> Self {
        Self {
            mutation_id: uuid::Uuid::new_v4().to_string(),
            sample_id: sample_id.to_string(),
            result_file_id: result_file_id.to_string(),
            gene: record.gene,
            chromosome: record.chromosome,
            mutation_type: record.mutation_type,
            relevance: record.relevance,
            comment: record.comment,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

//! Prompt assembly for report generation.
//!
//! The output is deterministic for a given sample, patient, date and
//! mutation list, so identical inputs always produce identical prompts.

use chrono::NaiveDate;
use genereport_llm::make_report_prompt;

use super::{PipelineError, PipelineResult};
use crate::models::{Mutation, Patient, Sample};

/// Inputs to a report prompt.
pub struct PromptInput<'a> {
    pub sample: &'a Sample,
    pub patient: Option<&'a Patient>,
    /// Free-text context supplied by the caller
    pub patient_context: Option<&'a str>,
    /// Mutations in extraction order
    pub mutations: &'a [Mutation],
    /// Used for age calculation
    pub today: NaiveDate,
}

/// Build the full prompt, refusing inputs with more than `max_mutations` variants.
pub fn build_report_prompt(input: &PromptInput<'_>, max_mutations: usize) -> PipelineResult<String> {
    if input.mutations.len() > max_mutations {
        return Err(PipelineError::Validation(format!(
            "sample {} has {} mutations; at most {} fit in one report",
            input.sample.sample_id,
            input.mutations.len(),
            max_mutations
        )));
    }
    Ok(make_report_prompt(&build_context(input)))
}

/// Render sample, patient and variant context as plain text.
pub fn build_context(input: &PromptInput<'_>) -> String {
    let sample = input.sample;
    let mut out = String::new();

    out.push_str("## Sample\n");
    out.push_str(&format!("Type: {}\n", sample.kind.label()));
    for line in sample.kind.detail_lines() {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("Collection date: {}\n", sample.collection_date));
    out.push_str(&format!("Status: {}\n", sample.status.label()));
    if let Some(notes) = sample.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        out.push_str(&format!("Notes: {}\n", notes.trim()));
    }

    let demographics = input
        .patient
        .map(|p| p.demographic_summary(input.today))
        .unwrap_or_default();
    let extra = input.patient_context.map(str::trim).unwrap_or("");
    if !demographics.is_empty() || !extra.is_empty() {
        out.push_str("\n## Patient\n");
        if !demographics.is_empty() {
            out.push_str(&demographics);
            out.push('\n');
        }
        if !extra.is_empty() {
            out.push_str(extra);
            out.push('\n');
        }
    }

    out.push_str(&format!("\n## Variants ({})\n", input.mutations.len()));
    for (idx, m) in input.mutations.iter().enumerate() {
        out.push_str(&format!(
            "{}. Gene: {} | Chromosome: {} | Type: {} | Relevance: {}",
            idx + 1,
            m.gene,
            m.chromosome,
            m.mutation_type,
            m.relevance.as_str()
        ));
        if !m.comment.is_empty() {
            out.push_str(&format!(" | Comment: {}", m.comment));
        }
        out.push('\n');
    }

    out
}

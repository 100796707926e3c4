//! Prompts for clinical genetic report generation.
//!
//! The sample-specific context (sample metadata, patient demographics and the
//! variant table) is assembled by the caller; this module owns the fixed
//! instructions wrapped around it.

/// System prompt for the report writer.
pub const SYSTEM_PROMPT: &str = r#"You are a clinical genetics assistant that drafts reports for physicians.

You receive the metadata of a biological sample, optional patient demographics,
and the complete list of genetic variants detected in that sample.

Rules:
- Discuss every variant you are given. Never invent variants that are not listed.
- Treat HIGH relevance variants first, then MEDIUM, then LOW.
- Use cautious clinical language; the report is reviewed by a physician before use.
- Do not give dosing instructions or definitive diagnoses."#;

/// Sections the generated report must contain, in order.
pub const REPORT_SECTIONS: &[&str] = &[
    "Summary",
    "Sample Information",
    "Variant Findings",
    "Clinical Interpretation",
    "Recommendations",
    "Limitations",
];

/// Wrap sample context into the final user prompt.
pub fn make_report_prompt(context: &str) -> String {
    let mut prompt = String::with_capacity(context.len() + 512);
    prompt.push_str("Write a clinical genetic report for the following sample.\n\n");
    prompt.push_str(context.trim_end());
    prompt.push_str("\n\nStructure the report with these sections, in this order:\n");
    for (idx, section) in REPORT_SECTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", idx + 1, section));
    }
    prompt.push_str("\nReturn plain text only.");
    prompt
}

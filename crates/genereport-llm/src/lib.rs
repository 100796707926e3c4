//! AI backends for clinical genetic report generation.
//!
//! This crate provides the [`ReportGenerator`] seam used by the report
//! orchestrator, an OpenAI-compatible blocking HTTP backend, and the fixed
//! prompt instructions wrapped around each sample's context.

pub mod generator;
pub mod mock;
pub mod prompts;

pub use generator::*;
pub use mock::*;
pub use prompts::*;

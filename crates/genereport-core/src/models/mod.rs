//! Domain models for the genetic report pipeline.

mod mutation;
mod patient;
mod report;
mod result_file;
mod sample;

pub use mutation::*;
pub use patient::*;
pub use report::*;
pub use result_file::*;
pub use sample::*;

pub mod controller;
pub mod normalizer;

pub use controller::{SubmissionController, SubmissionHandle};
pub use normalizer::{extract_document_source, normalize, normalize_for_target};

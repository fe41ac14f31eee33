pub mod analysis;
pub mod document;
pub mod submission;

pub use analysis::{AnalysisResult, EnhancementDelta, MatchAnalysis, SkillSet};
pub use document::{
    AttemptOutcome, DocumentFormat, DocumentSource, ExportAttempt, TailoredDocument,
};
pub use submission::{ResumeFile, SubmissionRequest, TargetMatch};

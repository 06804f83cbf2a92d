pub mod job;
pub mod loaders;
pub mod score;
pub mod submission;

pub use job::{Job, JobId, JobSnapshot, JobState, JobStatus};
pub use loaders::load_dataset;
pub use score::{EvaluationOutcome, ScoreMap, ScoreRecord};
pub use submission::{JobKind, Submission};

//! Detection challenge: a shuffled sequence of framework and human tasks,
//! the verdicts submitted for them, and the resulting score.

mod manager;
mod types;

pub use manager::{FRAMEWORK_STREAK, PayloadManager};
pub use types::{
    AutomationReport, ChallengeTask, HUMAN_FRAMEWORK, HUMAN_IMAGE, SubmittedPayload, TaskStatus,
};

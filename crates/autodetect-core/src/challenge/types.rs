use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FrameworkImage;

/// Framework name reserved for tasks driven by a real person.
pub const HUMAN_FRAMEWORK: &str = "human";

/// Image placeholder for human tasks.
pub const HUMAN_IMAGE: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Created,
    Running,
    Completed,
    Failed,
}

/// One slot of a challenge sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTask {
    pub order_number: usize,
    pub name: String,
    pub image: String,
    pub status: TaskStatus,
}

impl ChallengeTask {
    pub(crate) fn from_framework(order_number: usize, framework: FrameworkImage) -> Self {
        Self {
            order_number,
            name: framework.name,
            image: framework.image,
            status: TaskStatus::Created,
        }
    }

    pub fn is_human(&self) -> bool {
        self.name == HUMAN_FRAMEWORK
    }
}

/// Automation verdict carried in a submitted payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationReport {
    #[serde(default)]
    pub detected: bool,
}

impl From<bool> for AutomationReport {
    fn from(detected: bool) -> Self {
        Self { detected }
    }
}

/// What was submitted for a task, and how it was judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedPayload {
    pub expected_framework: String,
    #[serde(rename = "submitted_framework")]
    pub submitted_frameworks: Vec<String>,
    pub detected: bool,
    pub collided: bool,
    pub automation: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SubmittedPayload {
    pub fn is_human(&self) -> bool {
        self.expected_framework == HUMAN_FRAMEWORK
    }
}

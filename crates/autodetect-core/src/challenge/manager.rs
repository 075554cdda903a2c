use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::types::{
    AutomationReport, ChallengeTask, HUMAN_FRAMEWORK, HUMAN_IMAGE, SubmittedPayload, TaskStatus,
};
use crate::config::{ChallengeConfig, FrameworkImage};
use crate::error::{AutodetectError, Result};

/// Clean detections of one framework needed to earn a point.
pub const FRAMEWORK_STREAK: usize = 3;

/// Points for a detection that also named other frameworks.
const COLLISION_POINTS: f64 = 0.1;

/// Deduction per human task flagged as automation.
const HUMAN_MISS_PENALTY: f64 = 0.1;

#[derive(Debug, Default)]
struct FrameworkTally {
    count: usize,
    invalidated: bool,
}

/// Drives one detection challenge session.
#[derive(Debug)]
pub struct PayloadManager {
    session_id: Uuid,
    config: ChallengeConfig,
    tasks: BTreeMap<usize, ChallengeTask>,
    current_task: Option<usize>,
    submitted_payloads: BTreeMap<usize, SubmittedPayload>,
    expected_order: BTreeMap<usize, String>,
    score: f64,
}

impl PayloadManager {
    pub fn new(config: ChallengeConfig) -> Self {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Build a manager whose sequence is shuffled by `rng`.
    pub fn with_rng<R: Rng + ?Sized>(config: ChallengeConfig, rng: &mut R) -> Self {
        let mut manager = Self {
            session_id: Uuid::now_v7(),
            config,
            tasks: BTreeMap::new(),
            current_task: None,
            submitted_payloads: BTreeMap::new(),
            expected_order: BTreeMap::new(),
            score: 0.0,
        };
        manager.generate_sequence(rng);
        manager
    }

    /// Drop all progress and deal a fresh sequence.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.session_id = Uuid::now_v7();
        self.tasks.clear();
        self.current_task = None;
        self.submitted_payloads.clear();
        self.expected_order.clear();
        self.score = 0.0;

        self.generate_sequence(rng);
    }

    fn generate_sequence<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut sequence: Vec<FrameworkImage> = Vec::with_capacity(
            self.config.framework_images.len() * self.config.repeated_framework_count
                + self.config.human_injection_count,
        );
        for _ in 0..self.config.repeated_framework_count {
            sequence.extend(self.config.framework_images.iter().cloned());
        }
        for _ in 0..self.config.human_injection_count {
            sequence.push(FrameworkImage::new(HUMAN_FRAMEWORK, HUMAN_IMAGE));
        }

        sequence.shuffle(rng);

        for (order_number, framework) in sequence.into_iter().enumerate() {
            self.expected_order
                .insert(order_number, framework.name.clone());
            self.tasks.insert(
                order_number,
                ChallengeTask::from_framework(order_number, framework),
            );
        }
        info!(
            session = %self.session_id,
            tasks = self.tasks.len(),
            "generated challenge sequence"
        );
    }

    /// Record the frameworks and automation verdict submitted for a task.
    pub fn submit_task(
        &mut self,
        framework_names: &[String],
        order_number: usize,
        automation: AutomationReport,
    ) -> Result<()> {
        let Some(expected) = self.expected_order.get(&order_number) else {
            error!(order_number, "failed to add submitted payload: unknown task");
            return Err(AutodetectError::UnknownOrderNumber(order_number));
        };

        let (detected, collided) = if expected == HUMAN_FRAMEWORK {
            (framework_names.is_empty(), !framework_names.is_empty())
        } else {
            (
                framework_names.iter().any(|name| name == expected) && automation.detected,
                framework_names.len() > 1,
            )
        };

        self.submitted_payloads.insert(
            order_number,
            SubmittedPayload {
                expected_framework: expected.clone(),
                submitted_frameworks: framework_names.to_vec(),
                detected,
                collided,
                automation: automation.detected,
                submitted_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Score the submissions so far, store the result, and return it.
    ///
    /// Human tasks are worth one point, less a penalty per task flagged as
    /// automation; too many flags zero the whole score. Each framework earns
    /// a point per [`FRAMEWORK_STREAK`] clean detections until its first
    /// miss. The total is averaged over the frameworks plus the human slot.
    pub fn calculate_score(&mut self) -> f64 {
        let automation_misses = self
            .submitted_payloads
            .values()
            .filter(|submission| submission.is_human() && submission.automation)
            .count();

        if automation_misses > self.config.allowed_automation_miss_count {
            warn!(
                automation_misses,
                allowed = self.config.allowed_automation_miss_count,
                "exceeded allowed automation misses, score is zero"
            );
            self.score = 0.0;
            return self.score;
        }

        let mut total = if automation_misses == 0 {
            info!("human detected correctly, earned 1 point");
            1.0
        } else {
            let points = 1.0 - automation_misses as f64 * HUMAN_MISS_PENALTY;
            info!(automation_misses, points, "human detected with misses");
            points
        };

        let mut tallies: HashMap<&str, FrameworkTally> = self
            .config
            .framework_names()
            .map(|name| (name, FrameworkTally::default()))
            .collect();

        for submission in self.submitted_payloads.values() {
            if submission.is_human() {
                continue;
            }
            let framework = submission.expected_framework.as_str();
            let tally = tallies.entry(framework).or_default();

            if tally.invalidated {
                info!(framework, "framework already invalidated, earned 0 points");
                continue;
            }
            if !submission.detected {
                tally.invalidated = true;
                info!(framework, "framework missed, earned 0 points");
                continue;
            }
            if submission.collided {
                total += COLLISION_POINTS;
                info!(framework, "framework detected with collision, earned 0.1 points");
                continue;
            }
            tally.count += 1;
            info!(framework, "framework detected correctly");
        }

        total += tallies
            .values()
            .map(|tally| (tally.count / FRAMEWORK_STREAK) as f64)
            .sum::<f64>();

        self.score = total / (self.config.framework_images.len() + 1) as f64;
        self.score
    }

    /// Move a task to `status`. Unknown tasks are logged and left alone.
    pub fn update_task_status(&mut self, order_number: usize, status: TaskStatus) -> bool {
        match self.tasks.get_mut(&order_number) {
            Some(task) => {
                task.status = status;
                true
            }
            None => {
                error!(order_number, "couldn't update status of task");
                false
            }
        }
    }

    /// Whether a payload has been submitted for the task.
    pub fn check_task_compliance(&self, order_number: usize) -> bool {
        self.submitted_payloads.contains_key(&order_number)
    }

    pub fn submission_report(&self) -> &BTreeMap<usize, SubmittedPayload> {
        &self.submitted_payloads
    }

    pub fn set_current_task(&mut self, order_number: usize) -> Result<()> {
        if !self.tasks.contains_key(&order_number) {
            return Err(AutodetectError::UnknownOrderNumber(order_number));
        }
        self.current_task = Some(order_number);
        Ok(())
    }

    pub fn current_task(&self) -> Option<&ChallengeTask> {
        self.current_task.and_then(|order| self.tasks.get(&order))
    }

    pub fn tasks(&self) -> impl Iterator<Item = &ChallengeTask> {
        self.tasks.values()
    }

    pub fn task(&self, order_number: usize) -> Option<&ChallengeTask> {
        self.tasks.get(&order_number)
    }

    pub fn expected_framework(&self, order_number: usize) -> Option<&str> {
        self.expected_order.get(&order_number).map(String::as_str)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }
}

pub mod challenge;
pub mod config;
pub mod detector;
pub mod error;

pub use config::{AppConfig, ChallengeConfig, FrameworkImage, LoggingConfig, NstBrowserConfig};
pub use error::{AutodetectError, ExitCode, Result};

pub use challenge::{
    AutomationReport, ChallengeTask, PayloadManager, SubmittedPayload, TaskStatus,
};
pub use detector::{
    DETECTOR_NAME, GlobalScope, HostEnvironment, RecordingEnvironment, StaticEnvironment,
    detect_automation, register,
};

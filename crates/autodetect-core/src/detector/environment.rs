use std::sync::Mutex;

/// `tracing` target used by the default host console.
pub const CONSOLE_TARGET: &str = "autodetect::console";

/// Capabilities the host hands to a detector.
///
/// A browser host would back `user_agent` with `navigator.userAgent` and
/// `console_log` with `console.log`. Native hosts supply their own.
pub trait HostEnvironment: Send + Sync {
    /// The client's identification string. Read-only for detectors.
    fn user_agent(&self) -> &str;

    /// Write one line to the host's diagnostic channel.
    fn console_log(&self, message: &str) {
        tracing::info!(target: CONSOLE_TARGET, "{message}");
    }
}

/// Environment with a fixed user agent, logging through `tracing`.
#[derive(Debug, Clone)]
pub struct StaticEnvironment {
    user_agent: String,
}

impl StaticEnvironment {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl HostEnvironment for StaticEnvironment {
    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Environment that keeps every console line in memory.
#[derive(Debug, Default)]
pub struct RecordingEnvironment {
    user_agent: String,
    lines: Mutex<Vec<String>>,
}

impl RecordingEnvironment {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the lines written so far, oldest first.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl HostEnvironment for RecordingEnvironment {
    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn console_log(&self, message: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(message.to_string());
    }
}

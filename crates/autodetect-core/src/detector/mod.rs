//! Automation detector exposed to hosts as `detect_automation`.
//!
//! The detector is a placeholder: it reports the client's user agent on the
//! host console and never flags automation.

mod environment;
mod scope;

pub use environment::{CONSOLE_TARGET, HostEnvironment, RecordingEnvironment, StaticEnvironment};
pub use scope::{DETECTOR_NAME, DetectorFn, GlobalScope, register};

/// Log the host's user agent and return the verdict, which is always `false`.
pub fn detect_automation(env: &dyn HostEnvironment) -> bool {
    env.console_log(env.user_agent());
    false
}

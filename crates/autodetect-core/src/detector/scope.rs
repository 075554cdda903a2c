use std::collections::BTreeMap;
use std::fmt;

use super::{HostEnvironment, detect_automation};

/// Name the detector is published under.
pub const DETECTOR_NAME: &str = "detect_automation";

/// Signature shared by callables published on a [`GlobalScope`].
pub type DetectorFn = fn(&dyn HostEnvironment) -> bool;

/// Host-provided top-level namespace, the native stand-in for `window`.
#[derive(Clone, Default)]
pub struct GlobalScope {
    entries: BTreeMap<String, DetectorFn>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `detector`, replacing any previous binding.
    pub fn define(&mut self, name: impl Into<String>, detector: DetectorFn) {
        self.entries.insert(name.into(), detector);
    }

    pub fn get(&self, name: &str) -> Option<DetectorFn> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Call the binding `name`, if any.
    pub fn invoke(&self, name: &str, env: &dyn HostEnvironment) -> Option<bool> {
        self.get(name).map(|detector| detector(env))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Publish [`detect_automation`] on the host scope when there is one.
///
/// Returns `true` if a binding was made. Without a scope this does nothing.
pub fn register(scope: Option<&mut GlobalScope>) -> bool {
    let Some(scope) = scope else {
        tracing::debug!("no global scope, skipping {DETECTOR_NAME} registration");
        return false;
    };
    scope.define(DETECTOR_NAME, detect_automation);
    true
}

//! Default constraint values applied to new task nodes.
//!
//! A process-wide [`Defaults`] is read from the environment on first use and
//! can be replaced with [`set_global_defaults`]. Builders accept an explicit
//! `Defaults` when a node should not depend on global state.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::core::sync_impl::NodeValue;

/// Metadata key naming the backend a node should run on.
pub const EXECUTOR: &str = "executor";

/// Environment variable read for the default executor.
pub const EXECUTOR_ENV: &str = "LEPTON_DEFAULT_EXECUTOR";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    constraints: HashMap<String, NodeValue>,
}

impl Defaults {
    /// No defaults at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults taken from the process environment.
    pub fn from_env() -> Self {
        Self::from_executor_var(std::env::var(EXECUTOR_ENV).ok())
    }

    fn from_executor_var(executor: Option<String>) -> Self {
        match executor.filter(|e| !e.trim().is_empty()) {
            Some(executor) => Self::new().with_executor(executor.trim()),
            None => Self::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<NodeValue>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    pub fn with_executor(self, executor: impl Into<String>) -> Self {
        self.with(EXECUTOR, executor.into())
    }

    pub fn get(&self, key: &str) -> Option<&NodeValue> {
        self.constraints.get(key)
    }

    pub fn executor(&self) -> Option<&NodeValue> {
        self.get(EXECUTOR)
    }

    pub fn constraints(&self) -> &HashMap<String, NodeValue> {
        &self.constraints
    }
}

fn global() -> &'static RwLock<Defaults> {
    static GLOBAL: OnceLock<RwLock<Defaults>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Defaults::from_env()))
}

/// A snapshot of the process-wide defaults.
pub fn global_defaults() -> Defaults {
    global()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replaces the process-wide defaults.
pub fn set_global_defaults(defaults: Defaults) {
    *global()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = defaults;
}

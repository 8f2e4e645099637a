use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::error::LeptonError;
use crate::core::sync_impl::NodeValue;

/// Keyword arguments passed to a task call.
pub type Kwargs = HashMap<String, NodeValue>;

pub(crate) type TaskBody =
    Arc<dyn Fn(Vec<NodeValue>, Kwargs) -> Result<NodeValue, LeptonError> + Send + Sync>;

/// Introspection metadata carried by every wrapped task.
///
/// Graph tooling reads these fields to label nodes, so their formats are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskIdentity {
    /// `"<language>_wrapper"`
    pub code_name: String,
    /// The wrapped function's name
    pub name: String,
    /// `"Lepton.<library>.<function>"`
    pub qualname: String,
    /// `"<owning module>.<library>"`
    pub module: String,
    pub doc: String,
}

/// The callable produced by wrapping a foreign function.
///
/// Each call resolves the foreign function again and invokes it with the
/// given arguments. Cloning is cheap; clones share the same body.
#[derive(Clone)]
pub struct TaskFunction {
    identity: TaskIdentity,
    body: TaskBody,
}

impl TaskFunction {
    pub(crate) fn new(identity: TaskIdentity, body: TaskBody) -> Self {
        Self { identity, body }
    }

    /// Resolves and invokes the foreign function.
    pub fn call(&self, args: Vec<NodeValue>, kwargs: Kwargs) -> Result<NodeValue, LeptonError> {
        (self.body)(args, kwargs)
    }

    /// Shorthand for a call without keyword arguments.
    pub fn call_positional(&self, args: Vec<NodeValue>) -> Result<NodeValue, LeptonError> {
        self.call(args, Kwargs::new())
    }

    /// Runs the call on tokio's blocking pool so foreign code does not stall
    /// the async runtime.
    pub async fn call_async(
        &self,
        args: Vec<NodeValue>,
        kwargs: Kwargs,
    ) -> Result<NodeValue, LeptonError> {
        let body = Arc::clone(&self.body);
        tokio::task::spawn_blocking(move || body(args, kwargs))
            .await
            .map_err(|e| LeptonError::ForeignCall(format!("task did not complete: {}", e)))?
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    pub fn code_name(&self) -> &str {
        &self.identity.code_name
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn qualname(&self) -> &str {
        &self.identity.qualname
    }

    pub fn module(&self) -> &str {
        &self.identity.module
    }

    pub fn doc(&self) -> &str {
        &self.identity.doc
    }
}

impl fmt::Debug for TaskFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFunction")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

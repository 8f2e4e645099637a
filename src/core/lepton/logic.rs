//! Node bodies that run a wrapped foreign function.
//!
//! Both variants read the call from node params:
//! `args` (array) and `kwargs` (object); either may be absent or null. A param
//! of any other shape fails the call without invoking the function. On success the
//! result lands in shared state under the function's name and the node returns
//! `"default"`; on failure the message lands under `"<name>_error"` and the
//! node returns `"error"`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use super::error::LeptonError;
use super::task::{Kwargs, TaskFunction};
use crate::core::async_impl::async_node::AsyncNodeLogic;
use crate::core::sync_impl::NodeValue;
use crate::core::sync_impl::node::NodeLogic;

pub const ARGS_PARAM: &str = "args";
pub const KWARGS_PARAM: &str = "kwargs";
pub const ERROR_ACTION: &str = "error";

#[derive(Clone, Debug)]
pub struct LeptonLogic {
    task: TaskFunction,
}

impl LeptonLogic {
    pub fn new(task: TaskFunction) -> Self {
        Self { task }
    }

    pub fn task(&self) -> &TaskFunction {
        &self.task
    }
}

impl NodeLogic for LeptonLogic {
    fn prep(
        &self,
        params: &HashMap<String, NodeValue>,
        _shared: &HashMap<String, NodeValue>,
    ) -> NodeValue {
        call_input(params)
    }

    fn exec(&self, input: NodeValue) -> NodeValue {
        let result = split_input(input).and_then(|(args, kwargs)| self.task.call(args, kwargs));
        outcome(&self.task, result)
    }

    fn post(
        &self,
        shared: &mut HashMap<String, NodeValue>,
        _prep_res: NodeValue,
        exec_res: NodeValue,
    ) -> Option<String> {
        store_outcome(&self.task, shared, exec_res)
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}

/// Async variant; the foreign call runs on tokio's blocking pool.
#[derive(Clone, Debug)]
pub struct AsyncLeptonLogic {
    task: TaskFunction,
}

impl AsyncLeptonLogic {
    pub fn new(task: TaskFunction) -> Self {
        Self { task }
    }
}

#[async_trait]
impl AsyncNodeLogic for AsyncLeptonLogic {
    fn clone_box(&self) -> Box<dyn AsyncNodeLogic> {
        Box::new(self.clone())
    }

    async fn prep(
        &self,
        params: &HashMap<String, NodeValue>,
        _shared: &HashMap<String, NodeValue>,
    ) -> NodeValue {
        call_input(params)
    }

    async fn exec(&self, input: NodeValue) -> NodeValue {
        let result = match split_input(input) {
            Ok((args, kwargs)) => self.task.call_async(args, kwargs).await,
            Err(e) => Err(e),
        };
        outcome(&self.task, result)
    }

    async fn post(
        &self,
        shared: &mut HashMap<String, NodeValue>,
        _prep_res: NodeValue,
        exec_res: NodeValue,
    ) -> Option<String> {
        store_outcome(&self.task, shared, exec_res)
    }
}

fn call_input(params: &HashMap<String, NodeValue>) -> NodeValue {
    json!({
        ARGS_PARAM: params.get(ARGS_PARAM).cloned().unwrap_or_else(|| json!([])),
        KWARGS_PARAM: params.get(KWARGS_PARAM).cloned().unwrap_or_else(|| json!({})),
    })
}

fn split_input(input: NodeValue) -> Result<(Vec<NodeValue>, Kwargs), LeptonError> {
    let args = match input.get(ARGS_PARAM) {
        Some(NodeValue::Array(items)) => items.clone(),
        Some(NodeValue::Null) | None => Vec::new(),
        Some(other) => return Err(invalid_param(ARGS_PARAM, "an array", other)),
    };
    let kwargs: Kwargs = match input.get(KWARGS_PARAM) {
        Some(NodeValue::Object(obj)) => {
            obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }
        Some(NodeValue::Null) | None => Kwargs::new(),
        Some(other) => return Err(invalid_param(KWARGS_PARAM, "an object", other)),
    };
    Ok((args, kwargs))
}

fn invalid_param(name: &str, expected: &str, got: &NodeValue) -> LeptonError {
    LeptonError::InvalidParam {
        name: name.to_string(),
        expected: expected.to_string(),
        got: got.to_string(),
    }
}

fn outcome(task: &TaskFunction, result: Result<NodeValue, LeptonError>) -> NodeValue {
    match result {
        Ok(value) => json!({ "ok": value }),
        Err(e) => {
            log::error!("Lepton task '{}' failed: {}", task.qualname(), e);
            json!({ "error": e.to_string() })
        }
    }
}

fn store_outcome(
    task: &TaskFunction,
    shared: &mut HashMap<String, NodeValue>,
    exec_res: NodeValue,
) -> Option<String> {
    if let Some(value) = exec_res.get("ok") {
        shared.insert(task.name().to_string(), value.clone());
        return Some("default".to_string());
    }
    let message = exec_res
        .get("error")
        .cloned()
        .unwrap_or_else(|| json!("malformed task result"));
    shared.insert(format!("{}_error", task.name()), message);
    Some(ERROR_ACTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_input_defaults() {
        let input = call_input(&HashMap::new());
        assert_eq!(input, json!({ "args": [], "kwargs": {} }));
    }

    #[test]
    fn test_split_input_accepts_null_params() {
        let (args, kwargs) = split_input(json!({ "args": null, "kwargs": null })).unwrap();
        assert!(args.is_empty());
        assert!(kwargs.is_empty());
    }

    #[test]
    fn test_split_input_rejects_scalar_args() {
        let err = split_input(json!({ "args": 5, "kwargs": {} })).unwrap_err();
        assert!(matches!(err, LeptonError::InvalidParam { ref name, .. } if name == "args"));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_split_input_rejects_non_object_kwargs() {
        let err = split_input(json!({ "args": [], "kwargs": [["k", 1]] })).unwrap_err();
        assert!(matches!(err, LeptonError::InvalidParam { ref name, .. } if name == "kwargs"));
    }
}

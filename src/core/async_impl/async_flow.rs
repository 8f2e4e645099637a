use crate::core::Executable;
use crate::core::async_impl::async_node::{AsyncNode, AsyncNodeLogic};
use crate::core::sync_impl::NodeValue;
use async_trait::async_trait;
use std::collections::HashMap;

/// Orchestration logic of an [`AsyncFlow`]: walk successors from `start`,
/// running sync nodes on the blocking pool and awaiting async ones.
#[derive(Clone)]
pub struct AsyncFlowLogic {
    start: Executable,
}

/// An async node whose logic runs other nodes.
///
/// Unlike [`Flow`](crate::core::sync_impl::flow::Flow), successors may be
/// either [`Executable::Sync`] or [`Executable::Async`], so nodes produced by
/// [`Lepton::into_async`](crate::core::lepton::Lepton::into_async) can be
/// chained into a graph.
#[derive(Clone)]
pub struct AsyncFlow(AsyncNode);

impl std::ops::Deref for AsyncFlow {
    type Target = AsyncNode;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for AsyncFlow {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsyncFlow {
    pub fn new(start: Executable) -> AsyncFlow {
        AsyncFlow(AsyncNode::new(AsyncFlowLogic { start }))
    }

    /// Replaces the start node.
    pub fn start(&mut self, start: Executable) {
        let behaviour: &mut dyn AsyncNodeLogic = &mut *self.0.behaviour;
        match behaviour.as_any_mut().downcast_mut::<AsyncFlowLogic>() {
            Some(flow_logic) => flow_logic.start = start,
            None => {
                log::error!("AsyncFlow's logic is not of type AsyncFlowLogic; start node unchanged")
            }
        }
    }
}

#[async_trait]
impl AsyncNodeLogic for AsyncFlowLogic {
    fn clone_box(&self) -> Box<dyn AsyncNodeLogic> {
        Box::new(self.clone())
    }

    async fn prep(
        &self,
        params: &HashMap<String, NodeValue>,
        shared: &HashMap<String, NodeValue>,
    ) -> NodeValue {
        NodeValue::Array(vec![to_object(params), to_object(shared)])
    }

    async fn exec(&self, input: NodeValue) -> NodeValue {
        let (params, mut shared) = match input.as_array().map(Vec::as_slice) {
            Some([params, shared]) => (from_object(params), from_object(shared)),
            _ => {
                log::error!("AsyncFlow received malformed prep result; running with empty state.");
                (HashMap::new(), HashMap::new())
            }
        };

        let mut current = Some(self.start.clone());
        let mut last_action = String::from("default");

        while let Some(curr) = current {
            let successors = curr.successors().clone();
            last_action = match curr {
                Executable::Sync(mut sync_node) => {
                    if !params.is_empty() {
                        sync_node.set_params(params.clone());
                    }
                    let mut shared_clone = shared.clone();
                    match tokio::task::spawn_blocking(move || {
                        let action = sync_node.run(&mut shared_clone);
                        (action, shared_clone)
                    })
                    .await
                    {
                        Ok((action, modified_shared)) => {
                            shared = modified_shared;
                            action.unwrap_or_else(|| "default".into())
                        }
                        Err(join_error) => {
                            log::error!("A synchronous node panicked: {:?}", join_error);
                            "default".into()
                        }
                    }
                }
                Executable::Async(mut async_node) => {
                    if !params.is_empty() {
                        async_node.set_params(params.clone());
                    }
                    async_node
                        .run(&mut shared)
                        .await
                        .unwrap_or_else(|| "default".into())
                }
            };
            current = successors.get(&last_action).cloned();
        }

        NodeValue::Array(vec![NodeValue::String(last_action), to_object(&shared)])
    }

    async fn post(
        &self,
        shared: &mut HashMap<String, NodeValue>,
        _prep_res: NodeValue,
        exec_res: NodeValue,
    ) -> Option<String> {
        match exec_res.as_array().map(Vec::as_slice) {
            Some([NodeValue::String(last_action), shared_post]) => {
                *shared = from_object(shared_post);
                Some(last_action.clone())
            }
            _ => {
                log::error!("AsyncFlow produced malformed exec result; shared state unchanged.");
                Some("default".into())
            }
        }
    }
}

fn to_object(map: &HashMap<String, NodeValue>) -> NodeValue {
    NodeValue::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn from_object(value: &NodeValue) -> HashMap<String, NodeValue> {
    value
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

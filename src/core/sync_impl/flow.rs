use crate::core::Executable;
use crate::core::sync_impl::NodeValue;
use crate::core::sync_impl::node::{Node, NodeLogic};
use std::collections::HashMap;

/// The orchestration logic of a [`Flow`]: walk successors from `start`
/// until a node returns an action with no successor. Async successors end the
/// walk; graphs containing them run under
/// [`AsyncFlow`](crate::core::async_impl::async_flow::AsyncFlow).
#[derive(Clone)]
pub struct FlowLogic {
    start: Node,
}

/// A flow is just a Node whose logic runs other nodes.
#[derive(Clone)]
pub struct Flow(Node);

impl std::ops::Deref for Flow {
    type Target = Node;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for Flow {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Flow {
    pub fn new(start: Node) -> Flow {
        Flow(Node::new(FlowLogic { start }))
    }

    /// Replaces the start node.
    pub fn start(&mut self, start: Node) {
        // Go through the trait object so `as_any_mut` sees the logic, not the Box
        let behaviour: &mut dyn NodeLogic = &mut *self.0.behaviour;
        match behaviour.as_any_mut().downcast_mut::<FlowLogic>() {
            Some(flow_logic) => flow_logic.start = start,
            None => log::error!("Flow's logic is not of type FlowLogic; start node unchanged"),
        }
    }
}

impl NodeLogic for FlowLogic {
    fn prep(
        &self,
        params: &HashMap<String, NodeValue>,
        shared: &HashMap<String, NodeValue>,
    ) -> NodeValue {
        NodeValue::Array(vec![to_object(params), to_object(shared)])
    }

    fn exec(&self, input: NodeValue) -> NodeValue {
        let (params, mut shared) = match input.as_array().map(Vec::as_slice) {
            Some([params, shared]) => (from_object(params), from_object(shared)),
            _ => {
                log::error!("Flow received malformed prep result; running with empty state.");
                (HashMap::new(), HashMap::new())
            }
        };

        let mut current = Some(self.start.clone());
        let mut last_action = String::from("default");

        while let Some(mut curr) = current {
            if !params.is_empty() {
                curr.set_params(params.clone());
            }
            last_action = curr.run(&mut shared).unwrap_or_else(|| "default".into());
            current = match curr.data.successors.get(&last_action).cloned() {
                Some(Executable::Sync(next)) => Some(next),
                Some(Executable::Async(_)) => {
                    log::warn!(
                        "Flow cannot run AsyncNode successor for action '{}'; stopping. \
                         Run graphs with async nodes under AsyncFlow.",
                        last_action
                    );
                    None
                }
                None => None,
            };
        }

        NodeValue::Array(vec![NodeValue::String(last_action), to_object(&shared)])
    }

    fn post(
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
                log::error!("Flow produced malformed exec result; shared state unchanged.");
                Some("default".into())
            }
        }
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct SimpleLogic {
        id: String,
        next_action: Option<String>,
    }

    impl NodeLogic for SimpleLogic {
        fn prep(
            &self,
            _params: &HashMap<String, NodeValue>,
            _shared: &HashMap<String, NodeValue>,
        ) -> NodeValue {
            json!(self.id.clone())
        }

        fn exec(&self, input: NodeValue) -> NodeValue {
            input
        }

        fn post(
            &self,
            shared: &mut HashMap<String, NodeValue>,
            prep_res: NodeValue,
            _exec_res: NodeValue,
        ) -> Option<String> {
            let id = prep_res.as_str().unwrap_or("unknown");
            shared.insert(format!("visited_{}", id), json!(true));
            self.next_action.clone()
        }

        fn clone_box(&self) -> Box<dyn NodeLogic> {
            Box::new(self.clone())
        }
    }

    fn simple(id: &str, next_action: Option<&str>) -> Node {
        Node::new(SimpleLogic {
            id: id.to_string(),
            next_action: next_action.map(str::to_string),
        })
    }

    #[test]
    fn test_flow_single_node() {
        let flow = Flow::new(simple("single", None));
        let mut shared = HashMap::new();

        let action = flow.run(&mut shared);

        assert_eq!(shared.get("visited_single"), Some(&json!(true)));
        assert_eq!(action, Some("default".to_string()));
    }

    #[test]
    fn test_flow_chain() {
        let node2 = simple("node2", Some("default")).next(Executable::Sync(simple("node3", None)));
        let node1 = simple("node1", Some("default")).next(Executable::Sync(node2));

        let flow = Flow::new(node1);
        let mut shared = HashMap::new();
        flow.run(&mut shared);

        for id in ["node1", "node2", "node3"] {
            assert_eq!(shared.get(&format!("visited_{}", id)), Some(&json!(true)));
        }
    }

    #[test]
    fn test_flow_branching_on_action() {
        let node1 = simple("node1", Some("error"))
            .next_on("default", Executable::Sync(simple("ok", None)))
            .next_on("error", Executable::Sync(simple("failed", None)));

        let flow = Flow::new(node1);
        let mut shared = HashMap::new();
        flow.run(&mut shared);

        assert_eq!(shared.get("visited_failed"), Some(&json!(true)));
        assert!(shared.get("visited_ok").is_none());
    }

    #[test]
    fn test_flow_stops_at_async_successor() {
        use crate::core::async_impl::async_node::{AsyncNode, AsyncNodeLogic};
        use async_trait::async_trait;

        #[derive(Clone)]
        struct AsyncNoop;

        #[async_trait]
        impl AsyncNodeLogic for AsyncNoop {
            fn clone_box(&self) -> Box<dyn AsyncNodeLogic> {
                Box::new(self.clone())
            }

            async fn prep(
                &self,
                _params: &HashMap<String, NodeValue>,
                _shared: &HashMap<String, NodeValue>,
            ) -> NodeValue {
                NodeValue::Null
            }

            async fn exec(&self, _input: NodeValue) -> NodeValue {
                NodeValue::Null
            }

            async fn post(
                &self,
                _shared: &mut HashMap<String, NodeValue>,
                _prep_res: NodeValue,
                _exec_res: NodeValue,
            ) -> Option<String> {
                None
            }
        }

        let node =
            simple("first", Some("default")).next(Executable::Async(AsyncNode::new(AsyncNoop)));
        let flow = Flow::new(node);
        let mut shared = HashMap::new();

        let action = flow.run(&mut shared);
        assert_eq!(shared.get("visited_first"), Some(&json!(true)));
        assert_eq!(action, Some("default".to_string()));
    }

    #[test]
    fn test_flow_start_replaces_start_node() {
        let mut flow = Flow::new(simple("a", None));
        flow.start(simple("b", None));
        let mut shared = HashMap::new();
        flow.run(&mut shared);
        assert!(shared.get("visited_a").is_none());
        assert_eq!(shared.get("visited_b"), Some(&json!(true)));
    }
}

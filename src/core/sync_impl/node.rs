use crate::core::Executable;
use crate::core::sync_impl::AsAny;
use crate::core::sync_impl::NodeValue;
use std::collections::HashMap;

/// A task node in a workflow graph.
pub struct Node {
    /// Internal node data including parameters, metadata and successors
    pub data: NodeCore,
    /// The logic implementation that is the node's executable body
    pub behaviour: Box<dyn NodeLogic>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            behaviour: self.behaviour.clone_box(),
        }
    }
}

impl Node {
    /// Creates a new node with the given logic as its body.
    pub fn new<L: NodeLogic + 'static>(behaviour: L) -> Self {
        Node {
            data: NodeCore::default(),
            behaviour: Box::new(behaviour),
        }
    }

    /// Sets the node's parameters.
    pub fn set_params(&mut self, params: HashMap<String, NodeValue>) {
        self.data.params = params;
    }

    /// Sets a metadata entry (execution backend, resource hints, ...).
    pub fn set_metadata(&mut self, key: &str, value: impl Into<NodeValue>) {
        self.data.metadata.insert(key.to_string(), value.into());
    }

    /// Reads a metadata entry.
    pub fn metadata(&self, key: &str) -> Option<&NodeValue> {
        self.data.metadata.get(key)
    }

    /// Chains another node to execute after this node via the "default" action.
    pub fn next(self, node: Executable) -> Self {
        self.next_on("default", node)
    }

    /// Chains another node to execute after this node when the specified action is returned.
    pub fn next_on(mut self, action: &str, node: Executable) -> Self {
        if self.data.successors.contains_key(action) {
            log::warn!(
                "Warning: Action {} was found in successors, Overwriting key {}.",
                &action,
                &action
            );
        }
        self.data.successors.insert(action.to_string(), node);
        self
    }

    /// Executes the node with its current parameters.
    pub fn run(&self, shared: &mut HashMap<String, NodeValue>) -> Option<String> {
        self.run_with_params(shared, &self.data.params)
    }

    /// Executes the node with the given parameters, ignoring stored parameters.
    pub fn run_with_params(
        &self,
        shared: &mut HashMap<String, NodeValue>,
        param: &HashMap<String, NodeValue>,
    ) -> Option<String> {
        let p = self.behaviour.prep(param, shared);
        let e = self.behaviour.exec(p.clone());
        self.behaviour.post(shared, p, e)
    }
}

/// Internal data structure for a node.
#[derive(Default, Clone)]
pub struct NodeCore {
    /// Parameters specific to this node instance
    pub params: HashMap<String, NodeValue>,
    /// Configuration read by whatever executes the node, not by its logic
    pub metadata: HashMap<String, NodeValue>,
    /// Mapping from action strings to successor nodes
    pub successors: HashMap<String, Executable>,
}

/// Defines the behavior of a workflow node.
pub trait NodeLogic: AsAny + Send + Sync + 'static {
    /// Prepare inputs for execution.
    fn prep(
        &self,
        _params: &HashMap<String, NodeValue>,
        _shared: &HashMap<String, NodeValue>,
    ) -> NodeValue {
        NodeValue::default()
    }

    /// Execute the core logic of the node.
    fn exec(&self, _input: NodeValue) -> NodeValue {
        NodeValue::default()
    }

    /// Post-process results and update shared state.
    fn post(
        &self,
        _shared: &mut HashMap<String, NodeValue>,
        _prep_res: NodeValue,
        _exec_res: NodeValue,
    ) -> Option<String> {
        None
    }

    /// Create a boxed clone of this trait object.
    fn clone_box(&self) -> Box<dyn NodeLogic>;
}

impl Clone for Box<dyn NodeLogic> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

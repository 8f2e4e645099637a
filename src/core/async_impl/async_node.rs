use std::collections::HashMap;

use crate::core::Executable;
use crate::core::sync_impl::AsAny;
use crate::core::sync_impl::NodeValue;
use crate::core::sync_impl::node::NodeCore;

use async_trait::async_trait;

/// An asynchronous task node.
///
/// Same three phases as [`Node`](crate::core::sync_impl::node::Node):
/// 1. **Prep**: Prepare inputs from parameters and shared state
/// 2. **Exec**: Execute the core logic
/// 3. **Post**: Update shared state and optionally return the next action
///
/// Foreign-function nodes become `AsyncNode`s through
/// [`Lepton::into_async`](crate::core::lepton::Lepton::into_async), which runs
/// the foreign call on tokio's blocking pool.
pub struct AsyncNode {
    /// Internal node data including parameters, metadata and successors
    pub data: NodeCore,
    /// The async logic implementation that is the node's executable body
    pub behaviour: Box<dyn AsyncNodeLogic>,
}

impl Clone for AsyncNode {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            behaviour: self.behaviour.clone_box(),
        }
    }
}

impl AsyncNode {
    /// Creates a new async node with the given logic.
    pub fn new<L: AsyncNodeLogic>(behaviour: L) -> Self {
        AsyncNode {
            data: NodeCore::default(),
            behaviour: Box::new(behaviour),
        }
    }

    /// Creates an async node that keeps existing node data.
    pub fn with_data<L: AsyncNodeLogic>(data: NodeCore, behaviour: L) -> Self {
        AsyncNode {
            data,
            behaviour: Box::new(behaviour),
        }
    }

    /// Sets the node's parameters.
    pub fn set_params(&mut self, params: HashMap<String, NodeValue>) {
        self.data.params = params;
    }

    /// Sets a metadata entry.
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
    ///
    /// An existing successor for the same action is overwritten with a warning logged.
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
    ///
    /// # Returns
    /// The action returned by [`post`](AsyncNodeLogic::post), or `None` if the
    /// workflow should terminate
    pub async fn run(&self, shared: &mut HashMap<String, NodeValue>) -> Option<String> {
        self.run_with_params(shared, &self.data.params).await
    }

    /// Executes the node with the given parameters, ignoring stored parameters.
    pub async fn run_with_params(
        &self,
        shared: &mut HashMap<String, NodeValue>,
        param: &HashMap<String, NodeValue>,
    ) -> Option<String> {
        let p = self.behaviour.prep(param, shared).await;
        let e = self.behaviour.exec(p.clone()).await;
        self.behaviour.post(shared, p, e).await
    }
}

/// Defines the asynchronous behavior of a workflow node.
///
/// See [`NodeLogic`](crate::core::sync_impl::node::NodeLogic) for the synchronous version.
#[async_trait]
pub trait AsyncNodeLogic: AsAny + Send + Sync + 'static {
    /// Create a boxed clone of this trait object.
    fn clone_box(&self) -> Box<dyn AsyncNodeLogic>;

    /// Prepare inputs for execution from node parameters and shared state.
    async fn prep(
        &self,
        _params: &HashMap<String, NodeValue>,
        _shared: &HashMap<String, NodeValue>,
    ) -> NodeValue;

    /// Execute the core logic of the node.
    async fn exec(&self, _input: NodeValue) -> NodeValue;

    /// Post-process results and update shared state.
    ///
    /// # Returns
    /// * `Some(action)` - Execute the successor mapped to this action
    /// * `None` - Terminate the workflow
    async fn post(
        &self,
        _shared: &mut HashMap<String, NodeValue>,
        _prep_res: NodeValue,
        _exec_res: NodeValue,
    ) -> Option<String>;
}

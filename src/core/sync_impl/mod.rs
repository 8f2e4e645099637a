//! Synchronous task-node core.
//!
//! - [`Node`](node::Node) and [`NodeLogic`](node::NodeLogic) for defining individual tasks
//! - [`Flow`](flow::Flow) for running a graph of nodes
//! - [`NodeValue`] type alias for JSON values used in params, metadata and shared state

pub mod flow;
pub mod node;

/// Every value crossing a node boundary is JSON
pub type NodeValue = serde_json::Value;

use std::any::Any;

/// A helper trait that just provides the `as_any` method.
/// Needed for downcasting node logic back to its concrete type (e.g. `FlowLogic`).
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! Asynchronous task nodes.
//!
//! [`AsyncNode`](async_node::AsyncNode) and [`AsyncNodeLogic`](async_node::AsyncNodeLogic)
//! mirror the synchronous node for use inside a tokio runtime.
//! [`AsyncFlow`](async_flow::AsyncFlow) runs graphs that mix sync and async nodes.

pub mod async_flow;
pub mod async_node;

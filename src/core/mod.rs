pub mod async_impl;
pub mod defaults;
pub mod lepton;
pub mod sync_impl;

use async_impl::async_node::AsyncNode;
use std::collections::HashMap;
use sync_impl::node::{Node, NodeCore};

/// Anything that can sit in a workflow graph.
#[derive(Clone)]
pub enum Executable {
    Sync(Node),
    Async(AsyncNode),
}

impl Executable {
    pub fn data(&self) -> &NodeCore {
        match self {
            Executable::Sync(node) => &node.data,
            Executable::Async(node) => &node.data,
        }
    }

    pub fn successors(&self) -> &HashMap<String, Executable> {
        &self.data().successors
    }

    pub fn metadata(&self, key: &str) -> Option<&sync_impl::NodeValue> {
        self.data().metadata.get(key)
    }
}

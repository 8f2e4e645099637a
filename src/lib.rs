//! # Lepton
//!
//! Foreign-function task nodes for workflow graphs.
//!
//! A [`Lepton`] wraps a function defined outside Rust, either a Python module
//! function or a symbol exported by a native shared library, as the body of
//! a task [`Node`]. The function is resolved lazily on every call, so the
//! node can be built long before the module or library is available.
//!
//! ## Features
//!
//! - **Python functions**: imported through an embedded interpreter (feature `python`)
//! - **Native symbols**: loaded with the platform dynamic linker, with typed
//!   INPUT / OUTPUT / INPUT_OUTPUT argument marshaling
//! - **Task-node core**: sync [`Node`]s, async [`AsyncNode`]s, and [`Flow`] / [`AsyncFlow`]
//!   to run them in
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lepton::prelude::*;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! let mut node = Lepton::new("python", "stats.py", "mean", vec![])?;
//! node.set_params(HashMap::from([("args".to_string(), json!([[1, 2, 3]]))]));
//!
//! let flow = Flow::new(node.into_node());
//! let mut state = HashMap::new();
//! flow.run(&mut state);
//! assert_eq!(state.get("mean"), Some(&json!(2.0)));
//! # Ok::<(), LeptonError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`prelude`]: Commonly used types (import with `use lepton::prelude::*`)
//! - [`native`]: Shared-library loading seam
//! - [`python`]: Python module importing seam
//! - [`defaults`]: Default constraint values applied to new nodes

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports
// ============================================================================

// Task-node core
pub use crate::core::Executable;
pub use crate::core::async_impl::async_flow::{AsyncFlow, AsyncFlowLogic};
pub use crate::core::async_impl::async_node::{AsyncNode, AsyncNodeLogic};
pub use crate::core::sync_impl::NodeValue;
pub use crate::core::sync_impl::flow::{Flow, FlowLogic};
pub use crate::core::sync_impl::node::{Node, NodeCore, NodeLogic};

// Foreign-function adapter
pub use crate::core::lepton::argtypes::{ArgType, Direction, NativeRepr, NativeType};
pub use crate::core::lepton::error::LeptonError;
pub use crate::core::lepton::language::Language;
pub use crate::core::lepton::logic::{AsyncLeptonLogic, LeptonLogic};
pub use crate::core::lepton::task::{Kwargs, TaskFunction, TaskIdentity};
pub use crate::core::lepton::{
    ARGTYPES_METADATA, Lepton, LeptonBuilder, LeptonDescriptor, TASK_METADATA,
};

/// Host seams for the native call path.
pub mod native {
    pub use crate::core::lepton::native::{DlopenLoader, NativeLibrary, NativeLoader, NativeSymbol};
}

/// Host seams for the Python call path.
pub mod python {
    #[cfg(feature = "python")]
    pub use crate::core::lepton::python::PythonImporter;
    pub use crate::core::lepton::python::{
        ForeignModule, ModuleImporter, UnavailableImporter, default_importer, module_name,
    };
}

/// Default constraint values applied to new nodes.
pub mod defaults {
    pub use crate::core::defaults::{
        Defaults, EXECUTOR, EXECUTOR_ENV, global_defaults, set_global_defaults,
    };
}

// ============================================================================
// Prelude
// ============================================================================

/// Everything needed to declare and run foreign-function nodes.
///
/// # Example
/// ```rust
/// use lepton::prelude::*;
/// ```
pub mod prelude {
    pub use super::defaults::Defaults;
    pub use super::{
        ArgType, AsyncFlow, AsyncNode, AsyncNodeLogic, Direction, Executable, Flow, Kwargs,
        Language, Lepton, LeptonBuilder, LeptonError, NativeType, Node, NodeCore, NodeLogic,
        NodeValue, TaskFunction,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Foreign-function task nodes.
//!
//! A [`Lepton`] wraps a function that lives outside this crate, either a
//! Python module function or an exported symbol of a native shared library,
//! and installs it as the body of a task [`Node`] so it can run inside a
//! workflow graph.
//!
//! Wrapping is two-phase:
//!
//! ```text
//! LeptonDescriptor { language, library, function, argtypes }
//!       │  wrap_task()   bind: parse language, fix identity
//!       ▼
//! TaskFunction
//!       │  call(args, kwargs)   resolve module/library + invoke, every call
//!       ▼
//! NodeValue
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use lepton::prelude::*;
//! use serde_json::json;
//!
//! let lepton = Lepton::builder()
//!     .language("C")
//!     .library("libc.so.6")
//!     .function("labs")
//!     .arg(ArgType::of::<i64>(Lepton::INPUT))
//!     .returns_of::<i64>()
//!     .build()?;
//!
//! let result = lepton.task().call_positional(vec![json!(-5)])?;
//! assert_eq!(result, json!(5));
//! # Ok::<(), LeptonError>(())
//! ```

pub mod argtypes;
pub mod error;
pub mod language;
pub mod logic;
pub mod native;
pub mod python;
pub mod task;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::Executable;
use crate::core::async_impl::async_node::AsyncNode;
use crate::core::defaults::{self, Defaults, EXECUTOR};
use crate::core::sync_impl::NodeValue;
use crate::core::sync_impl::node::Node;

use argtypes::{ArgType, Direction, NativeRepr, NativeType};
use error::LeptonError;
use language::Language;
use logic::{AsyncLeptonLogic, LeptonLogic};
use native::{DlopenLoader, NativeLoader};
use python::ModuleImporter;
use task::{Kwargs, TaskBody, TaskFunction, TaskIdentity};

/// Type name used in task identities.
const ADAPTER_TYPE: &str = "Lepton";

/// Node metadata key holding the serialized [`TaskIdentity`].
pub const TASK_METADATA: &str = "task";
/// Node metadata key holding the serialized argtypes.
pub const ARGTYPES_METADATA: &str = "argtypes";

/// Dotted path of this module; prefixes every task's module string.
fn owning_module() -> String {
    module_path!().replace("::", ".")
}

/// What to wrap: the declared language, library and function, plus the
/// native argument declarations and the loaders used at call time.
#[derive(Clone)]
pub struct LeptonDescriptor {
    /// Language tag as given by the caller (e.g. `"python"`, `"C"`)
    pub language: String,
    /// Python module (with or without `.py`) or shared-library name/path
    pub library_name: String,
    pub function_name: String,
    /// Normalized `(type, direction)` declarations for the native path
    pub argtypes: Vec<ArgType>,
    /// Native return type; `void` unless declared
    pub return_type: NativeType,
    importer: Arc<dyn ModuleImporter>,
    loader: Arc<dyn NativeLoader>,
}

impl fmt::Debug for LeptonDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeptonDescriptor")
            .field("language", &self.language)
            .field("library_name", &self.library_name)
            .field("function_name", &self.function_name)
            .field("argtypes", &self.argtypes)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl LeptonDescriptor {
    pub fn new(
        language: impl Into<String>,
        library_name: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            library_name: library_name.into(),
            function_name: function_name.into(),
            argtypes: Vec::new(),
            return_type: NativeType::Void,
            importer: python::default_importer(),
            loader: Arc::new(DlopenLoader),
        }
    }

    pub fn with_importer(mut self, importer: Arc<dyn ModuleImporter>) -> Self {
        self.importer = importer;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn NativeLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Produces the callable for this descriptor.
    ///
    /// Fails with [`LeptonError::UnsupportedLanguage`] when the language tag is
    /// not a known alias; nothing is resolved until the task is called.
    pub fn wrap_task(&self) -> Result<TaskFunction, LeptonError> {
        let language = Language::parse(&self.language)?;
        let body = match language {
            Language::Python => self.python_wrapper(),
            Language::C => self.c_wrapper(),
        };
        log::debug!(
            "Wrapped {} function '{}' from '{}'",
            language,
            self.function_name,
            self.library_name
        );
        Ok(TaskFunction::new(self.identity(), body))
    }

    fn identity(&self) -> TaskIdentity {
        TaskIdentity {
            code_name: format!("{}_wrapper", self.language),
            name: self.function_name.clone(),
            qualname: format!(
                "{}.{}.{}",
                ADAPTER_TYPE, self.library_name, self.function_name
            ),
            module: format!("{}.{}", owning_module(), self.library_name),
            doc: format!(
                "{} interface for {} function '{}'.",
                ADAPTER_TYPE, self.language, self.function_name
            ),
        }
    }

    fn python_wrapper(&self) -> TaskBody {
        let module_name = python::module_name(&self.library_name).to_string();
        let function_name = self.function_name.clone();
        let importer = Arc::clone(&self.importer);

        Arc::new(move |args: Vec<NodeValue>, kwargs: Kwargs| -> Result<NodeValue, LeptonError> {
            let module = importer.import(&module_name)?;
            log::debug!("Calling python function '{}.{}'", module_name, function_name);
            module.call(&function_name, &args, &kwargs)
        })
    }

    fn c_wrapper(&self) -> TaskBody {
        let library_name = self.library_name.clone();
        let function_name = self.function_name.clone();
        let argtypes = self.argtypes.clone();
        let return_type = self.return_type;
        let loader = Arc::clone(&self.loader);

        Arc::new(move |args: Vec<NodeValue>, kwargs: Kwargs| -> Result<NodeValue, LeptonError> {
            if !kwargs.is_empty() {
                let mut names: Vec<String> = kwargs.into_keys().collect();
                names.sort();
                return Err(LeptonError::KeywordArguments(names));
            }
            let library = loader.load(&library_name)?;
            let symbol = library.symbol(&function_name)?;
            log::debug!("Calling native function '{}' from '{}'", function_name, library_name);
            // Safety: the caller declared argtypes and return type for this
            // symbol, and `library` stays loaded until the call returns.
            unsafe { native::marshal::invoke(symbol, &argtypes, return_type, &args) }
        })
    }
}

/// A task node whose body is a foreign function.
///
/// Derefs to its [`Node`], so it can be parameterized and placed in a
/// [`Flow`](crate::core::sync_impl::flow::Flow) like any other node. Chaining
/// with [`next`](Lepton::next) or [`next_on`](Lepton::next_on) consumes the
/// Lepton and returns the node.
#[derive(Clone)]
pub struct Lepton {
    descriptor: LeptonDescriptor,
    task_id: String,
    task: TaskFunction,
    node: Node,
}

impl Lepton {
    pub const INPUT: Direction = Direction::Input;
    pub const OUTPUT: Direction = Direction::Output;
    pub const INPUT_OUTPUT: Direction = Direction::InputOutput;

    /// Wraps `function_name` from `library_name` with the default loaders and
    /// the process-wide defaults.
    pub fn new(
        language: impl Into<String>,
        library_name: impl Into<String>,
        function_name: impl Into<String>,
        argtypes: Vec<ArgType>,
    ) -> Result<Self, LeptonError> {
        Lepton::builder()
            .language(language)
            .library(library_name)
            .function(function_name)
            .argtypes(argtypes)
            .build()
    }

    pub fn builder() -> LeptonBuilder {
        LeptonBuilder::default()
    }

    /// Wraps the descriptor again, producing a fresh callable.
    pub fn wrap_task(&self) -> Result<TaskFunction, LeptonError> {
        self.descriptor.wrap_task()
    }

    /// The callable installed as this node's body.
    pub fn task(&self) -> &TaskFunction {
        &self.task
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn descriptor(&self) -> &LeptonDescriptor {
        &self.descriptor
    }

    pub fn language(&self) -> &str {
        &self.descriptor.language
    }

    pub fn library_name(&self) -> &str {
        &self.descriptor.library_name
    }

    pub fn function_name(&self) -> &str {
        &self.descriptor.function_name
    }

    pub fn argtypes(&self) -> &[ArgType] {
        &self.descriptor.argtypes
    }

    pub fn return_type(&self) -> NativeType {
        self.descriptor.return_type
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Chains `node` after this one on the "default" action.
    pub fn next(self, node: Executable) -> Node {
        self.node.next(node)
    }

    /// Chains `node` after this one on `action`, e.g. `"error"`.
    pub fn next_on(self, action: &str, node: Executable) -> Node {
        self.node.next_on(action, node)
    }

    /// Converts into an async node that runs the call on tokio's blocking pool.
    pub fn into_async(self) -> AsyncNode {
        AsyncNode::with_data(self.node.data, AsyncLeptonLogic::new(self.task))
    }
}

impl std::ops::Deref for Lepton {
    type Target = Node;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl std::ops::DerefMut for Lepton {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.node
    }
}

impl fmt::Debug for Lepton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lepton")
            .field("task_id", &self.task_id)
            .field("descriptor", &self.descriptor)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Lepton`].
#[derive(Default)]
pub struct LeptonBuilder {
    language: String,
    library_name: String,
    function_name: String,
    argtypes: Vec<ArgType>,
    return_type: Option<NativeType>,
    params: HashMap<String, NodeValue>,
    importer: Option<Arc<dyn ModuleImporter>>,
    loader: Option<Arc<dyn NativeLoader>>,
    defaults: Option<Defaults>,
}

impl LeptonBuilder {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn library(mut self, library_name: impl Into<String>) -> Self {
        self.library_name = library_name.into();
        self
    }

    pub fn function(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = function_name.into();
        self
    }

    pub fn arg(mut self, argtype: ArgType) -> Self {
        self.argtypes.push(argtype);
        self
    }

    pub fn arg_of<T: NativeRepr>(self, direction: Direction) -> Self {
        self.arg(ArgType::of::<T>(direction))
    }

    pub fn argtypes(mut self, argtypes: Vec<ArgType>) -> Self {
        self.argtypes = argtypes;
        self
    }

    pub fn returns(mut self, return_type: NativeType) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn returns_of<T: NativeRepr>(self) -> Self {
        self.returns(T::NATIVE)
    }

    /// Node params forwarded unchanged to the task node.
    pub fn params(mut self, params: HashMap<String, NodeValue>) -> Self {
        self.params = params;
        self
    }

    pub fn importer(mut self, importer: Arc<dyn ModuleImporter>) -> Self {
        self.importer = Some(importer);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn NativeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Uses these defaults instead of the process-wide ones.
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// The descriptor this builder would wrap.
    pub fn descriptor(&self) -> LeptonDescriptor {
        let mut descriptor = LeptonDescriptor::new(
            self.language.clone(),
            self.library_name.clone(),
            self.function_name.clone(),
        );
        descriptor.argtypes = self.argtypes.clone();
        descriptor.return_type = self.return_type.unwrap_or(NativeType::Void);
        if let Some(importer) = &self.importer {
            descriptor.importer = Arc::clone(importer);
        }
        if let Some(loader) = &self.loader {
            descriptor.loader = Arc::clone(loader);
        }
        descriptor
    }

    /// Wraps the task, installs it as the node body, records the task identity
    /// and argtypes as node metadata and applies the default executor, if one
    /// is configured.
    pub fn build(self) -> Result<Lepton, LeptonError> {
        let descriptor = self.descriptor();
        let task = descriptor.wrap_task()?;

        let mut node = Node::new(LeptonLogic::new(task.clone()));
        node.set_params(self.params);
        node.set_metadata(TASK_METADATA, serde_json::to_value(task.identity())?);
        node.set_metadata(ARGTYPES_METADATA, serde_json::to_value(&descriptor.argtypes)?);

        let defaults = self.defaults.unwrap_or_else(defaults::global_defaults);
        if let Some(executor) = defaults.executor() {
            node.set_metadata(EXECUTOR, executor.clone());
        }

        Ok(Lepton {
            descriptor,
            task_id: format!("lepton_{}", uuid::Uuid::new_v4().simple()),
            task,
            node,
        })
    }
}

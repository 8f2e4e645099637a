//! Python module resolution for the Python call path.
//!
//! The adapter only talks to [`ModuleImporter`] and [`ForeignModule`]. With
//! the `python` feature enabled, [`PythonImporter`] embeds an interpreter via
//! pyo3; without it, the default importer reports the language as unavailable.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::LeptonError;
use crate::core::sync_impl::NodeValue;

/// Resolves a module by name.
pub trait ModuleImporter: Send + Sync {
    fn import(&self, module_name: &str) -> Result<Box<dyn ForeignModule>, LeptonError>;
}

/// An imported module whose attributes can be called.
pub trait ForeignModule {
    /// Looks up `function_name` and calls it.
    fn call(
        &self,
        function_name: &str,
        args: &[NodeValue],
        kwargs: &HashMap<String, NodeValue>,
    ) -> Result<NodeValue, LeptonError>;
}

/// Strips a trailing `.py` so `"pkg"` and `"pkg.py"` name the same module.
pub fn module_name(library_name: &str) -> &str {
    library_name.strip_suffix(".py").unwrap_or(library_name)
}

/// The importer used when none is configured on the builder.
pub fn default_importer() -> Arc<dyn ModuleImporter> {
    #[cfg(feature = "python")]
    {
        Arc::new(PythonImporter::default())
    }
    #[cfg(not(feature = "python"))]
    {
        Arc::new(UnavailableImporter)
    }
}

/// Stand-in importer for builds without an embedded interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableImporter;

impl ModuleImporter for UnavailableImporter {
    fn import(&self, _module_name: &str) -> Result<Box<dyn ForeignModule>, LeptonError> {
        Err(LeptonError::LanguageUnavailable(
            "python (enable the `python` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "python")]
pub use embedded::PythonImporter;

#[cfg(feature = "python")]
mod embedded {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use pyo3::exceptions::{PyAttributeError, PyModuleNotFoundError};
    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyLong, PyModule, PyString, PyTuple};
    use serde_json::{Map, Number};

    use super::{ForeignModule, ModuleImporter};
    use crate::core::lepton::error::LeptonError;
    use crate::core::sync_impl::NodeValue;

    /// Imports modules through an embedded CPython interpreter.
    ///
    /// The configured search paths are prepended to `sys.path` before each
    /// import. By default that is the process's working directory.
    #[derive(Debug, Clone)]
    pub struct PythonImporter {
        search_paths: Vec<PathBuf>,
    }

    impl Default for PythonImporter {
        fn default() -> Self {
            Self {
                search_paths: std::env::current_dir().into_iter().collect(),
            }
        }
    }

    impl PythonImporter {
        pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
            Self { search_paths }
        }

        fn extend_sys_path(&self, py: Python<'_>) -> PyResult<()> {
            let sys_path: &PyList = py.import("sys")?.getattr("path")?.downcast()?;
            for dir in self.search_paths.iter().rev() {
                let dir = dir.to_string_lossy();
                if !sys_path.contains(&*dir)? {
                    sys_path.insert(0, &*dir)?;
                }
            }
            Ok(())
        }
    }

    impl ModuleImporter for PythonImporter {
        fn import(&self, module_name: &str) -> Result<Box<dyn ForeignModule>, LeptonError> {
            Python::with_gil(|py| {
                self.extend_sys_path(py).map_err(foreign)?;
                let module = py.import(module_name).map_err(|err| {
                    if err.is_instance_of::<PyModuleNotFoundError>(py) {
                        LeptonError::ModuleNotFound {
                            module: module_name.to_string(),
                            reason: err.to_string(),
                        }
                    } else {
                        foreign(err)
                    }
                })?;
                log::debug!("Imported python module '{}'", module_name);
                Ok(Box::new(PythonModule {
                    name: module_name.to_string(),
                    module: module.into_py(py),
                }) as Box<dyn ForeignModule>)
            })
        }
    }

    struct PythonModule {
        name: String,
        module: Py<PyModule>,
    }

    impl ForeignModule for PythonModule {
        fn call(
            &self,
            function_name: &str,
            args: &[NodeValue],
            kwargs: &HashMap<String, NodeValue>,
        ) -> Result<NodeValue, LeptonError> {
            Python::with_gil(|py| {
                let module = self.module.as_ref(py);
                let function = module.getattr(function_name).map_err(|err| {
                    if err.is_instance_of::<PyAttributeError>(py) {
                        LeptonError::AttributeNotFound {
                            module: self.name.clone(),
                            attribute: function_name.to_string(),
                        }
                    } else {
                        foreign(err)
                    }
                })?;

                let positional = args
                    .iter()
                    .map(|value| to_python(py, value))
                    .collect::<PyResult<Vec<_>>>()
                    .map_err(foreign)?;
                let keywords = PyDict::new(py);
                for (key, value) in kwargs {
                    keywords
                        .set_item(key, to_python(py, value).map_err(foreign)?)
                        .map_err(foreign)?;
                }

                let result = function
                    .call(PyTuple::new(py, positional), Some(keywords))
                    .map_err(foreign)?;
                from_python(result)
            })
        }
    }

    fn foreign(err: PyErr) -> LeptonError {
        LeptonError::ForeignCall(err.to_string())
    }

    fn to_python(py: Python<'_>, value: &NodeValue) -> PyResult<PyObject> {
        Ok(match value {
            NodeValue::Null => py.None(),
            NodeValue::Bool(b) => b.to_object(py),
            NodeValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.to_object(py)
                } else if let Some(u) = n.as_u64() {
                    u.to_object(py)
                } else {
                    n.as_f64().unwrap_or(f64::NAN).to_object(py)
                }
            }
            NodeValue::String(s) => s.to_object(py),
            NodeValue::Array(items) => {
                let list = PyList::empty(py);
                for item in items {
                    list.append(to_python(py, item)?)?;
                }
                list.to_object(py)
            }
            NodeValue::Object(map) => {
                let dict = PyDict::new(py);
                for (key, item) in map {
                    dict.set_item(key, to_python(py, item)?)?;
                }
                dict.to_object(py)
            }
        })
    }

    fn from_python(obj: &PyAny) -> Result<NodeValue, LeptonError> {
        if obj.is_none() {
            return Ok(NodeValue::Null);
        }
        // bool is a subclass of int, so it has to be checked first
        if let Ok(b) = obj.downcast::<PyBool>() {
            return Ok(NodeValue::Bool(b.is_true()));
        }
        if obj.is_instance_of::<PyLong>() {
            if let Ok(i) = obj.extract::<i64>() {
                return Ok(NodeValue::from(i));
            }
            if let Ok(u) = obj.extract::<u64>() {
                return Ok(NodeValue::from(u));
            }
        }
        if obj.is_instance_of::<PyFloat>() {
            let f: f64 = obj.extract().map_err(foreign)?;
            return Ok(Number::from_f64(f).map_or(NodeValue::Null, NodeValue::Number));
        }
        if obj.is_instance_of::<PyString>() {
            return Ok(NodeValue::String(obj.extract().map_err(foreign)?));
        }
        if let Ok(list) = obj.downcast::<PyList>() {
            return list.iter().map(from_python).collect::<Result<_, _>>().map(NodeValue::Array);
        }
        if let Ok(tuple) = obj.downcast::<PyTuple>() {
            return tuple.iter().map(from_python).collect::<Result<_, _>>().map(NodeValue::Array);
        }
        if let Ok(dict) = obj.downcast::<PyDict>() {
            let mut map = Map::new();
            for (key, item) in dict.iter() {
                let key = key.str().map_err(foreign)?.to_string();
                map.insert(key, from_python(item)?);
            }
            return Ok(NodeValue::Object(map));
        }
        // Anything else comes back as its str()
        Ok(NodeValue::String(obj.str().map_err(foreign)?.to_string()))
    }
}

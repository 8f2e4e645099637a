//! Host doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Mutex;

use lepton::native::{NativeLibrary, NativeLoader, NativeSymbol};
use lepton::python::{ForeignModule, ModuleImporter};
use lepton::{LeptonError, NodeValue};

/// Importer that knows a single module, `test_module`, defining
/// `test_func(x, y) -> x + y`.
#[derive(Default)]
pub struct FakeImporter {
    pub imports: Mutex<Vec<String>>,
}

impl ModuleImporter for FakeImporter {
    fn import(&self, module_name: &str) -> Result<Box<dyn ForeignModule>, LeptonError> {
        self.imports.lock().unwrap().push(module_name.to_string());
        if module_name == "test_module" {
            Ok(Box::new(TestModule))
        } else {
            Err(LeptonError::ModuleNotFound {
                module: module_name.to_string(),
                reason: "not on the search path".to_string(),
            })
        }
    }
}

struct TestModule;

impl ForeignModule for TestModule {
    fn call(
        &self,
        function_name: &str,
        args: &[NodeValue],
        kwargs: &HashMap<String, NodeValue>,
    ) -> Result<NodeValue, LeptonError> {
        if function_name != "test_func" {
            return Err(LeptonError::AttributeNotFound {
                module: "test_module".to_string(),
                attribute: function_name.to_string(),
            });
        }
        let x = args.first().or_else(|| kwargs.get("x"));
        let y = args.get(1).or_else(|| kwargs.get("y"));
        match (x.and_then(NodeValue::as_i64), y.and_then(NodeValue::as_i64)) {
            (Some(x), Some(y)) => Ok(NodeValue::from(x + y)),
            _ => Err(LeptonError::ForeignCall(
                "TypeError: test_func() missing required arguments".to_string(),
            )),
        }
    }
}

/// Loader that records every load and serves symbols from a fixed table.
#[derive(Default)]
pub struct FakeLoader {
    pub loads: Mutex<Vec<String>>,
    symbols: HashMap<String, usize>,
}

impl FakeLoader {
    pub fn with_symbol(mut self, name: &str, address: *const c_void) -> Self {
        self.symbols.insert(name.to_string(), address as usize);
        self
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }
}

impl NativeLoader for FakeLoader {
    fn load(&self, library_name: &str) -> Result<Box<dyn NativeLibrary>, LeptonError> {
        self.loads.lock().unwrap().push(library_name.to_string());
        Ok(Box::new(FakeLibrary {
            name: library_name.to_string(),
            symbols: self.symbols.clone(),
        }))
    }
}

struct FakeLibrary {
    name: String,
    symbols: HashMap<String, usize>,
}

impl NativeLibrary for FakeLibrary {
    fn symbol(&self, name: &str) -> Result<NativeSymbol, LeptonError> {
        self.symbols
            .get(name)
            .map(|&address| NativeSymbol::from_ptr(address as *const c_void))
            .ok_or_else(|| LeptonError::SymbolNotFound {
                library: self.name.clone(),
                symbol: name.to_string(),
                reason: "undefined symbol".to_string(),
            })
    }
}

//! Shared-library resolution for the C call path.
//!
//! ```text
//! TaskFunction::call(args)
//!       │
//!       ▼
//! NativeLoader::load(library_name)      (once per call)
//!       │
//!       ▼
//! NativeLibrary::symbol(function_name)
//!       │
//!       ▼
//! marshal::invoke(symbol, argtypes, return_type, args)
//! ```
//!
//! The library handle is dropped when the call returns.

pub(crate) mod marshal;

use std::ffi::c_void;

use libloading::Library;

use super::error::LeptonError;

/// Address of a resolved native function.
///
/// Only valid while the [`NativeLibrary`] it came from is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSymbol(*const c_void);

impl NativeSymbol {
    /// Wraps a raw function address.
    pub fn from_ptr(address: *const c_void) -> Self {
        NativeSymbol(address)
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// A loaded library whose exports can be queried by name.
pub trait NativeLibrary {
    fn symbol(&self, name: &str) -> Result<NativeSymbol, LeptonError>;
}

/// Loads shared libraries by path or name.
pub trait NativeLoader: Send + Sync {
    fn load(&self, library_name: &str) -> Result<Box<dyn NativeLibrary>, LeptonError>;
}

/// Loader backed by the platform dynamic linker.
///
/// The library name is handed to the linker unchanged, so bare names follow
/// the platform search rules and names containing a separator are paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct DlopenLoader;

impl NativeLoader for DlopenLoader {
    fn load(&self, library_name: &str) -> Result<Box<dyn NativeLibrary>, LeptonError> {
        // Safety: loading runs the library's initializers. The caller chose
        // this library when declaring the Lepton.
        let library = unsafe { Library::new(library_name) }.map_err(|e| LeptonError::LibraryLoad {
            library: library_name.to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("Loaded native library '{}'", library_name);
        Ok(Box::new(LoadedLibrary {
            name: library_name.to_string(),
            library,
        }))
    }
}

struct LoadedLibrary {
    name: String,
    library: Library,
}

impl NativeLibrary for LoadedLibrary {
    fn symbol(&self, name: &str) -> Result<NativeSymbol, LeptonError> {
        // Safety: the symbol is read as an untyped address; its signature is
        // applied by the marshaler from the declared argtypes.
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.map_err(|e| {
            LeptonError::SymbolNotFound {
                library: self.name.clone(),
                symbol: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(NativeSymbol(*symbol))
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeptonError {
    #[error("Unsupported language: '{0}'")]
    UnsupportedLanguage(String),

    #[error("Language '{0}' is not available in this build")]
    LanguageUnavailable(String),

    #[error("Keyword arguments are not supported for native calls (got: {})", .0.join(", "))]
    KeywordArguments(Vec<String>),

    #[error("Unsupported native type: '{0}'")]
    UnsupportedType(String),

    #[error("Invalid argument count: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("Invalid value for argument {index} (expected {expected}): {reason}")]
    ArgumentValue {
        index: usize,
        expected: String,
        reason: String,
    },

    #[error("Invalid node param '{name}': expected {expected}, got {got}")]
    InvalidParam {
        name: String,
        expected: String,
        got: String,
    },

    #[error("Failed to serialize task metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Too many native arguments: {0} (max 6)")]
    TooManyArguments(usize),

    #[error("No module named '{module}': {reason}")]
    ModuleNotFound { module: String, reason: String },

    #[error("Module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound { module: String, attribute: String },

    #[error("Failed to load library '{library}': {reason}")]
    LibraryLoad { library: String, reason: String },

    #[error("Symbol '{symbol}' not found in '{library}': {reason}")]
    SymbolNotFound {
        library: String,
        symbol: String,
        reason: String,
    },

    #[error("Foreign call failed: {0}")]
    ForeignCall(String),
}

impl LeptonError {
    /// True for errors caused by how the Lepton was configured or called,
    /// as opposed to failures resolving or running the foreign function.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            LeptonError::UnsupportedLanguage(_)
                | LeptonError::LanguageUnavailable(_)
                | LeptonError::KeywordArguments(_)
                | LeptonError::UnsupportedType(_)
                | LeptonError::ArgumentCount { .. }
                | LeptonError::ArgumentValue { .. }
                | LeptonError::InvalidParam { .. }
                | LeptonError::TooManyArguments(_)
        )
    }

    /// True for module, attribute, library and symbol lookup failures.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            LeptonError::ModuleNotFound { .. }
                | LeptonError::AttributeNotFound { .. }
                | LeptonError::LibraryLoad { .. }
                | LeptonError::SymbolNotFound { .. }
        )
    }
}

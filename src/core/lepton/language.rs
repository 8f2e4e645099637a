use std::fmt;
use std::str::FromStr;

use super::error::LeptonError;

/// Source languages a Lepton can wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// A function defined in a Python module.
    Python,
    /// An exported symbol of a native shared library.
    C,
}

const PYTHON_ALIASES: &[&str] = &["Python", "python"];
const C_ALIASES: &[&str] = &["C", "c"];

impl Language {
    /// The spellings accepted for this language.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Language::Python => PYTHON_ALIASES,
            Language::C => C_ALIASES,
        }
    }

    /// Resolves a language tag against the alias sets.
    pub fn parse(tag: &str) -> Result<Self, LeptonError> {
        [Language::Python, Language::C]
            .into_iter()
            .find(|lang| lang.aliases().contains(&tag))
            .ok_or_else(|| LeptonError::UnsupportedLanguage(tag.to_string()))
    }
}

impl FromStr for Language {
    type Err = LeptonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::parse(s)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::C => write!(f, "c"),
        }
    }
}

//! Engine options
//!
//! Options can be built in code or loaded from the `[intercept]` table of a
//! TOML document:
//!
//! ```toml
//! [intercept]
//! unwrapped_overrides = "reject"   # or "ignore" (default)
//! trace_chains = true              # default false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// What to do with interceptors registered on a class that is not wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnwrappedPolicy {
    /// Keep the class unwrapped and drop the registrations (logged as a warning)
    #[default]
    Ignore,
    /// Fail the class build with a configuration error
    Reject,
}

/// Options applied when a class is built
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InterceptOptions {
    /// Policy for registrations on unwrapped classes
    pub unwrapped_overrides: UnwrappedPolicy,
    /// Emit a `trace` event for every chain step and fallthrough
    pub trace_chains: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OptionsDocument {
    intercept: InterceptOptions,
}

impl InterceptOptions {
    /// Parse options from a TOML document.
    ///
    /// A missing `[intercept]` table or missing keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let document: OptionsDocument = toml::from_str(source)?;
        Ok(document.intercept)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

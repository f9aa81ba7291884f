//! Parser configuration.

use serde::{Deserialize, Serialize};

/// Default limit on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How the parser reacts to a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMode {
    /// Stop at the first error.
    #[default]
    FailFast,
    /// Record the error, skip the offending value and keep going. Syntax
    /// errors and depth violations still stop the parse.
    Accumulate,
}

/// Options for [`parse_with`](crate::parse_with). Deserializable so hosts can
/// embed them in their own configuration files; missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParseOptions {
    pub errors: ErrorMode,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            errors: ErrorMode::FailFast,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn accumulate() -> Self {
        Self {
            errors: ErrorMode::Accumulate,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_errors(mut self, errors: ErrorMode) -> Self {
        self.errors = errors;
        self
    }
}

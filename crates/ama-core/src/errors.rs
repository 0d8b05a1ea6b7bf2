//! Errors raised while reading alignments, scoring them and running chains.
//!
//! Every failure carries an [`ErrorInfo`] whose `code` is a short kebab-case
//! tag (`name-mismatch`, `target-distance`, ...) that tests and callers match
//! on; the message is for people.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and context of an [`AmaError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case tag identifying the failure.
    pub code: String,
    /// What went wrong, in words.
    pub message: String,
    /// Offending values keyed by role, e.g. `sequence` or `path`.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested fix, usually a command line option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with an empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `value` under `key`, replacing an earlier entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a suggested fix.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Failure of any sampler operation, grouped by the stage that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum AmaError {
    /// FASTA/MPD content that cannot form an alignment.
    #[error("input error: {0}")]
    Input(ErrorInfo),
    /// Broken column bookkeeping found by a consistency check.
    #[error("alignment error: {0}")]
    Alignment(ErrorInfo),
    /// Alignment whose rows do not match the cached reference.
    #[error("distance error: {0}")]
    Distance(ErrorInfo),
    /// Run parameters or targets the sampler cannot honour.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Reading or writing alignment, sample or report files.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// YAML configs and JSON reports that fail to (de)serialise.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl AmaError {
    /// Payload of the error, whatever its family.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            AmaError::Input(info)
            | AmaError::Alignment(info)
            | AmaError::Distance(info)
            | AmaError::Config(info)
            | AmaError::Io(info)
            | AmaError::Serde(info) => info,
        }
    }

    /// Wraps an I/O failure on `path` into an [`AmaError::Io`].
    pub fn io(code: &str, err: std::io::Error, path: &std::path::Path) -> Self {
        AmaError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }
}

//! Error types for flavor operations.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FlavorError>;

/// Error type for flavor plugin operations.
#[derive(Debug, thiserror::Error)]
pub enum FlavorError {
    /// The flavor properties payload did not deserialize into a `FlavorSpec`.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provisioning cannot start (SSL directory missing, no logical ID, ...).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// A script reported success but the artifact it should have written is
    /// missing or empty.
    #[error("Expected artifact {} was not produced", .0.display())]
    MissingArtifact(PathBuf),

    /// Instance properties are not a JSON object, or could not be re-encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single script invocation.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script asset '{0}' not found")]
    NotFound(String),

    #[error("failed to render script '{name}': {message}")]
    Render { name: String, message: String },

    #[error("failed to spawn shell for '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("script '{name}' exited with {status}: {stderr}")]
    Failed {
        name: String,
        status: String,
        stdout: String,
        stderr: String,
    },
}

/// Coarse classification of a [`FlavorError`], as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Precondition,
    ScriptExecution,
    MissingArtifact,
    Serialization,
    Io,
}

impl FlavorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FlavorError::Config(_) => ErrorKind::Configuration,
            FlavorError::Precondition(_) => ErrorKind::Precondition,
            FlavorError::Script(_) => ErrorKind::ScriptExecution,
            FlavorError::MissingArtifact(_) => ErrorKind::MissingArtifact,
            FlavorError::Serialization(_) => ErrorKind::Serialization,
            FlavorError::Io(_) => ErrorKind::Io,
        }
    }

    /// Captured stderr of a failed script, if this error came from one.
    pub fn script_stderr(&self) -> Option<&str> {
        match self {
            FlavorError::Script(ScriptError::Failed { stderr, .. }) => Some(stderr),
            _ => None,
        }
    }
}

//! Wire protocol for the flavor plugin socket.
//!
//! ## Wire Format: NDJSON (Newline-Delimited JSON)
//!
//! Each message is a single JSON object terminated by `\n` (0x0A).
//!
//! - **Request**: one `FlavorCommand` line.
//! - **Response**: exactly one `WireMessage` line, either `Ok` or `Error`.
//!
//! Flavor properties travel as raw JSON values; the plugin parses them on every
//! call, so a malformed flavor surfaces as a `Config` error on that call only.

use kube_flavor::{
    AllocationMethod, ErrorKind, FlavorError, Health, InstanceDescription, InstanceSpec,
};
use serde::{Deserialize, Serialize};

/// Plugin interface name and version reported by `Implements`.
pub const FLAVOR_INTERFACE: &str = "Flavor";
pub const FLAVOR_INTERFACE_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Commands (host → plugin)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data")]
pub enum FlavorCommand {
    /// Report the plugin interfaces served on this socket.
    Implements,
    Validate {
        #[serde(default)]
        properties: serde_json::Value,
        #[serde(default)]
        allocation: AllocationMethod,
    },
    Healthy {
        #[serde(default)]
        properties: serde_json::Value,
        instance: InstanceDescription,
    },
    Drain {
        #[serde(default)]
        properties: serde_json::Value,
        instance: InstanceDescription,
    },
    Prepare {
        #[serde(default)]
        properties: serde_json::Value,
        spec: InstanceSpec,
        #[serde(default)]
        allocation: AllocationMethod,
    },
}

impl FlavorCommand {
    pub fn label(&self) -> &'static str {
        match self {
            FlavorCommand::Implements => "Implements",
            FlavorCommand::Validate { .. } => "Validate",
            FlavorCommand::Healthy { .. } => "Healthy",
            FlavorCommand::Drain { .. } => "Drain",
            FlavorCommand::Prepare { .. } => "Prepare",
        }
    }
}

/// One entry of the `Implements` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
}

impl InterfaceSpec {
    pub fn flavor() -> Self {
        Self {
            name: FLAVOR_INTERFACE.to_string(),
            version: FLAVOR_INTERFACE_VERSION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured errors
// ---------------------------------------------------------------------------

/// Error category, so the host can tell operator mistakes from transient
/// failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Malformed flavor properties or request. Not retryable.
    Config,
    /// Missing SSL directory or logical ID. Not retryable until fixed.
    Precondition,
    /// A PKI script failed or produced nothing.
    Script,
    /// Instance properties could not be updated.
    Serialization,
    Io,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Precondition => write!(f, "Precondition"),
            ErrorCategory::Script => write!(f, "Script"),
            ErrorCategory::Serialization => write!(f, "Serialization"),
            ErrorCategory::Io => write!(f, "IO"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

/// Structured error sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub category: ErrorCategory,
    pub message: String,
    /// Captured stderr of a failed script, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    pub is_retryable: bool,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for WireError {}

impl From<FlavorError> for WireError {
    fn from(e: FlavorError) -> Self {
        let (category, is_retryable) = match e.kind() {
            ErrorKind::Configuration => (ErrorCategory::Config, false),
            ErrorKind::Precondition => (ErrorCategory::Precondition, false),
            ErrorKind::ScriptExecution => (ErrorCategory::Script, true),
            ErrorKind::MissingArtifact => (ErrorCategory::Script, true),
            ErrorKind::Serialization => (ErrorCategory::Serialization, false),
            ErrorKind::Io => (ErrorCategory::Io, true),
        };
        WireError {
            category,
            stderr: e.script_stderr().map(str::to_string),
            message: e.to_string(),
            is_retryable,
        }
    }
}

impl WireError {
    /// Request line that could not be decoded.
    pub fn bad_request(message: String) -> Self {
        Self {
            category: ErrorCategory::Config,
            message,
            stderr: None,
            is_retryable: false,
        }
    }

    pub fn internal(message: String) -> Self {
        Self {
            category: ErrorCategory::Internal,
            message,
            stderr: None,
            is_retryable: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire messages (plugin → host)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum WireMessage {
    Ok {
        #[serde(flatten)]
        data: ResponseData,
    },
    Error(WireError),
}

impl WireMessage {
    pub fn ok_unit() -> Self {
        WireMessage::Ok {
            data: ResponseData::Unit,
        }
    }
    pub fn ok_interfaces(interfaces: Vec<InterfaceSpec>) -> Self {
        WireMessage::Ok {
            data: ResponseData::Interfaces(interfaces),
        }
    }
    pub fn ok_health(health: Health) -> Self {
        WireMessage::Ok {
            data: ResponseData::Health(health),
        }
    }
    pub fn ok_spec(spec: InstanceSpec) -> Self {
        WireMessage::Ok {
            data: ResponseData::Spec(spec),
        }
    }
    pub fn err(error: WireError) -> Self {
        WireMessage::Error(error)
    }
}

impl From<kube_flavor::Result<()>> for WireMessage {
    fn from(result: kube_flavor::Result<()>) -> Self {
        match result {
            Ok(()) => WireMessage::ok_unit(),
            Err(e) => WireMessage::err(e.into()),
        }
    }
}

/// Payload of `WireMessage::Ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ResponseData {
    Unit,
    Interfaces(Vec<InterfaceSpec>),
    Health(Health),
    Spec(InstanceSpec),
}

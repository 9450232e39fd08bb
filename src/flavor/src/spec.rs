//! Data model shared with the orchestration host.
//!
//! Field names follow the host's JSON conventions (`Init`, `LogicalID`,
//! `Properties`, `Tags`) so specs round-trip through the plugin socket without
//! translation.

use crate::error::{FlavorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role value that adds the cluster API address to the node certificate.
pub const CONTROLLER_ROLE: &str = "controller";

/// Operator-declared flavor configuration, parsed from the group's flavor
/// properties on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlavorSpec {
    /// Lines appended to every instance's init script.
    #[serde(default, alias = "init")]
    pub init: Vec<String>,

    /// Free-form role; only `"controller"` is treated specially.
    #[serde(default, alias = "role")]
    pub role: String,

    /// Tags merged into every prepared instance.
    #[serde(default, alias = "tags")]
    pub tags: BTreeMap<String, String>,
}

impl FlavorSpec {
    /// Parse a flavor properties payload. A JSON `null` yields the default spec.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let spec: Option<FlavorSpec> = serde_json::from_slice(payload)
            .map_err(|e| FlavorError::config(format!("invalid flavor properties: {}", e)))?;
        Ok(spec.unwrap_or_default())
    }

    pub fn is_controller(&self) -> bool {
        self.role == CONTROLLER_ROLE
    }
}

/// Instance specification supplied by the host before provisioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Opaque provider properties; must be a JSON object when present.
    #[serde(
        rename = "Properties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<serde_json::Value>,

    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(rename = "Init", default, skip_serializing_if = "String::is_empty")]
    pub init: String,

    #[serde(rename = "LogicalID", default, skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<String>,

    #[serde(rename = "Attachments", default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<serde_json::Value>,
}

impl InstanceSpec {
    /// Logical ID if present and non-empty.
    pub fn logical_id(&self) -> Option<&str> {
        self.logical_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Description of an already-running instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescription {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "LogicalID", default, skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<String>,

    #[serde(rename = "Tags", default)]
    pub tags: BTreeMap<String, String>,
}

/// How the group allocates instances. Passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationMethod {
    #[serde(rename = "Size", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(rename = "LogicalIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub logical_ids: Vec<String>,
}

/// Health as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    Unknown,
    Healthy,
    Unhealthy,
}

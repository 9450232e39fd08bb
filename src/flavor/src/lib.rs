//! Kubernetes flavor plugin core
//!
//! Customizes generic instance specs so the instances join a Kubernetes
//! cluster: flavor-declared init lines and tags are merged in, and every
//! instance gets a certificate bundle signed by a cluster root CA that is
//! created once per SSL directory.
//!
//! Certificate material is produced by embedded openssl scripts executed
//! through bash; see [`scripts`] and [`certs`].

pub mod certs;
pub mod config;
pub mod error;
pub mod merge;
pub mod plugin;
pub mod scripts;
pub mod spec;

pub use certs::{
    CertificateIssuer, CertificateProvisioner, NodeCertificateRequest, ScriptCertificateIssuer,
};
pub use config::{PkiSettings, PluginConfig};
pub use error::{ErrorKind, FlavorError, Result, ScriptError};
pub use plugin::{FlavorPlugin, KubernetesFlavor};
pub use scripts::{BashScriptRunner, ScriptLibrary, ScriptOutput, ScriptRunner};
pub use spec::{AllocationMethod, FlavorSpec, Health, InstanceDescription, InstanceSpec};

//! Cluster certificate provisioning.
//!
//! The root CA and admin identity are created once per SSL directory, marked
//! by the `kube-admin.tar` sentinel. Every prepared instance gets its own
//! bundle `<common-name>.tar` signed by that CA.
//!
//! Issuance itself sits behind [`CertificateIssuer`]; the default
//! implementation shells out to the embedded PKI scripts.

mod provisioner;
mod script_issuer;

pub use provisioner::CertificateProvisioner;
pub use script_issuer::ScriptCertificateIssuer;

use crate::error::{FlavorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Sentinel marking that root CA and admin identity were already issued.
pub const ADMIN_SENTINEL: &str = "kube-admin.tar";

/// Advisory lock file serializing root CA bootstrap across processes.
pub const BOOTSTRAP_LOCK_FILE: &str = ".kube-admin.lock";

/// Extra SAN for controllers: the cluster API service address.
pub const CLUSTER_API_ADDRESS: &str = "10.3.0.1";

pub const APISERVER_CERT_BASE: &str = "apiserver";
pub const APISERVER_CN_PREFIX: &str = "kube-apiserver-";

pub const ADMIN_CERT_BASE: &str = "admin";
pub const ADMIN_COMMON_NAME: &str = "kube-admin";

/// Issues certificate material into an SSL directory.
#[async_trait]
pub trait CertificateIssuer: Send + Sync + 'static {
    /// Create the root CA and the admin identity bundle (`kube-admin.tar`).
    async fn bootstrap_root_ca(&self, ssl_dir: &Path) -> Result<()>;

    /// Issue a node bundle and return the path it was written to.
    async fn issue_node_certificate(
        &self,
        ssl_dir: &Path,
        request: &NodeCertificateRequest,
    ) -> Result<PathBuf>;
}

/// What to put in a node certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCertificateRequest {
    pub cert_base_name: String,
    pub common_name: String,
    pub san_addresses: Vec<String>,
}

impl NodeCertificateRequest {
    /// API server certificate for an instance. Controllers also get the
    /// cluster API address as a SAN.
    pub fn apiserver(logical_id: &str, controller: bool) -> Self {
        let mut san_addresses = vec![logical_id.to_string()];
        if controller {
            san_addresses.push(CLUSTER_API_ADDRESS.to_string());
        }
        Self {
            cert_base_name: APISERVER_CERT_BASE.to_string(),
            common_name: format!("{}{}", APISERVER_CN_PREFIX, logical_id),
            san_addresses,
        }
    }

    /// SAN argument for the issuance script, e.g. `IP.1=10.0.0.5,IP.2=10.3.0.1,`.
    pub fn san_string(&self) -> String {
        format_ip_sans(&self.san_addresses)
    }

    /// `<ssl_dir>/<common_name>.tar`
    pub fn bundle_path(&self, ssl_dir: &Path) -> PathBuf {
        ssl_dir.join(format!("{}.tar", self.common_name))
    }
}

/// Rejects logical IDs that cannot be used verbatim as a certificate subject,
/// SAN entry and bundle file name. The issuance script splits SANs on `,` and
/// `=`, and the bundle must stay directly inside the SSL directory.
pub fn check_logical_id(logical_id: &str) -> Result<()> {
    if logical_id.is_empty() {
        return Err(FlavorError::precondition(
            "instance has no logical ID to use as certificate subject",
        ));
    }
    if let Some(bad) = logical_id
        .chars()
        .find(|&c| matches!(c, ',' | '=' | '/' | '\\') || c.is_control() || c.is_whitespace())
    {
        return Err(FlavorError::precondition(format!(
            "logical ID {:?} contains forbidden character {:?}",
            logical_id, bad
        )));
    }
    Ok(())
}

/// 1-indexed `IP.<n>=<addr>,` entries, trailing comma included.
pub fn format_ip_sans<S: AsRef<str>>(addresses: &[S]) -> String {
    addresses
        .iter()
        .enumerate()
        .map(|(i, addr)| format!("IP.{}={},", i + 1, addr.as_ref()))
        .collect()
}

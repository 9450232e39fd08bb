//! Flavor plugin facade: the four lifecycle operations the orchestration host
//! invokes.

use crate::certs::{
    self, CertificateIssuer, CertificateProvisioner, NodeCertificateRequest, ScriptCertificateIssuer,
};
use crate::config::PluginConfig;
use crate::error::Result;
use crate::merge;
use crate::scripts::{BashScriptRunner, ScriptLibrary, ScriptRunner};
use crate::spec::{AllocationMethod, FlavorSpec, Health, InstanceDescription, InstanceSpec};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations a flavor plugin exposes to the host.
#[async_trait]
pub trait FlavorPlugin: Send + Sync + 'static {
    /// Check that the flavor properties are well formed.
    async fn validate(&self, properties: &[u8], allocation: &AllocationMethod) -> Result<()>;

    async fn healthy(&self, properties: &[u8], instance: &InstanceDescription) -> Result<Health>;

    async fn drain(&self, properties: &[u8], instance: &InstanceDescription) -> Result<()>;

    /// Customize an instance spec before the host creates the instance.
    async fn prepare(
        &self,
        properties: &[u8],
        instance: InstanceSpec,
        allocation: &AllocationMethod,
    ) -> Result<InstanceSpec>;
}

/// Kubernetes flavor: appends init lines and tags, and attaches a per-node
/// certificate bundle signed by the cluster root CA.
pub struct KubernetesFlavor {
    config: PluginConfig,
    certs: CertificateProvisioner,
}

impl KubernetesFlavor {
    /// Plugin using the embedded PKI scripts run through bash.
    pub fn new(config: PluginConfig) -> Result<Self> {
        let library = ScriptLibrary::embedded(&config.pki)?;
        Ok(Self::with_runner(config, Arc::new(BashScriptRunner::new(library))))
    }

    pub fn with_runner(config: PluginConfig, runner: Arc<dyn ScriptRunner>) -> Self {
        Self::with_issuer(config, Arc::new(ScriptCertificateIssuer::new(runner)))
    }

    pub fn with_issuer(config: PluginConfig, issuer: Arc<dyn CertificateIssuer>) -> Self {
        let certs = CertificateProvisioner::new(config.ssl_dir.clone(), issuer);
        Self { config, certs }
    }

    /// Apply the flavor to `instance` in place.
    ///
    /// Steps run in order and stop at the first error. Whatever was merged
    /// before the failing step stays merged: a certificate failure leaves the
    /// merged init script in place, and nothing after it (the `SSL` property,
    /// tags) is applied.
    pub async fn apply(&self, flavor: &FlavorSpec, instance: &mut InstanceSpec) -> Result<()> {
        instance.init = merge::merge_init(&instance.init, &flavor.init);

        self.config.check_ssl_dir()?;
        if self.certs.ensure_root_ca().await? {
            tracing::info!(
                "[KubernetesFlavor] Created cluster root CA in {}",
                self.config.ssl_dir.display()
            );
        }

        let logical_id = instance.logical_id.as_deref().unwrap_or_default();
        certs::check_logical_id(logical_id)?;
        let request = NodeCertificateRequest::apiserver(logical_id, flavor.is_controller());
        let bundle = self.certs.issue_node_certificate(&request).await?;

        instance.properties = Some(merge::inject_ssl_property(
            instance.properties.take(),
            &bundle,
        )?);

        merge::merge_tags(&mut instance.tags, &flavor.tags);
        Ok(())
    }
}

#[async_trait]
impl FlavorPlugin for KubernetesFlavor {
    async fn validate(&self, properties: &[u8], _allocation: &AllocationMethod) -> Result<()> {
        FlavorSpec::parse(properties).map(|_| ())
    }

    // No health probe is defined for this flavor; every instance reports healthy.
    async fn healthy(&self, _properties: &[u8], _instance: &InstanceDescription) -> Result<Health> {
        Ok(Health::Healthy)
    }

    // Nothing to drain: node removal is left to the cluster itself.
    async fn drain(&self, _properties: &[u8], _instance: &InstanceDescription) -> Result<()> {
        Ok(())
    }

    async fn prepare(
        &self,
        properties: &[u8],
        mut instance: InstanceSpec,
        _allocation: &AllocationMethod,
    ) -> Result<InstanceSpec> {
        let flavor = FlavorSpec::parse(properties)?;

        tracing::info!(
            "[KubernetesFlavor] Preparing instance {} (role: {})",
            instance.logical_id().unwrap_or("<none>"),
            if flavor.role.is_empty() { "<none>" } else { &flavor.role }
        );

        self.apply(&flavor, &mut instance).await?;
        Ok(instance)
    }
}

use super::{CertificateIssuer, NodeCertificateRequest, ADMIN_SENTINEL, BOOTSTRAP_LOCK_FILE};
use crate::error::{FlavorError, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError};
use tokio::sync::Mutex;

/// In-process bootstrap locks, one per canonical SSL directory, shared by every
/// provisioner in the process.
fn bootstrap_lock(ssl_dir: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(ssl_dir.to_path_buf()).or_default().clone()
}

/// Exclusive advisory lock on `<ssl_dir>/.kube-admin.lock`, released on drop.
struct BootstrapFileLock {
    file: File,
}

impl BootstrapFileLock {
    async fn acquire(path: PathBuf) -> Result<Self> {
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)??;

        Ok(Self { file })
    }
}

impl Drop for BootstrapFileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("[CertificateProvisioner] Failed to release bootstrap lock: {}", e);
        }
    }
}

/// Fails with [`FlavorError::MissingArtifact`] unless `path` is a non-empty file.
fn verify_artifact(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => {
            tracing::error!(
                "[CertificateProvisioner] Artifact {} missing or empty after issuance",
                path.display()
            );
            Err(FlavorError::MissingArtifact(path.to_path_buf()))
        }
    }
}

fn artifact_ready(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Sequences root CA bootstrap and node issuance for one SSL directory.
pub struct CertificateProvisioner {
    ssl_dir: PathBuf,
    issuer: Arc<dyn CertificateIssuer>,
}

impl CertificateProvisioner {
    pub fn new(ssl_dir: impl Into<PathBuf>, issuer: Arc<dyn CertificateIssuer>) -> Self {
        Self {
            ssl_dir: ssl_dir.into(),
            issuer,
        }
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.ssl_dir.join(ADMIN_SENTINEL)
    }

    /// Bootstrap the root CA and admin identity unless the sentinel exists.
    /// Returns `true` if this call performed the bootstrap.
    ///
    /// Callers in this process are serialized on a mutex keyed by the
    /// canonical SSL directory; other processes are serialized by an
    /// exclusive lock on `.kube-admin.lock`. The sentinel is checked again
    /// once both are held.
    pub async fn ensure_root_ca(&self) -> Result<bool> {
        let sentinel = self.sentinel_path();
        if artifact_ready(&sentinel) {
            tracing::debug!(
                "[CertificateProvisioner] Root CA already present ({})",
                sentinel.display()
            );
            return Ok(false);
        }

        let canonical = tokio::fs::canonicalize(&self.ssl_dir).await?;
        let lock = bootstrap_lock(&canonical);
        let _guard = lock.lock().await;
        let _file_lock = BootstrapFileLock::acquire(canonical.join(BOOTSTRAP_LOCK_FILE)).await?;

        if artifact_ready(&sentinel) {
            tracing::debug!("[CertificateProvisioner] Root CA bootstrapped by a concurrent caller");
            return Ok(false);
        }

        tracing::info!(
            "[CertificateProvisioner] Bootstrapping root CA in {}",
            self.ssl_dir.display()
        );
        self.issuer.bootstrap_root_ca(&self.ssl_dir).await?;
        verify_artifact(&sentinel)?;

        tracing::info!("[CertificateProvisioner] Root CA and admin identity ready");
        Ok(true)
    }

    /// Issue a node bundle and confirm it was written.
    pub async fn issue_node_certificate(&self, request: &NodeCertificateRequest) -> Result<PathBuf> {
        let bundle = self
            .issuer
            .issue_node_certificate(&self.ssl_dir, request)
            .await?;
        verify_artifact(&bundle)?;

        tracing::info!(
            "[CertificateProvisioner] Issued {} -> {}",
            request.common_name,
            bundle.display()
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Writes placeholder artifacts instead of real certificates.
    #[derive(Default)]
    struct FakeIssuer {
        bootstraps: AtomicUsize,
        issued: AtomicUsize,
        skip_writes: bool,
    }

    #[async_trait]
    impl CertificateIssuer for FakeIssuer {
        async fn bootstrap_root_ca(&self, ssl_dir: &Path) -> Result<()> {
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for concurrent callers.
            tokio::time::sleep(Duration::from_millis(50)).await;
            if !self.skip_writes {
                std::fs::write(ssl_dir.join(ADMIN_SENTINEL), b"admin bundle")?;
            }
            Ok(())
        }

        async fn issue_node_certificate(
            &self,
            ssl_dir: &Path,
            request: &NodeCertificateRequest,
        ) -> Result<PathBuf> {
            self.issued.fetch_add(1, Ordering::SeqCst);
            let path = request.bundle_path(ssl_dir);
            if !self.skip_writes {
                std::fs::write(&path, request.san_string())?;
            }
            Ok(path)
        }
    }

    #[tokio::test]
    async fn bootstrap_runs_once_then_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = Arc::new(FakeIssuer::default());
        let provisioner = CertificateProvisioner::new(dir.path(), issuer.clone());

        assert!(provisioner.ensure_root_ca().await.unwrap());
        assert!(!provisioner.ensure_root_ca().await.unwrap());
        assert!(!provisioner.ensure_root_ca().await.unwrap());
        assert_eq!(issuer.bootstraps.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_sentinel_skips_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ADMIN_SENTINEL), b"from a previous run").unwrap();
        let issuer = Arc::new(FakeIssuer::default());
        let provisioner = CertificateProvisioner::new(dir.path(), issuer.clone());

        assert!(!provisioner.ensure_root_ca().await.unwrap());
        assert_eq!(issuer.bootstraps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_bootstrap_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = Arc::new(FakeIssuer::default());

        // Separate provisioners share the process-wide lock for the directory.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let provisioner = CertificateProvisioner::new(dir.path(), issuer.clone());
            handles.push(tokio::spawn(async move { provisioner.ensure_root_ca().await }));
        }

        let mut performed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                performed += 1;
            }
        }

        assert_eq!(performed, 1);
        assert_eq!(issuer.bootstraps.load(Ordering::SeqCst), 1);
        assert!(dir.path().join(BOOTSTRAP_LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn bootstrap_without_sentinel_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = Arc::new(FakeIssuer {
            skip_writes: true,
            ..Default::default()
        });
        let provisioner = CertificateProvisioner::new(dir.path(), issuer);

        let err = provisioner.ensure_root_ca().await.unwrap_err();
        assert!(matches!(err, FlavorError::MissingArtifact(p) if p.ends_with(ADMIN_SENTINEL)));
    }

    #[tokio::test]
    async fn empty_sentinel_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ADMIN_SENTINEL), b"").unwrap();
        let issuer = Arc::new(FakeIssuer::default());
        let provisioner = CertificateProvisioner::new(dir.path(), issuer.clone());

        assert!(provisioner.ensure_root_ca().await.unwrap());
        assert_eq!(issuer.bootstraps.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn node_bundle_is_verified() {
        let dir = tempfile::tempdir().unwrap();
        let request = NodeCertificateRequest::apiserver("10.0.0.5", false);

        let ok = CertificateProvisioner::new(dir.path(), Arc::new(FakeIssuer::default()));
        let path = ok.issue_node_certificate(&request).await.unwrap();
        assert_eq!(path, dir.path().join("kube-apiserver-10.0.0.5.tar"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "IP.1=10.0.0.5,");

        let other = tempfile::tempdir().unwrap();
        let silent = CertificateProvisioner::new(
            other.path(),
            Arc::new(FakeIssuer {
                skip_writes: true,
                ..Default::default()
            }),
        );
        let err = silent.issue_node_certificate(&request).await.unwrap_err();
        assert!(matches!(err, FlavorError::MissingArtifact(_)));
    }

    #[tokio::test]
    async fn missing_ssl_dir_fails_before_issuer() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = Arc::new(FakeIssuer::default());
        let provisioner = CertificateProvisioner::new(dir.path().join("absent"), issuer.clone());

        assert!(matches!(
            provisioner.ensure_root_ca().await,
            Err(FlavorError::Io(_))
        ));
        assert_eq!(issuer.bootstraps.load(Ordering::SeqCst), 0);
    }
}

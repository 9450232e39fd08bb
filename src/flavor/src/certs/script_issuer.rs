use super::{CertificateIssuer, NodeCertificateRequest, ADMIN_CERT_BASE, ADMIN_COMMON_NAME};
use crate::error::Result;
use crate::scripts::embedded_scripts::{INIT_SSL, INIT_SSL_CA};
use crate::scripts::ScriptRunner;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Issues certificates by running the embedded openssl scripts.
pub struct ScriptCertificateIssuer {
    runner: Arc<dyn ScriptRunner>,
}

impl ScriptCertificateIssuer {
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

fn dir_arg(ssl_dir: &Path) -> String {
    ssl_dir.to_string_lossy().into_owned()
}

#[async_trait]
impl CertificateIssuer for ScriptCertificateIssuer {
    async fn bootstrap_root_ca(&self, ssl_dir: &Path) -> Result<()> {
        let dir = dir_arg(ssl_dir);

        tracing::info!("[ScriptCertificateIssuer] Generating root CA in {}", dir);
        self.runner.run(INIT_SSL_CA, &[dir.clone()]).await?;

        tracing::info!("[ScriptCertificateIssuer] Generating admin identity");
        self.runner
            .run(
                INIT_SSL,
                &[
                    dir,
                    ADMIN_CERT_BASE.to_string(),
                    ADMIN_COMMON_NAME.to_string(),
                ],
            )
            .await?;

        Ok(())
    }

    async fn issue_node_certificate(
        &self,
        ssl_dir: &Path,
        request: &NodeCertificateRequest,
    ) -> Result<PathBuf> {
        let sans = request.san_string();
        tracing::info!(
            "[ScriptCertificateIssuer] Issuing {} for {} (SANs: {})",
            request.cert_base_name,
            request.common_name,
            sans
        );

        self.runner
            .run(
                INIT_SSL,
                &[
                    dir_arg(ssl_dir),
                    request.cert_base_name.clone(),
                    request.common_name.clone(),
                    sans,
                ],
            )
            .await?;

        Ok(request.bundle_path(ssl_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlavorError, ScriptError};
    use crate::scripts::ScriptOutput;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: Option<&'static str>,
    }

    #[async_trait]
    impl ScriptRunner for RecordingRunner {
        async fn run(
            &self,
            script: &str,
            args: &[String],
        ) -> std::result::Result<ScriptOutput, ScriptError> {
            self.calls
                .lock()
                .unwrap()
                .push((script.to_string(), args.to_vec()));
            if self.fail == Some(script) {
                return Err(ScriptError::Failed {
                    name: script.to_string(),
                    status: "exit status: 1".into(),
                    stdout: String::new(),
                    stderr: "openssl failed".into(),
                });
            }
            Ok(ScriptOutput::default())
        }
    }

    #[tokio::test]
    async fn bootstrap_runs_ca_then_admin() {
        let runner = Arc::new(RecordingRunner::default());
        let issuer = ScriptCertificateIssuer::new(runner.clone());

        issuer.bootstrap_root_ca(Path::new("/ssl")).await.unwrap();

        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("ssl/init-ssl-ca".to_string(), vec!["/ssl".to_string()]),
                (
                    "ssl/init-ssl".to_string(),
                    vec!["/ssl".to_string(), "admin".to_string(), "kube-admin".to_string()]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn ca_failure_skips_admin_issuance() {
        let runner = Arc::new(RecordingRunner {
            fail: Some("ssl/init-ssl-ca"),
            ..Default::default()
        });
        let issuer = ScriptCertificateIssuer::new(runner.clone());

        let err = issuer.bootstrap_root_ca(Path::new("/ssl")).await.unwrap_err();
        assert_eq!(err.script_stderr(), Some("openssl failed"));
        assert!(matches!(err, FlavorError::Script(_)));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn node_issuance_passes_san_string() {
        let runner = Arc::new(RecordingRunner::default());
        let issuer = ScriptCertificateIssuer::new(runner.clone());
        let request = NodeCertificateRequest::apiserver("10.0.0.5", true);

        let path = issuer
            .issue_node_certificate(Path::new("/ssl"), &request)
            .await
            .unwrap();

        assert_eq!(path, PathBuf::from("/ssl/kube-apiserver-10.0.0.5.tar"));
        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                "ssl/init-ssl".to_string(),
                vec![
                    "/ssl".to_string(),
                    "apiserver".to_string(),
                    "kube-apiserver-10.0.0.5".to_string(),
                    "IP.1=10.0.0.5,IP.2=10.3.0.1,".to_string(),
                ]
            )]
        );
    }
}

//! Server module for running Terraform providers
//!
//! This module starts the tfplugin6 gRPC server with TLS and performs the
//! go-plugin handshake on stdout.

use crate::context::Context;
use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use base64::Engine;
use rustls_pki_types::{pem::PemObject, CertificateDer};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const CORE_PROTOCOL_VERSION: u32 = 1;
const APP_PROTOCOL_VERSION: u32 = 6;

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file
    pub cert_path: PathBuf,
    /// Path to TLS key file
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    /// Certificates come from `TF_PLUGIN_TLS_CERT`/`TF_PLUGIN_TLS_KEY`, or a
    /// `certs/` directory next to the executable.
    fn default() -> Self {
        let certs_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("certs")))
            .unwrap_or_else(|| PathBuf::from("certs"));

        Self {
            cert_path: std::env::var_os("TF_PLUGIN_TLS_CERT")
                .map(PathBuf::from)
                .unwrap_or_else(|| certs_dir.join("localhost.pem")),
            key_path: std::env::var_os("TF_PLUGIN_TLS_KEY")
                .map(PathBuf::from)
                .unwrap_or_else(|| certs_dir.join("localhost-key.pem")),
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the certificate path
    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    /// Set the key path
    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Refuses to start unless launched by Terraform
pub fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::HandshakeError(
            "This binary is a plugin. These are not meant to be executed directly. \
             Please execute the program that consumes these plugins, which will \
             load any plugins automatically"
                .to_string(),
        )),
    }
}

/// The go-plugin handshake line Terraform reads from stdout
pub fn handshake_line(addr: SocketAddr, cert_der: &[u8]) -> String {
    format!(
        "{}|{}|tcp|{}|grpc|{}",
        CORE_PROTOCOL_VERSION,
        APP_PROTOCOL_VERSION,
        addr,
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(cert_der)
    )
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    // Another component may have installed a provider already.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert = tokio::fs::read(&config.cert_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read certificate {}: {}",
            config.cert_path.display(),
            e
        ))
    })?;
    let key = tokio::fs::read(&config.key_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read key {}: {}",
            config.key_path.display(),
            e
        ))
    })?;
    let cert_der = CertificateDer::from_pem_slice(&cert)
        .map_err(|e| TfplugError::TlsError(format!("Invalid certificate PEM: {}", e)))?;

    let mut tls_config = ServerTlsConfig::new().identity(Identity::from_pem(&cert, &key));
    if let Ok(client_cert) = std::env::var("PLUGIN_CLIENT_CERT") {
        tls_config = tls_config.client_ca_root(Certificate::from_pem(client_cert));
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let ctx = Context::new();
    let grpc_server = GrpcProviderServer::with_context(provider, ctx);
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(addr, cert_der.as_ref()))?;
    stdout.flush()?;

    tracing::info!(%addr, "Provider server listening");

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    Server::builder()
        .tls_config(tls_config)?
        .add_service(provider_service)
        .serve_with_incoming_shutdown(incoming, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Interrupt received, shutting down");
        })
        .await?;

    Ok(())
}

/// Convenience function to run a provider with default configuration
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn handshake_line_has_six_fields() {
        let addr: SocketAddr = "127.0.0.1:41234".parse().unwrap();
        let line = handshake_line(addr, &[0xde, 0xad, 0xbe, 0xef]);

        assert_eq!(line, "1|6|tcp|127.0.0.1:41234|grpc|3q2+7w");
    }

    #[test]
    #[serial]
    fn magic_cookie_is_required() {
        std::env::remove_var(MAGIC_COOKIE_KEY);
        assert!(matches!(
            check_magic_cookie(),
            Err(TfplugError::HandshakeError(_))
        ));

        std::env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());
        std::env::remove_var(MAGIC_COOKIE_KEY);
    }

    #[test]
    #[serial]
    fn tls_paths_follow_environment() {
        std::env::set_var("TF_PLUGIN_TLS_CERT", "/tmp/cert.pem");
        std::env::set_var("TF_PLUGIN_TLS_KEY", "/tmp/key.pem");

        let config = ServerConfig::default();
        assert_eq!(config.cert_path, PathBuf::from("/tmp/cert.pem"));
        assert_eq!(config.key_path, PathBuf::from("/tmp/key.pem"));
        assert_eq!(config.max_message_size, 256 << 20);

        std::env::remove_var("TF_PLUGIN_TLS_CERT");
        std::env::remove_var("TF_PLUGIN_TLS_KEY");

        let config = ServerConfig::default();
        assert!(config.cert_path.ends_with("certs/localhost.pem"));
    }
}

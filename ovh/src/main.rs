use ovh::OvhProvider;
use tfplug::{serve, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    let filter = std::env::var("TF_LOG_PROVIDER_OVH")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    serve(OvhProvider::new(), ServerConfig::default()).await?;

    Ok(())
}

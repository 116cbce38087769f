use anyhow::Result;
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use std::env;
use tracing::debug;

/// Creates a Kubernetes client from the local kubeconfig or in-cluster config.
///
/// `KDASH_CONTEXT` pins a kubeconfig context; otherwise the current context
/// (or the in-cluster service account) is used.
pub async fn build_kube_client() -> Result<Client> {
    let client = if let Ok(context) = env::var("KDASH_CONTEXT") {
        debug!(context = %context, "Using kubeconfig context from KDASH_CONTEXT");
        let options = KubeConfigOptions {
            context: Some(context),
            ..Default::default()
        };
        let config = Config::from_kubeconfig(&options).await?;
        Client::try_from(config)?
    } else {
        debug!("Inferring kube configuration");
        Client::try_default().await?
    };

    debug!("Kubernetes client initialized successfully");
    Ok(client)
}

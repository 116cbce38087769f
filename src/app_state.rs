use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::CoreConfig;
use crate::core::client::cluster_client::{ClusterClient, DeleteOptions};
use crate::core::client::gvr::Rid;
use crate::core::client::kube_client::build_kube_client;
use crate::core::client::kube_cluster_client::KubeClusterClient;
use crate::core::watch::Factory;
use crate::domain::dao::restart::system_clock;
use crate::domain::dao::{Accessor, AccessorRegistry};
use crate::domain::logs::{log_channel, LogOptions, LogReceiver, LogSink};

/// Everything the UI layer needs, wired once at startup.
#[derive(Clone)]
pub struct CoreState {
    pub config: Arc<CoreConfig>,
    pub factory: Arc<Factory>,
    pub accessors: Arc<AccessorRegistry>,
}

/// Connect to the cluster selected by the kube config and wire the core.
pub async fn build_core_state(config: CoreConfig) -> Result<CoreState> {
    let client = build_kube_client().await?;
    Ok(build_core_state_with(Arc::new(KubeClusterClient::new(client)), config))
}

pub fn build_core_state_with(client: Arc<dyn ClusterClient>, config: CoreConfig) -> CoreState {
    let factory = Factory::shared(client, config.factory_config());
    let accessors = Arc::new(AccessorRegistry::new(factory.clone(), system_clock()));
    info!(stale_threshold = config.watch_stale_threshold, "Core state ready");

    CoreState {
        config: Arc::new(config),
        factory,
        accessors,
    }
}

impl CoreState {
    pub fn accessor(&self, rid: &Rid) -> Arc<dyn Accessor> {
        self.accessors.accessor_for(rid.gvr())
    }

    /// Bounded sink and receiver sized by `KDASH_LOG_BUFFER`.
    pub fn log_channel(&self) -> (LogSink, LogReceiver) {
        log_channel(self.config.log_config().buffer)
    }

    /// Follow options for `path` with the configured tail length.
    pub fn log_options(&self, path: &str) -> LogOptions {
        LogOptions::new(path, &self.config.log_config())
    }

    /// Starting point for a delete: configured grace period, server-default propagation.
    pub fn delete_options(&self) -> DeleteOptions {
        self.config.delete_options()
    }

    /// Stop every watch; call once on exit.
    pub async fn shutdown(&self) {
        self.factory.shutdown().await;
    }
}

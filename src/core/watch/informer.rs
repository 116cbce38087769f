use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FactoryConfig;
use crate::core::client::cluster_client::{ClusterClient, WatchEvent, WatchStream};
use crate::core::client::gvr::{cache_key, Gvr};
use crate::core::watch::backoff::Backoff;
use crate::core::watch::cache::{CacheEntry, CacheState};
use crate::errors::DaoError;

/// Background watch worker feeding one cache partition.
pub struct Informer {
    entry: Arc<CacheEntry>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Informer {
    /// Start the worker on `runtime`; it stops when `parent` or [`Informer::stop`] cancels.
    pub fn spawn(
        runtime: &Handle,
        client: Arc<dyn ClusterClient>,
        gvr: Gvr,
        namespace: Option<String>,
        config: FactoryConfig,
        parent: &CancellationToken,
    ) -> Self {
        let entry = Arc::new(CacheEntry::new());
        let cancel = parent.child_token();
        entry.mark_watching();

        let worker = Worker {
            client,
            gvr,
            namespace,
            config,
            entry: entry.clone(),
            cancel: cancel.clone(),
        };
        let handle = runtime.spawn(worker.run());

        Self { entry, cancel, handle }
    }

    pub fn entry(&self) -> &Arc<CacheEntry> {
        &self.entry
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the worker to release its stream.
    pub async fn join(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(?e, "Watch worker panicked");
        }
    }
}

enum Outcome {
    Cancelled,
    Failed(DaoError),
}

struct Worker {
    client: Arc<dyn ClusterClient>,
    gvr: Gvr,
    namespace: Option<String>,
    config: FactoryConfig,
    entry: Arc<CacheEntry>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let scope = cache_key(&self.gvr, self.namespace.as_deref());
        let mut backoff = Backoff::new(self.config.backoff_base, self.config.backoff_max);
        info!(scope = %scope, "Starting watch");

        loop {
            let opened = tokio::select! {
                _ = self.cancel.cancelled() => break,
                opened = self.client.watch(&self.gvr, self.namespace.as_deref()) => opened,
            };

            let error = match opened {
                Ok(stream) => match self.consume(stream, &mut backoff, &scope).await {
                    Outcome::Cancelled => break,
                    Outcome::Failed(e) => e,
                },
                Err(e) => e,
            };

            let state = self.entry.record_failure(self.config.stale_threshold);
            let failures = self.entry.status().consecutive_failures;
            if state == CacheState::Stale {
                warn!(scope = %scope, failures, error = %error, "Watch is stale, still resubscribing");
            } else {
                debug!(scope = %scope, failures, error = %error, "Watch interrupted, resubscribing");
            }

            let delay = backoff.next_delay();
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.entry.mark_unwatched();
        info!(scope = %scope, "Watch stopped");
    }

    async fn consume(&self, mut stream: WatchStream, backoff: &mut Backoff, scope: &str) -> Outcome {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Outcome::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    let listed = matches!(event, WatchEvent::Reset(_));
                    self.entry.apply(event);
                    backoff.reset();
                    if self.entry.record_success(listed) {
                        info!(scope = %scope, "Watch recovered");
                    }
                }
                Some(Err(e)) => return Outcome::Failed(e),
                None => return Outcome::Failed(DaoError::Transport(format!("watch on {scope} closed"))),
            }
        }
    }
}

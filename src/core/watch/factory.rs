use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::FactoryConfig;
use crate::core::client::cluster_client::{ClusterClient, Payload, Verb};
use crate::core::client::gvr::{cache_key, namespaced, Gvr, Rid};
use crate::core::client::kube_resources::DynamicObject;
use crate::core::client::selector::LabelSelector;
use crate::core::watch::cache::{CacheEntry, CacheState, CacheStatus};
use crate::core::watch::informer::Informer;
use crate::errors::DaoError;

/// Owns one watch-backed cache per `(gvr, namespace)` scope.
///
/// Reads never touch the network; mutations go straight to the cluster and
/// are never retried here. Shared by every accessor as `Arc<Factory>`.
pub struct Factory {
    client: Arc<dyn ClusterClient>,
    config: FactoryConfig,
    informers: Mutex<HashMap<String, Informer>>,
    cancel: CancellationToken,
}

impl Factory {
    pub fn new(client: Arc<dyn ClusterClient>, config: FactoryConfig) -> Self {
        Self {
            client,
            config,
            informers: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn shared(client: Arc<dyn ClusterClient>, config: FactoryConfig) -> Arc<Self> {
        Arc::new(Self::new(client, config))
    }

    pub fn client(&self) -> &Arc<dyn ClusterClient> {
        &self.client
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Start watching a scope unless a watch is already active. Idempotent.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_watch(&self, gvr: &Gvr, namespace: Option<&str>) -> Result<(), DaoError> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let key = cache_key(gvr, namespace);
        let mut informers = self.informers.lock().unwrap_or_else(PoisonError::into_inner);
        if informers.contains_key(&key) {
            return Ok(());
        }
        // A healthy all-namespaces listing already covers every namespace.
        if namespace.is_some() && informers.get(&cache_key(gvr, None)).is_some_and(covers_namespaces) {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(DaoError::Transport("factory is shut down".into()));
        }

        let runtime = Handle::try_current()
            .map_err(|e| DaoError::Transport(format!("no async runtime to watch {key}: {e}")))?;
        let informer = Informer::spawn(
            &runtime,
            self.client.clone(),
            gvr.clone(),
            namespace.map(str::to_string),
            self.config.clone(),
            &self.cancel,
        );
        debug!(scope = %key, "Registered watch");
        informers.insert(key, informer);
        Ok(())
    }

    /// Stop one scope's watch; its cached data goes with it.
    pub fn stop_watch(&self, gvr: &Gvr, namespace: Option<&str>) {
        let removed = self
            .informers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&cache_key(gvr, namespace));
        if let Some(informer) = removed {
            informer.stop();
        }
    }

    /// Ensure the scope is watched and wait for its first full listing.
    pub async fn wait_synced(&self, gvr: &Gvr, namespace: Option<&str>, timeout: Duration) -> Result<(), DaoError> {
        self.ensure_watch(gvr, namespace)?;
        let mut rx = self
            .subscribe(gvr, namespace)
            .ok_or_else(|| DaoError::Transport(format!("watch on {} was stopped", cache_key(gvr, namespace))))?;

        let waited = tokio::time::timeout(timeout, async { rx.wait_for(|s| s.synced).await.is_ok() }).await;
        match waited {
            Ok(true) => Ok(()),
            Ok(false) => Err(DaoError::Transport(format!(
                "watch on {} was stopped",
                cache_key(gvr, namespace)
            ))),
            Err(_) => Err(DaoError::Transport(format!(
                "timed out after {timeout:?} waiting for {} to sync",
                cache_key(gvr, namespace)
            ))),
        }
    }

    /// Cached object by `namespace/name` (or bare name for cluster scope).
    /// `None` means absent, which is not an error.
    pub fn get(&self, gvr: &Gvr, fqn: &str) -> Option<Arc<DynamicObject>> {
        let (namespace, _) = namespaced(fqn);
        self.entry_for(gvr, namespace)?.snapshot().get(fqn)
    }

    /// Cached objects in a scope matching `selector`, in cache order.
    pub fn list(&self, gvr: &Gvr, namespace: Option<&str>, selector: &LabelSelector) -> Vec<Arc<DynamicObject>> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let Some(entry) = self.entry_for(gvr, namespace) else {
            return Vec::new();
        };

        entry
            .snapshot()
            .objects()
            .filter(|o| namespace.is_none() || o.metadata.namespace.as_deref() == namespace)
            .filter(|o| selector.matches(o.metadata.labels.as_ref()))
            .cloned()
            .collect()
    }

    pub fn cache_state(&self, gvr: &Gvr, namespace: Option<&str>) -> CacheState {
        self.entry_for(gvr, namespace)
            .map(|e| e.status().state)
            .unwrap_or(CacheState::Unwatched)
    }

    pub fn is_stale(&self, gvr: &Gvr, namespace: Option<&str>) -> bool {
        self.cache_state(gvr, namespace) == CacheState::Stale
    }

    /// `Err(Stale)` when the scope has exhausted its resubscribe budget.
    pub fn check_fresh(&self, gvr: &Gvr, namespace: Option<&str>) -> Result<(), DaoError> {
        if self.is_stale(gvr, namespace) {
            return Err(DaoError::Stale(cache_key(gvr, namespace)));
        }
        Ok(())
    }

    pub fn subscribe(&self, gvr: &Gvr, namespace: Option<&str>) -> Option<watch::Receiver<CacheStatus>> {
        self.entry_for(gvr, namespace).map(|e| e.subscribe())
    }

    pub fn revision(&self, gvr: &Gvr, namespace: Option<&str>) -> u64 {
        self.entry_for(gvr, namespace)
            .map(|e| e.snapshot().revision())
            .unwrap_or(0)
    }

    /// Uncached mutating call. Returns the object the server sent back, if any.
    pub async fn forward(&self, verb: Verb, rid: &Rid, payload: Payload) -> Result<Option<DynamicObject>, DaoError> {
        let gvr = rid.gvr();
        let namespace = rid.namespace();
        let name = rid.name();
        if !verb.is_mutating() {
            return Err(DaoError::Invalid(format!("{verb} is served from the cache, not forwarded")));
        }
        debug!(verb = %verb, rid = %rid, "Forwarding call");

        match (verb, payload) {
            (Verb::Create, Payload::Object(object)) => {
                self.client.create(gvr, namespace, &object).await.map(Some)
            }
            (Verb::Patch, Payload::Patch { kind, body }) => {
                let name = name.ok_or_else(|| DaoError::Invalid(format!("patch needs a name: {rid}")))?;
                self.client.patch(gvr, namespace, name, kind, &body).await.map(Some)
            }
            (Verb::Delete, Payload::Delete(options)) => {
                let name = name.ok_or_else(|| DaoError::Invalid(format!("delete needs a name: {rid}")))?;
                self.client.delete(gvr, namespace, name, &options).await.map(|_| None)
            }
            (verb, _) => Err(DaoError::Invalid(format!("cannot forward {verb} with this payload"))),
        }
    }

    /// Uncached access review.
    pub async fn can_i(&self, namespace: Option<&str>, gvr: &Gvr, verbs: &[Verb]) -> Result<bool, DaoError> {
        self.client.can_i(namespace, gvr, verbs).await
    }

    /// Cancel every watch and wait for the workers to exit. Later
    /// `ensure_watch` calls fail.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let informers: Vec<Informer> = self
            .informers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, informer)| informer)
            .collect();

        let count = informers.len();
        futures::future::join_all(informers.into_iter().map(Informer::join)).await;
        info!(watches = count, "Factory shut down");
    }

    pub fn active_watches(&self) -> usize {
        self.informers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The scope's own partition, or the all-namespaces one as a fallback.
    /// A namespaced partition exists only when the all-namespaces one could
    /// not serve it, so it always wins.
    fn entry_for(&self, gvr: &Gvr, namespace: Option<&str>) -> Option<Arc<CacheEntry>> {
        let informers = self.informers.lock().unwrap_or_else(PoisonError::into_inner);
        let namespace = namespace.filter(|ns| !ns.is_empty());
        informers
            .get(&cache_key(gvr, namespace))
            .or_else(|| namespace.and_then(|_| informers.get(&cache_key(gvr, None))))
            .map(|i| i.entry().clone())
    }
}

fn covers_namespaces(informer: &Informer) -> bool {
    let status = informer.entry().status();
    status.synced && status.state != CacheState::Stale
}

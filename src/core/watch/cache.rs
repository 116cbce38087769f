use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::core::client::cluster_client::WatchEvent;
use crate::core::client::gvr::fqn;
use crate::core::client::kube_resources::DynamicObject;

/// Lifecycle of one cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Unwatched,
    Watching,
    /// Resubscribing has failed too often; data is best-effort.
    Stale,
}

/// Status broadcast to anyone rendering data from a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: CacheState,
    /// A full listing has landed at least once.
    pub synced: bool,
    pub consecutive_failures: u32,
    pub revision: u64,
}

impl Default for CacheStatus {
    fn default() -> Self {
        Self {
            state: CacheState::Unwatched,
            synced: false,
            consecutive_failures: 0,
            revision: 0,
        }
    }
}

/// Immutable view of a partition at one revision.
///
/// Objects are keyed by fully qualified name; values are shared, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    objects: HashMap<String, Arc<DynamicObject>>,
    revision: u64,
}

impl Snapshot {
    pub fn get(&self, fqn: &str) -> Option<Arc<DynamicObject>> {
        self.objects.get(fqn).cloned()
    }

    pub fn objects(&self) -> impl Iterator<Item = &Arc<DynamicObject>> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// One watched scope: the current snapshot plus its status channel.
///
/// Written only by the scope's watch worker. Readers take the current
/// `Arc<Snapshot>` and never see a half-applied event: the writer clones,
/// mutates the clone and swaps the pointer.
pub struct CacheEntry {
    snapshot: RwLock<Arc<Snapshot>>,
    status: watch::Sender<CacheStatus>,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheEntry {
    pub fn new() -> Self {
        let (status, _) = watch::channel(CacheStatus::default());
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            status,
        }
    }

    /// Current snapshot (zero copy).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> CacheStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheStatus> {
        self.status.subscribe()
    }

    /// Apply one watch event. Returns whether the snapshot changed.
    pub fn apply(&self, event: WatchEvent) -> bool {
        let changed = self.update(|snap| match event {
            WatchEvent::Reset(objects) => {
                snap.objects = objects
                    .into_iter()
                    .filter_map(|o| object_key(&o).map(|k| (k, Arc::new(o))))
                    .collect();
                true
            }
            WatchEvent::Applied(object) => {
                let Some(key) = object_key(&object) else { return false };
                if snap.objects.get(&key).is_some_and(|current| is_older(&object, current)) {
                    return false;
                }
                snap.objects.insert(key, Arc::new(object));
                true
            }
            WatchEvent::Deleted(object) => {
                let Some(key) = object_key(&object) else { return false };
                if snap.objects.get(&key).is_some_and(|current| is_older(&object, current)) {
                    return false;
                }
                snap.objects.remove(&key).is_some()
            }
        });

        let revision = self.snapshot().revision;
        self.status.send_if_modified(|s| {
            let moved = s.revision != revision;
            s.revision = revision;
            moved
        });
        changed
    }

    /// Clone-mutate-swap. Objects are shared, so only the index is copied.
    /// The revision only moves when `f` reports a change.
    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Snapshot) -> bool,
    {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = (**guard).clone();
        let changed = f(&mut next);
        if changed {
            next.revision += 1;
            *guard = Arc::new(next);
        }
        changed
    }

    /// The subscription delivered an event; `listed` marks a full listing.
    /// Returns true if this recovered the partition from `Stale`.
    pub fn record_success(&self, listed: bool) -> bool {
        let mut recovered = false;
        self.status.send_if_modified(|s| {
            let before = s.clone();
            recovered = s.state == CacheState::Stale;
            s.state = CacheState::Watching;
            s.synced |= listed;
            s.consecutive_failures = 0;
            *s != before
        });
        recovered
    }

    pub fn mark_watching(&self) {
        self.status.send_if_modified(|s| {
            if s.state == CacheState::Unwatched {
                s.state = CacheState::Watching;
                return true;
            }
            false
        });
    }

    /// Count one failed subscription; flips to `Stale` at `threshold`.
    pub fn record_failure(&self, threshold: u32) -> CacheState {
        let mut state = CacheState::Watching;
        self.status.send_modify(|s| {
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            if s.consecutive_failures >= threshold {
                s.state = CacheState::Stale;
            }
            state = s.state;
        });
        state
    }

    pub fn mark_unwatched(&self) {
        self.status.send_modify(|s| s.state = CacheState::Unwatched);
    }
}

fn object_key(object: &DynamicObject) -> Option<String> {
    let name = object.metadata.name.as_deref()?;
    Some(fqn(object.metadata.namespace.as_deref().unwrap_or_default(), name))
}

/// Last write wins by resource version. Versions are opaque to clients, so
/// anything that is not a plain integer is treated as newer.
fn is_older(incoming: &DynamicObject, current: &DynamicObject) -> bool {
    match (resource_version(incoming), resource_version(current)) {
        (Some(new), Some(old)) => new < old,
        _ => false,
    }
}

fn resource_version(object: &DynamicObject) -> Option<u64> {
    object.metadata.resource_version.as_deref()?.parse().ok()
}

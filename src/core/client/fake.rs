//! In-memory [`ClusterClient`] used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};

use crate::core::client::cluster_client::{
    ClusterClient, DeleteOptions, LogLineStream, PatchKind, PodLogParams, Verb, WatchEvent, WatchStream,
};
use crate::core::client::gvr::{cache_key, Gvr};
use crate::core::client::kube_resources::DynamicObject;
use crate::errors::DaoError;

/// Route worker logs to the test harness; repeated calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub type FeedSender = mpsc::UnboundedSender<Result<WatchEvent, DaoError>>;

#[derive(Default)]
struct WatchPlan {
    failures: usize,
    gate: Option<Arc<Notify>>,
    feed: Option<mpsc::UnboundedReceiver<Result<WatchEvent, DaoError>>>,
}

/// How a scripted pod log stream behaves after its lines.
#[derive(Debug, Clone)]
pub enum LogEnd {
    Close,
    Error(String),
    Hang,
}

#[derive(Debug, Clone)]
struct LogPlan {
    lines: Vec<String>,
    end: LogEnd,
}

#[derive(Default)]
pub struct FakeCluster {
    pub watch_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub patch_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub can_i_calls: AtomicUsize,
    pub log_calls: AtomicUsize,
    denied: AtomicBool,
    watches: Mutex<HashMap<String, WatchPlan>>,
    logs: Mutex<HashMap<String, LogPlan>>,
    pub patches: Mutex<Vec<(String, PatchKind, Value)>>,
    pub deletes: Mutex<Vec<(String, DeleteOptions)>>,
    pub reviews: Mutex<Vec<(Option<String>, String, Vec<Verb>)>>,
    pub log_requests: Mutex<VecDeque<(String, PodLogParams)>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deny_all(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    /// Feed the scope with an initial listing; the returned sender pushes later events.
    pub fn seed(&self, gvr: &Gvr, namespace: Option<&str>, objects: Vec<DynamicObject>) -> FeedSender {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(WatchEvent::Reset(objects)));
        let mut watches = self.watches.lock().unwrap();
        watches.entry(cache_key(gvr, namespace)).or_default().feed = Some(rx);
        tx
    }

    /// The next `failures` watch attempts on the scope fail; the one after that
    /// waits for `gate` (if any) before succeeding.
    pub fn fail_watches(&self, gvr: &Gvr, namespace: Option<&str>, failures: usize, gate: Option<Arc<Notify>>) {
        let mut watches = self.watches.lock().unwrap();
        let plan = watches.entry(cache_key(gvr, namespace)).or_default();
        plan.failures = failures;
        plan.gate = gate;
    }

    pub fn script_logs(&self, pod: &str, lines: &[&str], end: LogEnd) {
        self.logs.lock().unwrap().insert(
            pod.to_string(),
            LogPlan {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                end,
            },
        );
    }

    pub fn mutating_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.patch_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn watch(&self, gvr: &Gvr, namespace: Option<&str>) -> Result<WatchStream, DaoError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let key = cache_key(gvr, namespace);

        let (gate, feed) = {
            let mut watches = self.watches.lock().unwrap();
            let plan = watches.entry(key.clone()).or_default();
            if plan.failures > 0 {
                plan.failures -= 1;
                return Err(DaoError::Transport(format!("watch {key} refused")));
            }
            (plan.gate.take(), plan.feed.take())
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        let events = match feed {
            Some(rx) => stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed(),
            None => stream::once(async { Ok(WatchEvent::Reset(Vec::new())) })
                .chain(stream::pending())
                .boxed(),
        };
        Ok(events)
    }

    async fn create(
        &self,
        _gvr: &Gvr,
        _namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, DaoError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(object.clone())
    }

    async fn patch(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
        kind: PatchKind,
        body: &Value,
    ) -> Result<DynamicObject, DaoError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        let target = format!("{}:{}/{}", gvr, namespace.unwrap_or_default(), name);
        self.patches.lock().unwrap().push((target, kind, body.clone()));
        Ok(object(&gvr.api_version(), "Patched", namespace.unwrap_or_default(), name, "1", json!({})))
    }

    async fn delete(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(), DaoError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let target = format!("{}:{}/{}", gvr, namespace.unwrap_or_default(), name);
        self.deletes.lock().unwrap().push((target, options.clone()));
        Ok(())
    }

    async fn log_stream(
        &self,
        namespace: &str,
        pod: &str,
        params: &PodLogParams,
    ) -> Result<LogLineStream, DaoError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.log_requests
            .lock()
            .unwrap()
            .push_back((format!("{namespace}/{pod}"), params.clone()));

        let plan = self
            .logs
            .lock()
            .unwrap()
            .get(pod)
            .cloned()
            .ok_or_else(|| DaoError::NotFound(format!("pod {namespace}/{pod}")))?;

        let lines = stream::iter(plan.lines.into_iter().map(Ok));
        let stream = match plan.end {
            LogEnd::Close => lines.boxed(),
            LogEnd::Error(msg) => lines
                .chain(stream::once(async move { Err(DaoError::Transport(msg)) }))
                .boxed(),
            LogEnd::Hang => lines.chain(stream::pending()).boxed(),
        };
        Ok(stream)
    }

    async fn can_i(&self, namespace: Option<&str>, gvr: &Gvr, verbs: &[Verb]) -> Result<bool, DaoError> {
        self.can_i_calls.fetch_add(1, Ordering::SeqCst);
        self.reviews
            .lock()
            .unwrap()
            .push((namespace.map(str::to_string), gvr.to_string(), verbs.to_vec()));
        Ok(!self.denied.load(Ordering::SeqCst))
    }
}

/// Build a cached object the way the API server would send it.
pub fn object(api_version: &str, kind: &str, namespace: &str, name: &str, resource_version: &str, body: Value) -> DynamicObject {
    let mut raw = json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": {
            "name": name,
            "resourceVersion": resource_version,
        },
    });
    if !namespace.is_empty() {
        raw["metadata"]["namespace"] = json!(namespace);
    }
    if let (Some(target), Value::Object(fields)) = (raw.as_object_mut(), body) {
        for (k, v) in fields {
            if k == "metadata" {
                if let (Some(meta), Value::Object(extra)) = (target.get_mut("metadata").and_then(Value::as_object_mut), v) {
                    meta.extend(extra);
                }
            } else {
                target.insert(k, v);
            }
        }
    }
    serde_json::from_value(raw).expect("valid dynamic object")
}

pub fn pod(namespace: &str, name: &str, labels: Value, containers: &[&str]) -> DynamicObject {
    let containers: Vec<Value> = containers
        .iter()
        .map(|c| json!({ "name": c, "image": "busybox" }))
        .collect();
    object(
        "v1",
        "Pod",
        namespace,
        name,
        "1",
        json!({
            "metadata": { "labels": labels },
            "spec": { "containers": containers },
        }),
    )
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

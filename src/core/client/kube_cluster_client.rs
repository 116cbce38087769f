use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use futures::{future, stream, AsyncBufReadExt, StreamExt};
use kube::api::{Api, DeleteParams, LogParams, Patch, PatchParams, PostParams};
use kube::core::GroupVersion;
use kube::discovery::{self, ApiCapabilities, ApiResource, Scope};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::core::client::cluster_client::{
    ClusterClient, DeleteOptions, LogLineStream, PatchKind, PodLogParams, Verb, WatchEvent, WatchStream,
};
use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{
    DynamicObject, Pod, ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use crate::errors::{transport_error, DaoError};

/// Lines buffered between the log reader task and its consumer.
const LOG_LINE_BUFFER: usize = 64;

/// [`ClusterClient`] backed by a live `kube::Client`.
///
/// Every kind is handled as a `DynamicObject`; the `ApiResource` for a GVR is
/// discovered once and cached.
pub struct KubeClusterClient {
    client: Client,
    resources: RwLock<HashMap<Gvr, (ApiResource, ApiCapabilities)>>,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: RwLock::new(HashMap::new()),
        }
    }

    async fn resolve(&self, gvr: &Gvr) -> Result<(ApiResource, ApiCapabilities), DaoError> {
        if let Some(hit) = self.resources.read().await.get(gvr) {
            return Ok(hit.clone());
        }

        let gv = GroupVersion::gv(gvr.group(), gvr.version());
        let group = discovery::oneshot::pinned_group(&self.client, &gv).await?;
        let found = group
            .versioned_resources(gvr.version())
            .into_iter()
            .find(|(ar, _)| ar.plural == gvr.resource())
            .ok_or_else(|| DaoError::NotFound(format!("resource kind {gvr}")))?;

        debug!(gvr = %gvr, kind = %found.0.kind, "Discovered API resource");
        self.resources.write().await.insert(gvr.clone(), found.clone());
        Ok(found)
    }

    async fn api(&self, gvr: &Gvr, namespace: Option<&str>) -> Result<Api<DynamicObject>, DaoError> {
        let (ar, caps) = self.resolve(gvr).await?;
        let api = match (&caps.scope, namespace) {
            (Scope::Namespaced, Some(ns)) if !ns.is_empty() => {
                Api::namespaced_with(self.client.clone(), ns, &ar)
            }
            _ => Api::all_with(self.client.clone(), &ar),
        };
        Ok(api)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn watch(&self, gvr: &Gvr, namespace: Option<&str>) -> Result<WatchStream, DaoError> {
        let api = self.api(gvr, namespace).await?;

        // The runtime watcher delivers the initial listing as Init/InitApply/InitDone;
        // fold it into a single Reset so the cache swaps it in atomically.
        let events = watcher(api, watcher::Config::default())
            .modify(slim)
            .scan(Vec::new(), |buffer, event| {
                let out = match event {
                    Ok(watcher::Event::Init) => {
                        buffer.clear();
                        None
                    }
                    Ok(watcher::Event::InitApply(obj)) => {
                        buffer.push(obj);
                        None
                    }
                    Ok(watcher::Event::InitDone) => Some(Ok(WatchEvent::Reset(std::mem::take(buffer)))),
                    Ok(watcher::Event::Apply(obj)) => Some(Ok(WatchEvent::Applied(obj))),
                    Ok(watcher::Event::Delete(obj)) => Some(Ok(WatchEvent::Deleted(obj))),
                    Err(err) => Some(Err(transport_error(err))),
                };
                future::ready(Some(out))
            })
            .filter_map(future::ready)
            .boxed();

        Ok(events)
    }

    async fn create(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, DaoError> {
        let api = self.api(gvr, namespace).await?;
        Ok(api.create(&PostParams::default(), object).await?)
    }

    async fn patch(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
        kind: PatchKind,
        body: &Value,
    ) -> Result<DynamicObject, DaoError> {
        let api = self.api(gvr, namespace).await?;
        let patch = match kind {
            PatchKind::Merge => Patch::Merge(body),
            PatchKind::Strategic => Patch::Strategic(body),
        };
        Ok(api.patch(name, &PatchParams::default(), &patch).await?)
    }

    async fn delete(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(), DaoError> {
        let api = self.api(gvr, namespace).await?;
        let params = DeleteParams {
            propagation_policy: options.propagation.map(Into::into),
            grace_period_seconds: options.grace_period_seconds,
            ..Default::default()
        };
        api.delete(name, &params).await?;
        Ok(())
    }

    async fn log_stream(
        &self,
        namespace: &str,
        pod: &str,
        params: &PodLogParams,
    ) -> Result<LogLineStream, DaoError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pod.to_string();
        let log_params = to_log_params(params);
        let (tx, rx) = mpsc::channel::<Result<String, DaoError>>(LOG_LINE_BUFFER);

        // The reader owns the HTTP body; it exits when the consumer goes away.
        tokio::spawn(async move {
            let reader = match pods.log_stream(&pod, &log_params).await {
                Ok(reader) => reader,
                Err(err) => {
                    let _ = tx.send(Err(DaoError::from(err))).await;
                    return;
                }
            };
            let mut lines = Box::pin(reader.lines());
            loop {
                let next = tokio::select! {
                    _ = tx.closed() => break,
                    next = lines.next() => next,
                };
                let Some(line) = next else { break };
                let failed = line.is_err();
                if tx.send(line.map_err(transport_error)).await.is_err() || failed {
                    break;
                }
            }
            debug!(pod = %pod, "Log reader finished");
        });

        let lines = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
        Ok(lines.boxed())
    }

    async fn can_i(&self, namespace: Option<&str>, gvr: &Gvr, verbs: &[Verb]) -> Result<bool, DaoError> {
        let api: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());

        for verb in verbs {
            let review = SelfSubjectAccessReview {
                spec: SelfSubjectAccessReviewSpec {
                    resource_attributes: Some(ResourceAttributes {
                        namespace: namespace.map(str::to_string),
                        group: Some(gvr.group().to_string()),
                        version: Some(gvr.version().to_string()),
                        resource: Some(gvr.resource().to_string()),
                        verb: Some(verb.as_str().to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            };

            let response = api.create(&PostParams::default(), &review).await?;
            let allowed = response.status.map(|s| s.allowed).unwrap_or(false);
            if !allowed {
                warn!(gvr = %gvr, verb = %verb, namespace = ?namespace, "Access review denied");
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Drop server-side bookkeeping the dashboard never reads before it is cached.
fn slim(object: &mut DynamicObject) {
    object.managed_fields_mut().clear();
}

fn to_log_params(params: &PodLogParams) -> LogParams {
    // An absolute start time is sent as a relative window.
    let since_seconds = params.since_seconds.or_else(|| {
        params
            .since_time
            .map(|t| (Utc::now() - t).num_seconds().max(1))
    });

    LogParams {
        container: params.container.clone(),
        follow: params.follow,
        previous: params.previous,
        timestamps: params.timestamps,
        since_seconds,
        tail_lines: params.tail_lines,
        ..Default::default()
    }
}

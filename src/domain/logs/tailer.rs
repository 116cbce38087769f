use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::client::cluster_client::{ClusterClient, PodLogParams};
use crate::core::client::gvr::{fqn, Gvr};
use crate::core::client::kube_resources::Pod;
use crate::core::client::selector::LabelSelector;
use crate::core::watch::Factory;
use crate::domain::dao::resource::decode;
use crate::domain::logs::log_item::{LogEvent, LogItem, LogSink};
use crate::domain::logs::log_options::LogOptions;
use crate::errors::DaoError;

/// Pod and the containers to tail in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailTarget {
    pub namespace: String,
    pub pod: String,
    pub containers: Vec<String>,
}

impl TailTarget {
    /// Tail `container` if given, otherwise every container in the pod spec.
    pub fn from_pod(pod: &Pod, container: Option<&str>) -> Result<Self, DaoError> {
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| DaoError::Decode("pod without a name".into()))?;
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();

        let containers = match container {
            Some(c) => vec![c.to_string()],
            None => pod
                .spec
                .as_ref()
                .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
                .unwrap_or_default(),
        };
        if containers.is_empty() {
            return Err(DaoError::NotFound(format!("no containers in pod {}", fqn(&namespace, &name))));
        }

        Ok(Self {
            namespace,
            pod: name,
            containers,
        })
    }

    pub fn fqn(&self) -> String {
        fqn(&self.namespace, &self.pod)
    }
}

/// Running tail: one worker per pod container.
///
/// Dropping the handle aborts every worker.
#[derive(Debug)]
pub struct TailHandle {
    id: Uuid,
    pods: Vec<String>,
    multi_pods: bool,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl TailHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Pods tailed, as `namespace/name`.
    pub fn pods(&self) -> &[String] {
        &self.pods
    }

    pub fn multi_pods(&self) -> bool {
        self.multi_pods
    }

    /// Stop every worker; each exits at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for every worker to exit.
    pub async fn join(mut self) {
        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = res {
                if e.is_panic() {
                    warn!(tail = %self.id, "Log worker panicked");
                }
            }
        }
        debug!(tail = %self.id, "Tail finished");
    }
}

/// Start one worker per container of every target, all writing into `sink`.
///
/// A worker that fails reports a [`LogEvent::Error`] and exits alone; only
/// [`TailHandle::cancel`] (or dropping the receiver) stops the others.
pub fn tail_pods(client: Arc<dyn ClusterClient>, targets: Vec<TailTarget>, options: &LogOptions, sink: LogSink) -> TailHandle {
    let id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let multi_pods = options.multi_pods || targets.len() > 1;
    let mut tasks = JoinSet::new();

    for target in &targets {
        let multi_containers = target.containers.len() > 1;
        for container in &target.containers {
            let worker = ContainerTail {
                client: client.clone(),
                namespace: target.namespace.clone(),
                pod: target.pod.clone(),
                origin: target.fqn(),
                container: container.clone(),
                params: options.to_params(container),
                multi_pods,
                multi_containers,
                sink: sink.clone(),
                cancel: cancel.clone(),
            };
            tasks.spawn(worker.run());
        }
    }

    let pods: Vec<String> = targets.iter().map(TailTarget::fqn).collect();
    info!(tail = %id, pods = pods.len(), streams = tasks.len(), "Tailing logs");

    TailHandle {
        id,
        pods,
        multi_pods,
        cancel,
        tasks,
    }
}

/// Tail the pods currently matching `selector`.
///
/// The pod set is resolved once from the cache; pods created afterwards are
/// not picked up. `owner` names the resource in a `NoSelector` error.
pub async fn tail_selected(
    factory: &Factory,
    namespace: Option<&str>,
    selector: &LabelSelector,
    owner: &str,
    mut options: LogOptions,
    sink: LogSink,
) -> Result<TailHandle, DaoError> {
    let selector = selector.clone().require_non_empty(owner)?;

    let pods_gvr = Gvr::pods();
    factory
        .wait_synced(&pods_gvr, namespace, factory.config().sync_timeout)
        .await?;

    let mut pods = factory.list(&pods_gvr, namespace, &selector);
    if pods.is_empty() {
        return Err(DaoError::NotFound(format!("no pods match {selector} for {owner}")));
    }
    pods.sort_by_key(|p| {
        fqn(
            p.metadata.namespace.as_deref().unwrap_or_default(),
            p.metadata.name.as_deref().unwrap_or_default(),
        )
    });

    let targets = pods
        .iter()
        .map(|p| decode::<Pod>(p).and_then(|pod| TailTarget::from_pod(&pod, options.container.as_deref())))
        .collect::<Result<Vec<_>, _>>()?;

    options.multi_pods = targets.len() > 1;
    Ok(tail_pods(factory.client().clone(), targets, &options, sink))
}

struct ContainerTail {
    client: Arc<dyn ClusterClient>,
    namespace: String,
    pod: String,
    origin: String,
    container: String,
    params: PodLogParams,
    multi_pods: bool,
    multi_containers: bool,
    sink: LogSink,
    cancel: CancellationToken,
}

impl ContainerTail {
    async fn run(self) {
        let opened = tokio::select! {
            _ = self.cancel.cancelled() => return,
            opened = self.client.log_stream(&self.namespace, &self.pod, &self.params) => opened,
        };
        let mut lines = match opened {
            Ok(lines) => lines,
            Err(error) => return self.fail(error).await,
        };

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return,
                next = lines.next() => next,
            };
            match next {
                Some(Ok(line)) => {
                    let item = LogItem {
                        pod: self.origin.clone(),
                        container: self.container.clone(),
                        line,
                        multi_pods: self.multi_pods,
                        multi_containers: self.multi_containers,
                    };
                    if !self.emit(LogEvent::Line(item)).await {
                        return;
                    }
                }
                Some(Err(error)) => return self.fail(error).await,
                None => {
                    debug!(pod = %self.origin, container = %self.container, "Log stream ended");
                    let done = LogEvent::Done {
                        pod: self.origin.clone(),
                        container: self.container.clone(),
                    };
                    self.emit(done).await;
                    return;
                }
            }
        }
    }

    async fn fail(&self, error: DaoError) {
        warn!(pod = %self.origin, container = %self.container, error = %error, "Log stream failed");
        let event = LogEvent::Error {
            pod: self.origin.clone(),
            container: self.container.clone(),
            error,
        };
        self.emit(event).await;
    }

    /// Blocks while the sink is full. False once the tail is over.
    async fn emit(&self, event: LogEvent) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.sink.send(event) => sent.is_ok(),
        }
    }
}

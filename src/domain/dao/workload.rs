use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::core::client::cluster_client::{DeleteOptions, PatchKind, Payload, Propagation, Verb};
use crate::core::client::gvr::{fqn, namespaced, Gvr, Rid};
use crate::core::client::kube_resources::{DynamicObject, ObjectMeta};
use crate::core::client::selector::LabelSelector;
use crate::core::watch::Factory;
use crate::domain::auth::ensure_authorized;
use crate::domain::dao::accessor::{Accessor, Capabilities, Controller, Loggable, Nuker, Restartable};
use crate::domain::dao::resource::{decode, Resource};
use crate::domain::dao::restart::{restart_patch, Clock};
use crate::domain::logs::{tail_selected, LogOptions, LogSink, TailHandle};
use crate::errors::DaoError;

/// Kind-specific knowledge for a pod-owning workload.
pub trait WorkloadKind: k8s_openapi::Resource + DeserializeOwned + Send + Sync + 'static {
    /// Lower-case kind used in user-facing messages.
    const LABEL: &'static str;
    const CAPABILITIES: Capabilities;

    fn gvr() -> Gvr;

    fn meta(&self) -> &ObjectMeta;

    /// Pod selector; empty when the object defines none.
    fn selector(&self) -> LabelSelector;

    /// Patch that makes the controller recreate its pods.
    fn restart_patch(&self, at: DateTime<Utc>) -> Result<Value, DaoError> {
        Ok(restart_patch(at))
    }
}

/// Rollout health of a workload.
pub trait Health {
    fn is_happy(&self) -> bool;
}

/// Accessor for any [`WorkloadKind`].
pub struct Workload<K> {
    resource: Resource,
    clock: Clock,
    _kind: PhantomData<fn() -> K>,
}

impl<K: WorkloadKind> Workload<K> {
    pub fn new(factory: Arc<Factory>, clock: Clock) -> Self {
        Self {
            resource: Resource::new(K::gvr(), K::CAPABILITIES, factory),
            clock,
            _kind: PhantomData,
        }
    }

    /// Typed object from the cache, waiting for the first listing if needed.
    pub async fn get_instance(&self, fqn: &str) -> Result<K, DaoError> {
        let object = self.resource.fetch(fqn).await?;
        decode(&object)
    }

    fn owner(&self, fqn: &str) -> String {
        format!("{} {fqn}", K::LABEL)
    }

    fn require(&self, capability: Capabilities, fqn: &str) -> Result<(), DaoError> {
        if !K::CAPABILITIES.contains(capability) {
            return Err(DaoError::Invalid(format!("{} does not support {capability}", self.owner(fqn))));
        }
        Ok(())
    }

    async fn selected(&self, fqn: &str) -> Result<(K, LabelSelector), DaoError> {
        let object = self.get_instance(fqn).await?;
        let selector = object.selector().require_non_empty(&self.owner(fqn))?;
        Ok((object, selector))
    }

    async fn selected_pods(&self, path: &str) -> Result<Vec<String>, DaoError> {
        let (object, selector) = self.selected(path).await?;
        let namespace = object.meta().namespace.as_deref();
        let factory = self.resource.factory();
        let pods = Gvr::pods();
        factory.wait_synced(&pods, namespace, factory.config().sync_timeout).await?;

        let mut names: Vec<String> = factory
            .list(&pods, namespace, &selector)
            .iter()
            .filter_map(|p| {
                let name = p.metadata.name.as_deref()?;
                Some(fqn(p.metadata.namespace.as_deref().unwrap_or_default(), name))
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl<K: WorkloadKind> Accessor for Workload<K> {
    fn gvr(&self) -> &Gvr {
        self.resource.gvr()
    }

    fn capabilities(&self) -> Capabilities {
        K::CAPABILITIES
    }

    fn get(&self, fqn: &str) -> Result<Arc<DynamicObject>, DaoError> {
        let object = self.resource.get(fqn)?;
        decode::<K>(&object)?;
        Ok(object)
    }

    fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<Arc<DynamicObject>>, DaoError> {
        Ok(self.resource.list(namespace, selector))
    }

    async fn delete(&self, fqn: &str, options: DeleteOptions) -> Result<(), DaoError> {
        self.resource.delete(fqn, options).await
    }

    fn as_deletable(&self) -> Option<&dyn Nuker> {
        K::CAPABILITIES.contains(Capabilities::CASCADE_DELETE).then_some(self as &dyn Nuker)
    }

    fn as_restartable(&self) -> Option<&dyn Restartable> {
        K::CAPABILITIES.contains(Capabilities::RESTART).then_some(self as &dyn Restartable)
    }

    fn as_loggable(&self) -> Option<&dyn Loggable> {
        K::CAPABILITIES.contains(Capabilities::TAIL_LOGS).then_some(self as &dyn Loggable)
    }

    fn as_pod_resolving(&self) -> Option<&dyn Controller> {
        K::CAPABILITIES.contains(Capabilities::RESOLVE_POD).then_some(self as &dyn Controller)
    }
}

#[async_trait]
impl<K: WorkloadKind> Nuker for Workload<K> {
    async fn dependents(&self, fqn: &str) -> Result<Vec<String>, DaoError> {
        self.require(Capabilities::CASCADE_DELETE, fqn)?;
        self.selected_pods(fqn).await
    }

    async fn nuke(&self, fqn: &str, propagation: Propagation, grace_period_seconds: Option<u32>) -> Result<(), DaoError> {
        self.require(Capabilities::CASCADE_DELETE, fqn)?;
        let options = DeleteOptions {
            propagation: Some(propagation),
            grace_period_seconds,
        };
        self.resource.delete(fqn, options).await
    }
}

#[async_trait]
impl<K: WorkloadKind> Restartable for Workload<K> {
    /// Read, check the selector, authorize, build the patch, send it.
    /// Nothing is sent unless every earlier step succeeds.
    async fn restart(&self, fqn: &str) -> Result<(), DaoError> {
        self.require(Capabilities::RESTART, fqn)?;
        let (object, _) = self.selected(fqn).await?;

        let (namespace, name) = namespaced(fqn);
        let gvr = self.resource.gvr();
        let action = format!("restart a {}", K::LABEL);
        ensure_authorized(self.resource.factory(), namespace, gvr, &[Verb::Patch], &action).await?;

        let body = object.restart_patch((self.clock)())?;
        let rid = Rid::with_path(gvr.clone(), fqn);
        self.resource
            .factory()
            .forward(Verb::Patch, &rid, Payload::Patch { kind: PatchKind::Strategic, body })
            .await?;

        info!(kind = K::LABEL, namespace = ?namespace, name, "Rollout restarted");
        Ok(())
    }
}

#[async_trait]
impl<K: WorkloadKind> Loggable for Workload<K> {
    async fn tail_logs(&self, sink: LogSink, options: LogOptions) -> Result<TailHandle, DaoError> {
        self.require(Capabilities::TAIL_LOGS, &options.path)?;
        let owner = self.owner(&options.path);
        let object = self.get_instance(&options.path).await?;
        let namespace = object.meta().namespace.clone();

        tail_selected(
            self.resource.factory(),
            namespace.as_deref(),
            &object.selector(),
            &owner,
            options,
            sink,
        )
        .await
    }
}

#[async_trait]
impl<K: WorkloadKind> Controller for Workload<K> {
    /// First matching pod in name order.
    async fn resolve_pod(&self, fqn: &str) -> Result<String, DaoError> {
        self.require(Capabilities::RESOLVE_POD, fqn)?;
        self.selected_pods(fqn)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DaoError::NotFound(format!("no pods for {}", self.owner(fqn))))
    }
}

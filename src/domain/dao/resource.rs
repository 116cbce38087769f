use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::core::client::cluster_client::{DeleteOptions, Payload, Verb};
use crate::core::client::gvr::{namespaced, Gvr, Rid};
use crate::core::client::kube_resources::DynamicObject;
use crate::core::client::selector::LabelSelector;
use crate::core::watch::Factory;
use crate::domain::auth::ensure_authorized;
use crate::domain::dao::accessor::Capabilities;
use crate::errors::DaoError;

/// Binding of one kind to the shared factory; every accessor embeds one.
#[derive(Clone)]
pub struct Resource {
    gvr: Gvr,
    capabilities: Capabilities,
    factory: Arc<Factory>,
}

impl Resource {
    pub fn new(gvr: Gvr, capabilities: Capabilities, factory: Arc<Factory>) -> Self {
        Self {
            gvr,
            capabilities,
            factory,
        }
    }

    pub fn gvr(&self) -> &Gvr {
        &self.gvr
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    pub fn get(&self, fqn: &str) -> Result<Arc<DynamicObject>, DaoError> {
        self.factory
            .get(&self.gvr, fqn)
            .ok_or_else(|| DaoError::NotFound(format!("{} {fqn}", self.gvr)))
    }

    /// Like [`Resource::get`], but first makes sure the object's scope is
    /// watched and listed.
    pub async fn fetch(&self, fqn: &str) -> Result<Arc<DynamicObject>, DaoError> {
        let (namespace, _) = namespaced(fqn);
        self.factory
            .wait_synced(&self.gvr, namespace, self.factory.config().sync_timeout)
            .await?;
        self.get(fqn)
    }

    pub fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Vec<Arc<DynamicObject>> {
        self.factory.list(&self.gvr, namespace, selector)
    }

    pub async fn delete(&self, fqn: &str, mut options: DeleteOptions) -> Result<(), DaoError> {
        let (namespace, _) = namespaced(fqn);
        let action = format!("delete {}", self.gvr.resource());
        ensure_authorized(&self.factory, namespace, &self.gvr, &[Verb::Delete], &action).await?;

        if !self.capabilities.contains(Capabilities::CASCADE_DELETE) {
            options.propagation = None;
        }

        let rid = Rid::with_path(self.gvr.clone(), fqn);
        self.factory.forward(Verb::Delete, &rid, Payload::Delete(options)).await?;
        info!(rid = %rid, "Deleted");
        Ok(())
    }
}

/// Convert a cached object into `K`, refusing objects of another kind.
pub fn decode<K>(object: &DynamicObject) -> Result<K, DaoError>
where
    K: k8s_openapi::Resource + DeserializeOwned,
{
    if let Some(types) = &object.types {
        if types.kind != K::KIND {
            return Err(DaoError::Decode(format!("expecting {} resource, got {}", K::KIND, types.kind)));
        }
    }
    let value = serde_json::to_value(object)?;
    serde_json::from_value(value).map_err(|e| DaoError::Decode(format!("expecting {} resource: {e}", K::KIND)))
}

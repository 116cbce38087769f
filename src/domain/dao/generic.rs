use std::sync::Arc;

use async_trait::async_trait;

use crate::core::client::cluster_client::DeleteOptions;
use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::DynamicObject;
use crate::core::client::selector::LabelSelector;
use crate::core::watch::Factory;
use crate::domain::dao::accessor::{Accessor, Capabilities};
use crate::domain::dao::resource::Resource;
use crate::errors::DaoError;

/// Baseline-only accessor for every kind without a dedicated one.
pub struct Generic {
    resource: Resource,
}

impl Generic {
    pub fn new(gvr: Gvr, factory: Arc<Factory>) -> Self {
        Self {
            resource: Resource::new(gvr, Capabilities::NONE, factory),
        }
    }
}

#[async_trait]
impl Accessor for Generic {
    fn gvr(&self) -> &Gvr {
        self.resource.gvr()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn get(&self, fqn: &str) -> Result<Arc<DynamicObject>, DaoError> {
        self.resource.get(fqn)
    }

    fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<Arc<DynamicObject>>, DaoError> {
        Ok(self.resource.list(namespace, selector))
    }

    async fn delete(&self, fqn: &str, options: DeleteOptions) -> Result<(), DaoError> {
        self.resource.delete(fqn, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactoryConfig;
    use crate::core::client::cluster_client::Propagation;
    use crate::core::client::fake::FakeCluster;

    #[tokio::test]
    async fn delete_drops_propagation_for_plain_kinds() {
        let fake = FakeCluster::new();
        let factory = Factory::shared(fake.clone(), FactoryConfig::default());
        let accessor = Generic::new(Gvr::new("", "v1", "configmaps"), factory);

        let options = DeleteOptions {
            propagation: Some(Propagation::Orphan),
            grace_period_seconds: Some(10),
        };
        accessor.delete("default/settings", options).await.unwrap();

        let deletes = fake.deletes.lock().unwrap();
        assert_eq!(deletes[0].0, "v1/configmaps:default/settings");
        assert_eq!(deletes[0].1.propagation, None);
        assert_eq!(deletes[0].1.grace_period_seconds, Some(10));
    }

    #[tokio::test]
    async fn denied_delete_is_forbidden() {
        let fake = FakeCluster::new();
        fake.deny_all();
        let accessor = Generic::new(Gvr::new("", "v1", "secrets"), Factory::shared(fake.clone(), FactoryConfig::default()));

        let err = accessor.delete("default/token", DeleteOptions::default()).await.unwrap_err();
        assert!(err.is_forbidden());
        assert_eq!(fake.mutating_calls(), 0);
    }

    #[test]
    fn offers_no_capabilities() {
        let accessor = Generic::new(Gvr::new("", "v1", "services"), Factory::shared(FakeCluster::new(), FactoryConfig::default()));
        assert!(accessor.capabilities().is_empty());
        assert!(accessor.as_deletable().is_none());
        assert!(accessor.as_restartable().is_none());
        assert!(accessor.as_loggable().is_none());
        assert!(accessor.as_pod_resolving().is_none());
        assert!(accessor.list(None, &LabelSelector::everything()).unwrap().is_empty());
    }
}

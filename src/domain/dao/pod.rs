use std::sync::Arc;

use async_trait::async_trait;

use crate::core::client::cluster_client::{DeleteOptions, Propagation};
use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{DynamicObject, Pod};
use crate::core::client::selector::LabelSelector;
use crate::core::watch::Factory;
use crate::domain::dao::accessor::{Accessor, Capabilities, Loggable, Nuker};
use crate::domain::dao::resource::{decode, Resource};
use crate::domain::logs::{tail_pods, LogOptions, LogSink, TailHandle, TailTarget};
use crate::errors::DaoError;

pub const POD_CAPABILITIES: Capabilities = Capabilities::CASCADE_DELETE.union(Capabilities::TAIL_LOGS);

pub struct PodAccessor {
    resource: Resource,
}

impl PodAccessor {
    pub fn new(factory: Arc<Factory>) -> Self {
        Self {
            resource: Resource::new(Gvr::pods(), POD_CAPABILITIES, factory),
        }
    }

    pub async fn get_instance(&self, fqn: &str) -> Result<Pod, DaoError> {
        let object = self.resource.fetch(fqn).await?;
        decode(&object)
    }
}

#[async_trait]
impl Accessor for PodAccessor {
    fn gvr(&self) -> &Gvr {
        self.resource.gvr()
    }

    fn capabilities(&self) -> Capabilities {
        POD_CAPABILITIES
    }

    fn get(&self, fqn: &str) -> Result<Arc<DynamicObject>, DaoError> {
        let object = self.resource.get(fqn)?;
        decode::<Pod>(&object)?;
        Ok(object)
    }

    fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<Arc<DynamicObject>>, DaoError> {
        Ok(self.resource.list(namespace, selector))
    }

    async fn delete(&self, fqn: &str, options: DeleteOptions) -> Result<(), DaoError> {
        self.resource.delete(fqn, options).await
    }

    fn as_deletable(&self) -> Option<&dyn Nuker> {
        Some(self)
    }

    fn as_loggable(&self) -> Option<&dyn Loggable> {
        Some(self)
    }
}

#[async_trait]
impl Nuker for PodAccessor {
    /// A pod only takes itself down.
    async fn dependents(&self, fqn: &str) -> Result<Vec<String>, DaoError> {
        self.get_instance(fqn).await?;
        Ok(vec![fqn.to_string()])
    }

    async fn nuke(&self, fqn: &str, propagation: Propagation, grace_period_seconds: Option<u32>) -> Result<(), DaoError> {
        let options = DeleteOptions {
            propagation: Some(propagation),
            grace_period_seconds,
        };
        self.resource.delete(fqn, options).await
    }
}

#[async_trait]
impl Loggable for PodAccessor {
    async fn tail_logs(&self, sink: LogSink, options: LogOptions) -> Result<TailHandle, DaoError> {
        let pod = self.get_instance(&options.path).await?;
        let target = TailTarget::from_pod(&pod, options.container.as_deref())?;
        Ok(tail_pods(self.resource.factory().client().clone(), vec![target], &options, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FactoryConfig, LogConfig};
    use crate::core::client::fake::{object, pod, FakeCluster, LogEnd};
    use crate::domain::logs::{log_channel, LogEvent};
    use serde_json::json;

    #[tokio::test]
    async fn tails_only_the_requested_container() {
        let fake = FakeCluster::new();
        let _feed = fake.seed(
            &Gvr::pods(),
            Some("default"),
            vec![pod("default", "web-1", json!({ "app": "web" }), &["nginx", "envoy"])],
        );
        fake.script_logs("web-1", &["hello"], LogEnd::Close);
        let factory = Factory::shared(fake.clone(), FactoryConfig::default());
        let accessor = PodAccessor::new(factory.clone());

        let (sink, mut rx) = log_channel(4);
        let options = LogOptions::new("default/web-1", &LogConfig::default()).with_container("envoy");
        let handle = accessor.tail_logs(sink, options).await.unwrap();
        assert!(!handle.multi_pods());
        handle.join().await;

        match rx.recv().await.unwrap() {
            LogEvent::Line(item) => {
                assert_eq!(item.container, "envoy");
                assert_eq!(item.to_string(), "hello");
            }
            other => panic!("unexpected {other:?}"),
        }
        let requests = fake.log_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "default/web-1");
        drop(requests);
        factory.shutdown().await;
    }

    #[tokio::test]
    async fn foreign_object_in_cache_is_a_decode_error() {
        let fake = FakeCluster::new();
        let _feed = fake.seed(
            &Gvr::pods(),
            Some("default"),
            vec![object("v1", "ConfigMap", "default", "imposter", "1", json!({}))],
        );
        let factory = Factory::shared(fake.clone(), FactoryConfig::default());
        factory.wait_synced(&Gvr::pods(), Some("default"), std::time::Duration::from_secs(2)).await.unwrap();
        let accessor = PodAccessor::new(factory.clone());

        assert!(matches!(accessor.get("default/imposter"), Err(DaoError::Decode(_))));
        assert!(accessor.get("default/missing").unwrap_err().is_not_found());
        factory.shutdown().await;
    }

    #[test]
    fn pods_cannot_restart_or_resolve() {
        let accessor = PodAccessor::new(Factory::shared(FakeCluster::new(), FactoryConfig::default()));
        assert!(accessor.as_restartable().is_none());
        assert!(accessor.as_pod_resolving().is_none());
        assert!(accessor.as_loggable().is_some());
    }
}

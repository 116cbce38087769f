use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{Deployment, ObjectMeta};
use crate::core::client::selector::LabelSelector;
use crate::domain::dao::accessor::Capabilities;
use crate::domain::dao::restart::restart_patch;
use crate::domain::dao::workload::{Health, Workload, WorkloadKind};
use crate::errors::DaoError;

pub type DeploymentAccessor = Workload<Deployment>;

impl WorkloadKind for Deployment {
    const LABEL: &'static str = "deployment";
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn gvr() -> Gvr {
        Gvr::new("apps", "v1", "deployments")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn selector(&self) -> LabelSelector {
        LabelSelector::from_match_labels(self.spec.as_ref().map(|s| &s.selector))
    }

    /// A paused rollout would swallow the template change.
    fn restart_patch(&self, at: DateTime<Utc>) -> Result<Value, DaoError> {
        if self.spec.as_ref().and_then(|s| s.paused).unwrap_or(false) {
            return Err(DaoError::Invalid(
                "can't restart paused deployment (run rollout resume first)".into(),
            ));
        }
        Ok(restart_patch(at))
    }
}

impl Health for Deployment {
    fn is_happy(&self) -> bool {
        self.status
            .as_ref()
            .map(|s| s.replicas.unwrap_or(0) == s.available_replicas.unwrap_or(0))
            .unwrap_or(false)
    }
}

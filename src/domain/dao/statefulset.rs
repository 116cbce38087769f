use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{ObjectMeta, StatefulSet};
use crate::core::client::selector::LabelSelector;
use crate::domain::dao::accessor::Capabilities;
use crate::domain::dao::workload::{Health, Workload, WorkloadKind};

pub type StatefulSetAccessor = Workload<StatefulSet>;

impl WorkloadKind for StatefulSet {
    const LABEL: &'static str = "statefulset";
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn gvr() -> Gvr {
        Gvr::new("apps", "v1", "statefulsets")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn selector(&self) -> LabelSelector {
        LabelSelector::from_match_labels(self.spec.as_ref().map(|s| &s.selector))
    }
}

impl Health for StatefulSet {
    fn is_happy(&self) -> bool {
        self.status
            .as_ref()
            .map(|s| s.replicas == s.ready_replicas.unwrap_or(0))
            .unwrap_or(false)
    }
}

use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{ObjectMeta, ReplicaSet};
use crate::core::client::selector::LabelSelector;
use crate::domain::dao::accessor::Capabilities;
use crate::domain::dao::workload::{Workload, WorkloadKind};

/// Replica sets are rolled through their deployment, so no restart here.
pub type ReplicaSetAccessor = Workload<ReplicaSet>;

impl WorkloadKind for ReplicaSet {
    const LABEL: &'static str = "replicaset";
    const CAPABILITIES: Capabilities = Capabilities::CASCADE_DELETE
        .union(Capabilities::TAIL_LOGS)
        .union(Capabilities::RESOLVE_POD);

    fn gvr() -> Gvr {
        Gvr::new("apps", "v1", "replicasets")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn selector(&self) -> LabelSelector {
        LabelSelector::from_match_labels(self.spec.as_ref().map(|s| &s.selector))
    }
}

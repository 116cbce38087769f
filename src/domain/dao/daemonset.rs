use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{DaemonSet, ObjectMeta};
use crate::core::client::selector::LabelSelector;
use crate::domain::dao::accessor::Capabilities;
use crate::domain::dao::workload::{Health, Workload, WorkloadKind};

pub type DaemonSetAccessor = Workload<DaemonSet>;

impl WorkloadKind for DaemonSet {
    const LABEL: &'static str = "daemonset";
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn gvr() -> Gvr {
        Gvr::new("apps", "v1", "daemonsets")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn selector(&self) -> LabelSelector {
        LabelSelector::from_match_labels(self.spec.as_ref().map(|s| &s.selector))
    }
}

impl Health for DaemonSet {
    /// Every node that should run the daemon does.
    fn is_happy(&self) -> bool {
        self.status
            .as_ref()
            .map(|s| s.desired_number_scheduled == s.current_number_scheduled)
            .unwrap_or(false)
    }
}

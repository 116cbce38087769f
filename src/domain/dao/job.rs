use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{Job, ObjectMeta};
use crate::core::client::selector::LabelSelector;
use crate::domain::dao::accessor::Capabilities;
use crate::domain::dao::workload::{Workload, WorkloadKind};

pub type JobAccessor = Workload<Job>;

impl WorkloadKind for Job {
    const LABEL: &'static str = "job";
    const CAPABILITIES: Capabilities = Capabilities::CASCADE_DELETE
        .union(Capabilities::TAIL_LOGS)
        .union(Capabilities::RESOLVE_POD);

    fn gvr() -> Gvr {
        Gvr::new("batch", "v1", "jobs")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn selector(&self) -> LabelSelector {
        LabelSelector::from_match_labels(self.spec.as_ref().and_then(|s| s.selector.as_ref()))
    }
}

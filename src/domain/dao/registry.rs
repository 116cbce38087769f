use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::{DaemonSet, Deployment, Job, ReplicaSet, StatefulSet};
use crate::core::watch::Factory;
use crate::domain::dao::accessor::{Accessor, Capabilities, KindDescriptor};
use crate::domain::dao::generic::Generic;
use crate::domain::dao::pod::{PodAccessor, POD_CAPABILITIES};
use crate::domain::dao::restart::Clock;
use crate::domain::dao::workload::{Workload, WorkloadKind};

/// Hands out one shared accessor per kind, all bound to the same factory.
pub struct AccessorRegistry {
    factory: Arc<Factory>,
    clock: Clock,
    accessors: Mutex<HashMap<Gvr, Arc<dyn Accessor>>>,
}

impl AccessorRegistry {
    pub fn new(factory: Arc<Factory>, clock: Clock) -> Self {
        Self {
            factory,
            clock,
            accessors: Mutex::new(HashMap::new()),
        }
    }

    pub fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    /// Accessor for `gvr`, created on first use.
    pub fn accessor_for(&self, gvr: &Gvr) -> Arc<dyn Accessor> {
        let mut accessors = self.accessors.lock().unwrap_or_else(PoisonError::into_inner);
        accessors
            .entry(gvr.clone())
            .or_insert_with(|| {
                debug!(gvr = %gvr, "Creating accessor");
                self.build(gvr)
            })
            .clone()
    }

    /// Static capability set of a kind; no accessor is created.
    pub fn descriptor(gvr: &Gvr) -> KindDescriptor {
        let capabilities = match Kind::of(gvr) {
            Kind::Pod => POD_CAPABILITIES,
            Kind::Deployment => Deployment::CAPABILITIES,
            Kind::DaemonSet => DaemonSet::CAPABILITIES,
            Kind::StatefulSet => StatefulSet::CAPABILITIES,
            Kind::ReplicaSet => ReplicaSet::CAPABILITIES,
            Kind::Job => Job::CAPABILITIES,
            Kind::Generic => Capabilities::NONE,
        };
        KindDescriptor {
            gvr: gvr.clone(),
            capabilities,
        }
    }

    fn build(&self, gvr: &Gvr) -> Arc<dyn Accessor> {
        let factory = self.factory.clone();
        let clock = self.clock.clone();
        match Kind::of(gvr) {
            Kind::Pod => Arc::new(PodAccessor::new(factory)),
            Kind::Deployment => Arc::new(Workload::<Deployment>::new(factory, clock)),
            Kind::DaemonSet => Arc::new(Workload::<DaemonSet>::new(factory, clock)),
            Kind::StatefulSet => Arc::new(Workload::<StatefulSet>::new(factory, clock)),
            Kind::ReplicaSet => Arc::new(Workload::<ReplicaSet>::new(factory, clock)),
            Kind::Job => Arc::new(Workload::<Job>::new(factory, clock)),
            Kind::Generic => Arc::new(Generic::new(gvr.clone(), factory)),
        }
    }
}

enum Kind {
    Pod,
    Deployment,
    DaemonSet,
    StatefulSet,
    ReplicaSet,
    Job,
    Generic,
}

impl Kind {
    fn of(gvr: &Gvr) -> Self {
        match (gvr.group(), gvr.resource()) {
            ("", "pods") => Kind::Pod,
            ("apps", "deployments") => Kind::Deployment,
            ("apps", "daemonsets") => Kind::DaemonSet,
            ("apps", "statefulsets") => Kind::StatefulSet,
            ("apps", "replicasets") => Kind::ReplicaSet,
            ("batch", "jobs") => Kind::Job,
            _ => Kind::Generic,
        }
    }
}

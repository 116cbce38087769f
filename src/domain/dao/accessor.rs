use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::client::cluster_client::{DeleteOptions, Propagation};
use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::DynamicObject;
use crate::core::client::selector::LabelSelector;
use crate::domain::logs::{LogOptions, LogSink, TailHandle};
use crate::errors::DaoError;

/// Static set of optional capabilities a resource kind supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const CASCADE_DELETE: Self = Self(1);
    pub const RESTART: Self = Self(1 << 1);
    pub const TAIL_LOGS: Self = Self(1 << 2);
    pub const RESOLVE_POD: Self = Self(1 << 3);
    pub const ALL: Self = Self(0b1111);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::CASCADE_DELETE, "cascade-delete"),
            (Self::RESTART, "restart"),
            (Self::TAIL_LOGS, "tail-logs"),
            (Self::RESOLVE_POD, "resolve-pod"),
        ]
        .into_iter()
        .filter(|(cap, _)| self.contains(*cap))
        .map(|(_, name)| name)
        .collect();
        f.write_str(&names.join(","))
    }
}

/// Static description of a resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDescriptor {
    pub gvr: Gvr,
    pub capabilities: Capabilities,
}

/// Baseline contract every resource kind implements.
///
/// Reads are served from the factory cache and never block on the network.
/// Optional capabilities are reached through the `as_*` casts, which return
/// `None` unless the kind declares the capability.
#[async_trait]
pub trait Accessor: Send + Sync {
    fn gvr(&self) -> &Gvr;

    fn capabilities(&self) -> Capabilities;

    /// Cached object by fully qualified name; `NotFound` if absent, `Decode`
    /// if it does not have this kind's shape.
    fn get(&self, fqn: &str) -> Result<Arc<DynamicObject>, DaoError>;

    fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> Result<Vec<Arc<DynamicObject>>, DaoError>;

    /// Authorization-gated delete. Propagation is only honoured by kinds
    /// declaring [`Capabilities::CASCADE_DELETE`].
    async fn delete(&self, fqn: &str, options: DeleteOptions) -> Result<(), DaoError>;

    fn descriptor(&self) -> KindDescriptor {
        KindDescriptor {
            gvr: self.gvr().clone(),
            capabilities: self.capabilities(),
        }
    }

    fn as_deletable(&self) -> Option<&dyn Nuker> {
        None
    }

    fn as_restartable(&self) -> Option<&dyn Restartable> {
        None
    }

    fn as_loggable(&self) -> Option<&dyn Loggable> {
        None
    }

    fn as_pod_resolving(&self) -> Option<&dyn Controller> {
        None
    }
}

/// Delete with cascade.
#[async_trait]
pub trait Nuker: Send + Sync {
    /// Cached pods (as `namespace/name`) a cascading delete would take down.
    async fn dependents(&self, fqn: &str) -> Result<Vec<String>, DaoError>;

    async fn nuke(&self, fqn: &str, propagation: Propagation, grace_period_seconds: Option<u32>) -> Result<(), DaoError>;
}

/// Rollout restart.
#[async_trait]
pub trait Restartable: Send + Sync {
    async fn restart(&self, fqn: &str) -> Result<(), DaoError>;
}

/// Log tailing into a caller-owned sink.
#[async_trait]
pub trait Loggable: Send + Sync {
    async fn tail_logs(&self, sink: LogSink, options: LogOptions) -> Result<TailHandle, DaoError>;
}

/// Pod resolution for single-pod actions.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Name (`namespace/name`) of the representative pod.
    async fn resolve_pod(&self, fqn: &str) -> Result<String, DaoError>;
}

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde_json::Value;

use crate::core::client::gvr::Gvr;
use crate::core::client::kube_resources::DynamicObject;
use crate::errors::DaoError;

/// One step of a watch subscription, in server order.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A complete listing of the scope; replaces whatever was cached.
    Reset(Vec<DynamicObject>),
    Applied(DynamicObject),
    Deleted(DynamicObject),
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent, DaoError>>;
pub type LogLineStream = BoxStream<'static, Result<String, DaoError>>;

/// API verbs used by the access review and by `Factory::forward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Watch,
    Create,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Watch => "watch",
            Verb::Create => "create",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self, Verb::Create | Verb::Patch | Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cascade policy for dependents of a deleted object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Orphan,
    Background,
    Foreground,
}

impl From<Propagation> for kube::api::PropagationPolicy {
    fn from(p: Propagation) -> Self {
        match p {
            Propagation::Orphan => kube::api::PropagationPolicy::Orphan,
            Propagation::Background => kube::api::PropagationPolicy::Background,
            Propagation::Foreground => kube::api::PropagationPolicy::Foreground,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// `None` leaves the choice to the API server.
    pub propagation: Option<Propagation>,
    pub grace_period_seconds: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Merge,
    Strategic,
}

/// Body of a forwarded mutating call.
#[derive(Debug, Clone)]
pub enum Payload {
    Object(DynamicObject),
    Patch { kind: PatchKind, body: Value },
    Delete(DeleteOptions),
}

/// Transport-level log request for a single container stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodLogParams {
    pub container: Option<String>,
    pub follow: bool,
    pub previous: bool,
    pub timestamps: bool,
    pub since_seconds: Option<i64>,
    pub since_time: Option<DateTime<Utc>>,
    pub tail_lines: Option<i64>,
}

/// The cluster API as this crate sees it.
///
/// Implementations must be safe to share between every watch worker and log
/// tail worker in the process.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Open a watch on a scope; `namespace = None` means all namespaces or
    /// cluster scope. The stream starts with a `Reset` listing.
    async fn watch(&self, gvr: &Gvr, namespace: Option<&str>) -> Result<WatchStream, DaoError>;

    async fn create(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject, DaoError>;

    async fn patch(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
        kind: PatchKind,
        body: &Value,
    ) -> Result<DynamicObject, DaoError>;

    async fn delete(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<(), DaoError>;

    async fn log_stream(
        &self,
        namespace: &str,
        pod: &str,
        params: &PodLogParams,
    ) -> Result<LogLineStream, DaoError>;

    /// Access review: true only if every verb is allowed.
    async fn can_i(&self, namespace: Option<&str>, gvr: &Gvr, verbs: &[Verb]) -> Result<bool, DaoError>;
}

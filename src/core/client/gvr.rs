use std::fmt;

/// Group/version/resource triple identifying a resource kind.
///
/// Rendered as `group/version/resource`, or `version/resource` for the core
/// group (`v1/pods`). The rendering is stable and doubles as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gvr {
    group: String,
    version: String,
    resource: String,
}

impl Gvr {
    pub fn new(group: impl Into<String>, version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// Parse `group/version/resource`, `version/resource` or a bare `resource`.
    pub fn from_path(path: &str) -> Self {
        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            [group, version, resource] => Self::new(*group, *version, *resource),
            [version, resource] => Self::new("", *version, *resource),
            _ => Self::new("", "", path.trim_matches('/')),
        }
    }

    pub fn pods() -> Self {
        Self::new("", "v1", "pods")
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }

    /// `apps/v1` or `v1`
    pub fn api_version(&self) -> String {
        if self.is_core() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Gvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.group.is_empty(), self.version.is_empty()) {
            (false, _) => write!(f, "{}/{}/{}", self.group, self.version, self.resource),
            (true, false) => write!(f, "{}/{}", self.version, self.resource),
            (true, true) => f.write_str(&self.resource),
        }
    }
}

impl From<&str> for Gvr {
    fn from(path: &str) -> Self {
        Self::from_path(path)
    }
}

/// Resource identifier: a kind plus an optional `namespace/name` or bare `name`.
///
/// A RID without a path denotes the kind as a whole (list scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    gvr: Gvr,
    path: Option<String>,
}

impl Rid {
    pub fn new(gvr: Gvr) -> Self {
        Self { gvr, path: None }
    }

    pub fn with_path(gvr: Gvr, path: impl Into<String>) -> Self {
        Self {
            gvr,
            path: Some(path.into()),
        }
    }

    pub fn gvr(&self) -> &Gvr {
        &self.gvr
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.path.as_deref().and_then(|p| namespaced(p).0)
    }

    pub fn name(&self) -> Option<&str> {
        self.path.as_deref().map(|p| namespaced(p).1)
    }

    /// Cache partition key for the scope this RID lives in.
    pub fn cache_key(&self) -> String {
        cache_key(&self.gvr, self.namespace())
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}", self.gvr, path),
            None => write!(f, "{}", self.gvr),
        }
    }
}

/// Stable partition key: `apps/v1/daemonsets@kube-system`, or the bare GVR for
/// an all-namespaces (or cluster-scoped) partition.
pub fn cache_key(gvr: &Gvr, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{gvr}@{ns}"),
        _ => gvr.to_string(),
    }
}

/// Fully qualified name: `namespace/name`, or `name` when the namespace is blank.
pub fn fqn(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    }
}

/// Split a fully qualified name into its namespace and name.
pub fn namespaced(path: &str) -> (Option<&str>, &str) {
    match path.split_once('/') {
        Some((ns, name)) if !ns.is_empty() => (Some(ns), name),
        Some((_, name)) => (None, name),
        None => (None, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gvr_renders_and_parses_the_same_way() {
        let ds = Gvr::from_path("apps/v1/daemonsets");
        assert_eq!(ds.group(), "apps");
        assert_eq!(ds.api_version(), "apps/v1");
        assert_eq!(ds.to_string(), "apps/v1/daemonsets");

        let pods = Gvr::from("v1/pods");
        assert!(pods.is_core());
        assert_eq!(pods, Gvr::pods());
        assert_eq!(pods.to_string(), "v1/pods");
        assert_eq!(pods.api_version(), "v1");
    }

    #[test]
    fn equal_rids_share_a_cache_key() {
        let a = Rid::with_path(Gvr::from("apps/v1/daemonsets"), "kube-system/fluentd");
        let b = Rid::with_path(Gvr::new("apps", "v1", "daemonsets"), "kube-system/fluentd");

        assert_eq!(a, b);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "apps/v1/daemonsets@kube-system");
        assert_eq!(a.namespace(), Some("kube-system"));
        assert_eq!(a.name(), Some("fluentd"));
    }

    #[test]
    fn cluster_scoped_rid_has_no_namespace() {
        let node = Rid::with_path(Gvr::from("v1/nodes"), "worker-1");
        assert_eq!(node.namespace(), None);
        assert_eq!(node.cache_key(), "v1/nodes");
        assert_eq!(node.to_string(), "v1/nodes:worker-1");
    }

    #[test]
    fn fqn_round_trips_through_namespaced() {
        assert_eq!(fqn("default", "nginx"), "default/nginx");
        assert_eq!(fqn("", "worker-1"), "worker-1");
        assert_eq!(namespaced("default/nginx"), (Some("default"), "nginx"));
        assert_eq!(namespaced("worker-1"), (None, "worker-1"));
        assert_eq!(namespaced("/worker-1"), (None, "worker-1"));
    }
}

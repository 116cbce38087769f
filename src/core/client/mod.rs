// Cluster transport seam and value types shared by the cache and accessors
pub mod cluster_client;
pub mod gvr;
pub mod selector;

// Kube-rs based Kubernetes client
pub mod kube_client;
pub mod kube_cluster_client;
pub mod kube_resources;

#[cfg(test)]
pub mod fake;

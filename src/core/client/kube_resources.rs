/// Re-export the Kubernetes resource types the accessors decode into.
/// This module provides a centralized place for all K8s resource types

pub use k8s_openapi::api::core::v1::Pod;

pub use k8s_openapi::api::apps::v1::{
    DaemonSet,
    Deployment,
    ReplicaSet,
    StatefulSet,
};

pub use k8s_openapi::api::batch::v1::Job;

pub use k8s_openapi::api::authorization::v1::{
    ResourceAttributes,
    SelfSubjectAccessReview,
    SelfSubjectAccessReviewSpec,
};

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector as K8sLabelSelector,
    ObjectMeta,
};

pub use kube::api::DynamicObject;

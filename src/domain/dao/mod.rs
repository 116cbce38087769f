// Per-kind accessors over the watch cache, with optional capabilities
pub mod accessor;
pub mod registry;
pub mod resource;
pub mod restart;
pub mod workload;

// Kinds
pub mod daemonset;
pub mod deployment;
pub mod generic;
pub mod job;
pub mod pod;
pub mod replicaset;
pub mod statefulset;

pub use accessor::{Accessor, Capabilities, Controller, KindDescriptor, Loggable, Nuker, Restartable};
pub use registry::AccessorRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LogConfig;
use crate::core::client::cluster_client::PodLogParams;

/// One tail request as the UI describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOptions {
    /// `namespace/name` of the resource being tailed.
    pub path: String,
    /// Restrict to one container; `None` tails every container.
    pub container: Option<String>,
    pub since_seconds: Option<i64>,
    pub since_time: Option<DateTime<Utc>>,
    pub tail_lines: Option<i64>,
    pub previous: bool,
    pub timestamps: bool,
    pub follow: bool,
    /// Set by the aggregator when more than one pod is tailed.
    pub multi_pods: bool,
}

impl LogOptions {
    pub fn new(path: impl Into<String>, config: &LogConfig) -> Self {
        Self {
            path: path.into(),
            container: None,
            since_seconds: None,
            since_time: None,
            tail_lines: Some(config.tail_lines),
            previous: false,
            timestamps: false,
            follow: true,
            multi_pods: false,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Transport parameters for one container stream.
    pub fn to_params(&self, container: &str) -> PodLogParams {
        PodLogParams {
            container: Some(container.to_string()),
            follow: self.follow,
            previous: self.previous,
            timestamps: self.timestamps,
            since_seconds: self.since_seconds,
            since_time: if self.since_seconds.is_some() { None } else { self.since_time },
            tail_lines: self.tail_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_with_configured_tail() {
        let opts = LogOptions::new("default/web", &LogConfig { buffer: 8, tail_lines: 42 });
        let params = opts.to_params("nginx");

        assert!(params.follow);
        assert_eq!(params.tail_lines, Some(42));
        assert_eq!(params.container.as_deref(), Some("nginx"));
    }

    #[test]
    fn since_seconds_shadows_since_time() {
        let mut opts = LogOptions::new("default/web", &LogConfig::default());
        opts.since_seconds = Some(30);
        opts.since_time = Some(Utc::now());

        let params = opts.to_params("nginx");
        assert_eq!(params.since_seconds, Some(30));
        assert_eq!(params.since_time, None);
    }
}

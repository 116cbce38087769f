use std::fmt;

use tokio::sync::mpsc;

use crate::errors::DaoError;

/// One log line and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogItem {
    pub pod: String,
    pub container: String,
    pub line: String,
    /// Several pods feed the same sink; render the origin.
    pub multi_pods: bool,
    /// The pod has several containers in this tail; render the container.
    pub multi_containers: bool,
}

impl fmt::Display for LogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multi_pods {
            write!(f, "{}:{} {}", self.pod, self.container, self.line)
        } else if self.multi_containers {
            write!(f, "{} {}", self.container, self.line)
        } else {
            f.write_str(&self.line)
        }
    }
}

/// What a tail worker pushes into the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Line(LogItem),
    /// One stream failed; its siblings keep going.
    Error {
        pod: String,
        container: String,
        error: DaoError,
    },
    /// One stream ended on its own.
    Done { pod: String, container: String },
}

impl LogEvent {
    pub fn pod(&self) -> &str {
        match self {
            LogEvent::Line(item) => &item.pod,
            LogEvent::Error { pod, .. } | LogEvent::Done { pod, .. } => pod,
        }
    }
}

/// Bounded queue into which every worker of a tail writes.
pub type LogSink = mpsc::Sender<LogEvent>;
pub type LogReceiver = mpsc::Receiver<LogEvent>;

/// Producers wait when `capacity` events are pending.
pub fn log_channel(capacity: usize) -> (LogSink, LogReceiver) {
    mpsc::channel(capacity.max(1))
}

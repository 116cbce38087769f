// Multi-pod log tailing into a bounded sink
pub mod log_item;
pub mod log_options;
pub mod tailer;

pub use log_item::{log_channel, LogEvent, LogItem, LogReceiver, LogSink};
pub use log_options::LogOptions;
pub use tailer::{tail_pods, tail_selected, TailHandle, TailTarget};

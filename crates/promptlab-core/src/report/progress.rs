//! Progress reporting. The runner emits done/total in completion order;
//! the CLI consumes via a sink.

use std::sync::Arc;

/// One progress update: how many trials are done and total count.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

/// Sink for progress events, called once per completed trial.
/// Implementations may throttle.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

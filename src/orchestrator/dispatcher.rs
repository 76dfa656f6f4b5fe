use remarker_common::{WorkerReply, WorkerRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::ChannelError;
use crate::worker::{TargetHandle, WorkerChannel};

/// Sends one `processPost` per target and bounds the wait for the reply.
#[derive(Clone)]
pub struct TaskDispatcher {
    channel: Arc<dyn WorkerChannel>,
}

impl TaskDispatcher {
    pub fn new(channel: Arc<dyn WorkerChannel>) -> Self {
        Self { channel }
    }

    /// Race the worker's reply against `limit`.
    ///
    /// When the timer wins the result is [`WorkerReply::timed_out`]: a success with a
    /// warning, since the worker usually stalls after the comment went out. Channel
    /// errors are returned as-is.
    pub async fn dispatch(
        &self,
        handle: &TargetHandle,
        comment: &str,
        delay_hint: Duration,
        limit: Duration,
    ) -> Result<WorkerReply, ChannelError> {
        let request = WorkerRequest::ProcessPost {
            comment: comment.to_string(),
            delay: delay_hint.as_millis() as u64,
        };
        debug!(url = %handle.url, timeout_ms = limit.as_millis() as u64, "Dispatching to worker");

        match timeout(limit, self.channel.send(handle, request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %handle.url, "Worker did not answer in time, assuming posted");
                Ok(WorkerReply::timed_out())
            }
        }
    }
}

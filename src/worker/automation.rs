use async_trait::async_trait;
use remarker_common::{WorkerReply, WorkerRequest};
use tracing::{debug, warn};

use super::{TargetAutomation, TargetHandle, WorkerChannel};
use crate::errors::ChannelError;

/// Skip message returned when the page already carries the user's comment.
pub const ALREADY_DONE_MESSAGE: &str = "Already commented on this post";

/// Worker that answers `processPost` by driving a [`TargetAutomation`] in-process.
///
/// Automation errors never reach the channel: they come back as
/// `{success: false, error}` replies, the same as a page script reporting failure.
pub struct AutomationWorker<A> {
    automation: A,
}

impl<A: TargetAutomation> AutomationWorker<A> {
    pub fn new(automation: A) -> Self {
        Self { automation }
    }

    async fn process(&self, handle: &TargetHandle, comment: &str, delay_ms: u64) -> WorkerReply {
        match self.automation.detect_already_done(handle).await {
            Ok(true) => {
                debug!(url = %handle.url, "Existing comment detected");
                return WorkerReply::skipped(ALREADY_DONE_MESSAGE);
            }
            Ok(false) => {}
            Err(e) => {
                warn!(url = %handle.url, error = %e, "Already-commented check failed");
                return WorkerReply::failed(e.to_string());
            }
        }

        match self.automation.submit(handle, comment, delay_ms).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(url = %handle.url, error = %e, "Submit failed");
                WorkerReply::failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl<A: TargetAutomation> WorkerChannel for AutomationWorker<A> {
    async fn send(
        &self,
        handle: &TargetHandle,
        request: WorkerRequest,
    ) -> Result<WorkerReply, ChannelError> {
        match request {
            WorkerRequest::ProcessPost { comment, delay } => {
                Ok(self.process(handle, &comment, delay).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AutomationError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAutomation {
        already_done: bool,
        fail_submit: bool,
        submitted: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl TargetAutomation for FakeAutomation {
        async fn detect_already_done(&self, _: &TargetHandle) -> Result<bool, AutomationError> {
            Ok(self.already_done)
        }

        async fn submit(
            &self,
            _: &TargetHandle,
            text: &str,
            delay_hint_ms: u64,
        ) -> Result<WorkerReply, AutomationError> {
            if self.fail_submit {
                return Err(AutomationError::CommandFailed {
                    command: "post".into(),
                    code: 1,
                    message: "Comment box not found".into(),
                });
            }
            self.submitted
                .lock()
                .unwrap()
                .push((text.to_string(), delay_hint_ms));
            Ok(WorkerReply::done())
        }
    }

    fn handle() -> TargetHandle {
        TargetHandle {
            id: 1,
            url: "https://example.com/p/1".into(),
        }
    }

    fn request(comment: &str) -> WorkerRequest {
        WorkerRequest::ProcessPost {
            comment: comment.into(),
            delay: 5000,
        }
    }

    #[tokio::test]
    async fn submits_when_not_already_done() {
        let worker = AutomationWorker::new(FakeAutomation::default());
        let reply = worker.send(&handle(), request("hello")).await.unwrap();
        assert_eq!(reply, WorkerReply::done());
        assert_eq!(
            *worker.automation.submitted.lock().unwrap(),
            vec![("hello".to_string(), 5000)]
        );
    }

    #[tokio::test]
    async fn skips_without_submitting_when_already_done() {
        let worker = AutomationWorker::new(FakeAutomation {
            already_done: true,
            ..Default::default()
        });
        let reply = worker.send(&handle(), request("hello")).await.unwrap();
        assert_eq!(reply, WorkerReply::skipped(ALREADY_DONE_MESSAGE));
        assert!(worker.automation.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn automation_error_becomes_failed_reply() {
        let worker = AutomationWorker::new(FakeAutomation {
            fail_submit: true,
            ..Default::default()
        });
        let reply = worker.send(&handle(), request("hello")).await.unwrap();
        assert!(!reply.success);
        assert_eq!(
            reply.error.as_deref(),
            Some("'post' exited with code 1: Comment box not found")
        );
    }
}

use remarker_common::{Request, Response};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::runner::{Orchestrator, RunEnd};
use crate::errors::RunError;

/// Answers front-end requests and owns the background run loop.
pub struct CommentService {
    orchestrator: Arc<Orchestrator>,
    current: Mutex<Option<JoinHandle<RunEnd>>>,
}

impl CommentService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            current: Mutex::new(None),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Handle one request. Must be called from within a tokio runtime.
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::StartCommenting(start) => match self.orchestrator.start(start) {
                Ok(_) => {
                    self.spawn_loop();
                    Response::ok()
                }
                Err(e) => {
                    warn!(error = %e, "Start rejected");
                    Response::error(e.to_string())
                }
            },
            Request::StopCommenting => match self.orchestrator.stop() {
                Ok(_) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            },
            Request::GetCommentingState => match self.orchestrator.snapshot() {
                Ok(state) => Response::State(Box::new(state)),
                Err(e) => Response::error(e.to_string()),
            },
            Request::GetCommentHistory => match self.orchestrator.history() {
                Ok(history) => Response::History(history),
                Err(e) => Response::error(e.to_string()),
            },
            Request::ClearCommentHistory => match self.orchestrator.clear_history() {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            },
        }
    }

    /// Pick up a run left active by a previous process. Returns whether a loop was
    /// started.
    pub fn resume(&self) -> Result<bool, RunError> {
        if !self.orchestrator.is_resumable()? {
            return Ok(false);
        }
        info!("Resuming stored run");
        self.spawn_loop();
        Ok(true)
    }

    /// Wait for the most recently spawned loop, if any.
    pub async fn wait(&self) -> Option<RunEnd> {
        let handle = self.current.lock().ok()?.take()?;
        handle.await.ok()
    }

    fn spawn_loop(&self) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { orchestrator.run().await });
        match self.current.lock() {
            // A replaced loop keeps running until it notices it was superseded.
            Ok(mut current) => *current = Some(handle),
            Err(_) => warn!("Loop handle lock poisoned; loop runs detached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AutomationError;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::worker::{AutomationWorker, DirectSurface, TargetAutomation, TargetHandle};
    use async_trait::async_trait;
    use remarker_common::{RunState, StartRequest, WorkerReply};

    struct AlwaysPosts;

    #[async_trait]
    impl TargetAutomation for AlwaysPosts {
        async fn detect_already_done(&self, handle: &TargetHandle) -> Result<bool, AutomationError> {
            Ok(handle.url.ends_with("/done"))
        }

        async fn submit(
            &self,
            _: &TargetHandle,
            _: &str,
            _: u64,
        ) -> Result<WorkerReply, AutomationError> {
            Ok(WorkerReply::done())
        }
    }

    fn make_service(store: Arc<dyn KeyValueStore>) -> CommentService {
        let orchestrator = Orchestrator::new(
            store,
            Arc::new(DirectSurface::new()),
            Arc::new(AutomationWorker::new(AlwaysPosts)),
        );
        CommentService::new(Arc::new(orchestrator))
    }

    fn start_payload() -> StartRequest {
        StartRequest {
            targets: vec![
                "https://example.com/p/1".into(),
                "https://example.com/p/done".into(),
            ],
            comment: Some("Nice".into()),
            delay_seconds: Some(2),
            ..Default::default()
        }
    }

    fn start_request() -> Request {
        Request::StartCommenting(start_payload())
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_loop_to_completion() {
        let service = make_service(Arc::new(MemoryStore::new()));
        assert_eq!(service.handle(start_request()), Response::ok());

        let Response::State(state) = service.handle(Request::GetCommentingState) else {
            panic!("Expected state");
        };
        assert!(state.active);

        assert_eq!(service.wait().await, Some(RunEnd::Completed));

        let Response::History(history) = service.handle(Request::GetCommentHistory) else {
            panic!("Expected history");
        };
        assert_eq!(history.successful_urls.len(), 1);
        assert_eq!(history.skipped_urls.len(), 1);
        assert_eq!(
            history.skipped_urls[0].detail,
            crate::worker::ALREADY_DONE_MESSAGE
        );

        assert_eq!(
            service.handle(Request::GetCommentingState),
            Response::State(Box::new(RunState::default()))
        );
    }

    #[tokio::test]
    async fn invalid_start_reports_error() {
        let service = make_service(Arc::new(MemoryStore::new()));
        let response = service.handle(Request::StartCommenting(StartRequest::default()));
        assert_eq!(
            response,
            Response::error("Please enter at least one post URL")
        );
        assert_eq!(service.wait().await, None);
    }

    #[tokio::test]
    async fn stop_and_clear_acknowledge_when_idle() {
        let service = make_service(Arc::new(MemoryStore::new()));
        assert_eq!(service.handle(Request::StopCommenting), Response::ok());
        assert_eq!(service.handle(Request::ClearCommentHistory), Response::ok());
        let Response::History(history) = service.handle(Request::GetCommentHistory) else {
            panic!("Expected history");
        };
        assert!(history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_request_ends_running_loop() {
        let service = make_service(Arc::new(MemoryStore::new()));
        service.handle(start_request());
        assert_eq!(service.handle(Request::StopCommenting), Response::ok());
        assert_eq!(service.wait().await, Some(RunEnd::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_picks_up_stored_run() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        // A previous process persisted the run but never drove it.
        make_service(store.clone())
            .orchestrator()
            .start(start_payload())
            .unwrap();

        let second = make_service(store);
        assert!(second.resume().unwrap());
        assert_eq!(second.wait().await, Some(RunEnd::Completed));
        assert!(!second.resume().unwrap());
    }
}

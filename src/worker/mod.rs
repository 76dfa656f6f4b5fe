//! Ports between the run loop and whatever actually touches the target pages.
//!
//! - [`TargetSurface`] opens (or navigates) the page for one target.
//! - [`WorkerChannel`] carries one [`WorkerRequest`] to the worker bound to that page.
//! - [`TargetAutomation`] is the page-level capability a worker drives.
//!
//! [`AutomationWorker`] adapts any [`TargetAutomation`] into a [`WorkerChannel`], and
//! [`CommandAutomation`] implements the automation with shell commands.

pub mod automation;
pub mod command;

pub use automation::{ALREADY_DONE_MESSAGE, AutomationWorker};
pub use command::CommandAutomation;

use async_trait::async_trait;
use remarker_common::{WorkerReply, WorkerRequest};
use std::sync::Mutex;

use crate::errors::{AutomationError, ChannelError, SurfaceError};

/// A page opened for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHandle {
    pub id: u64,
    pub url: String,
}

#[async_trait]
pub trait TargetSurface: Send + Sync {
    /// Open `url`, reusing an existing page where the surface supports it.
    async fn acquire(&self, url: &str) -> Result<TargetHandle, SurfaceError>;

    /// Fail with [`SurfaceError::Closed`] if the page went away after `acquire`.
    async fn ensure_alive(&self, handle: &TargetHandle) -> Result<(), SurfaceError>;
}

#[async_trait]
pub trait WorkerChannel: Send + Sync {
    /// Deliver `request` and wait for the worker's reply.
    async fn send(
        &self,
        handle: &TargetHandle,
        request: WorkerRequest,
    ) -> Result<WorkerReply, ChannelError>;
}

#[async_trait]
pub trait TargetAutomation: Send + Sync {
    /// Whether the current user already commented on the page.
    async fn detect_already_done(&self, handle: &TargetHandle) -> Result<bool, AutomationError>;

    /// Type and submit `text`; `delay_hint_ms` paces the individual input steps.
    async fn submit(
        &self,
        handle: &TargetHandle,
        text: &str,
        delay_hint_ms: u64,
    ) -> Result<WorkerReply, AutomationError>;
}

/// A surface with one reusable page that is simply pointed at each target URL.
#[derive(Debug, Default)]
pub struct DirectSurface {
    current: Mutex<Option<TargetHandle>>,
}

impl DirectSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetSurface for DirectSurface {
    async fn acquire(&self, url: &str) -> Result<TargetHandle, SurfaceError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SurfaceError::Unavailable {
                url: url.to_string(),
                reason: "not an http(s) URL".to_string(),
            });
        }
        let mut current = self.current.lock().map_err(|_| SurfaceError::Closed)?;
        let id = current.as_ref().map(|h| h.id).unwrap_or(1);
        let handle = TargetHandle {
            id,
            url: url.to_string(),
        };
        *current = Some(handle.clone());
        Ok(handle)
    }

    async fn ensure_alive(&self, handle: &TargetHandle) -> Result<(), SurfaceError> {
        let current = self.current.lock().map_err(|_| SurfaceError::Closed)?;
        match current.as_ref() {
            Some(open) if open.id == handle.id => Ok(()),
            _ => Err(SurfaceError::Closed),
        }
    }
}

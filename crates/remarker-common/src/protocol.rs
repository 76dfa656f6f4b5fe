//! Messages exchanged between front ends, the runner, and workers.
//!
//! Every message is a JSON object discriminated by its `action` field, except
//! [`Response`] and [`WorkerReply`], which are plain reply objects.

use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::state::RunState;

/// Warning attached to a reply synthesized when the worker never answered.
pub const TIMEOUT_WARNING: &str = "Content script timed out but comment was likely posted";

/// Payload of `startCommenting`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(alias = "posts")]
    pub targets: Vec<String>,
    /// Comment used when `multi_comment_mode` is off.
    #[serde(default)]
    pub comment: Option<String>,
    /// Pool used when `multi_comment_mode` is on.
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub multi_comment_mode: bool,
    /// Seconds between targets; the configured default applies when absent.
    #[serde(default, rename = "delay")]
    pub delay_seconds: Option<u64>,
    #[serde(default)]
    pub randomize: bool,
}

/// Front end → runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    StartCommenting(StartRequest),
    StopCommenting,
    GetCommentingState,
    GetCommentHistory,
    ClearCommentHistory,
}

/// Runner → front end, in reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    State(Box<RunState>),
    Ack {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    History(History),
}

impl Response {
    pub fn ok() -> Self {
        Self::Ack {
            success: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Ack {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Runner → front end, unsolicited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Notification {
    CommentProgress {
        /// 1-based position of the processed target.
        current_index: usize,
        total_posts: usize,
        url: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
        used_comment: String,
        success_count: u32,
        skipped_count: u32,
        failed_count: u32,
    },
    CommentSkipped {
        current_index: usize,
        total_posts: usize,
        url: String,
        message: String,
        skipped_count: u32,
    },
    CommentError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        error: String,
        #[serde(default)]
        fatal: bool,
    },
    CommentingComplete {
        message: String,
        success_count: u32,
        skipped_count: u32,
        failed_count: u32,
        #[serde(default)]
        stopped: bool,
    },
}

/// Runner → worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WorkerRequest {
    ProcessPost {
        comment: String,
        /// Pacing hint in milliseconds.
        delay: u64,
    },
}

impl WorkerRequest {
    pub fn comment(&self) -> &str {
        match self {
            Self::ProcessPost { comment, .. } => comment,
        }
    }
}

/// Worker → runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReply {
    pub fn done() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_warning(warning: impl Into<String>) -> Self {
        Self {
            success: true,
            warning: Some(warning.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// The optimistic reply used when the worker does not answer in time.
    pub fn timed_out() -> Self {
        Self::with_warning(TIMEOUT_WARNING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_accepts_front_end_payload() {
        let json = r#"{
            "action": "startCommenting",
            "posts": ["https://example.com/p/1", "https://example.com/p/2"],
            "comments": ["First", "Second"],
            "comment": null,
            "multiCommentMode": true,
            "delay": 7,
            "randomize": true
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let Request::StartCommenting(start) = request else {
            panic!("Expected StartCommenting");
        };
        assert_eq!(start.targets.len(), 2);
        assert_eq!(start.comments, vec!["First", "Second"]);
        assert!(start.multi_comment_mode);
        assert_eq!(start.delay_seconds, Some(7));
        assert!(start.randomize);
    }

    #[test]
    fn unit_requests_parse_from_action_only() {
        let request: Request = serde_json::from_str(r#"{"action":"stopCommenting"}"#).unwrap();
        assert_eq!(request, Request::StopCommenting);
        let request: Request =
            serde_json::from_str(r#"{"action":"getCommentHistory"}"#).unwrap();
        assert_eq!(request, Request::GetCommentHistory);
    }

    #[test]
    fn notification_fields_are_camel_case() {
        let note = Notification::CommentSkipped {
            current_index: 1,
            total_posts: 3,
            url: "https://example.com/p/1".into(),
            message: "already commented".into(),
            skipped_count: 1,
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["action"], "commentSkipped");
        assert_eq!(json["currentIndex"], 1);
        assert_eq!(json["totalPosts"], 3);
        assert_eq!(json["skippedCount"], 1);
    }

    #[test]
    fn worker_reply_omits_unset_fields() {
        let json = serde_json::to_string(&WorkerReply::done()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let reply: WorkerReply = serde_json::from_str(
            r#"{"success":true,"skipped":true,"message":"already commented"}"#,
        )
        .unwrap();
        assert_eq!(reply, WorkerReply::skipped("already commented"));
    }

    #[test]
    fn timed_out_reply_is_a_warning_success() {
        let reply = WorkerReply::timed_out();
        assert!(reply.success);
        assert!(!reply.skipped);
        assert_eq!(reply.warning.as_deref(), Some(TIMEOUT_WARNING));
    }

    #[test]
    fn responses_serialize_to_expected_shapes() {
        assert_eq!(
            serde_json::to_string(&Response::ok()).unwrap(),
            r#"{"success":true}"#
        );
        let json = serde_json::to_value(Response::error("No targets")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No targets");

        let json = serde_json::to_value(Response::State(Box::default())).unwrap();
        assert_eq!(json["active"], false);
    }
}

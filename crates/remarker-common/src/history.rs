//! Outcome history: one record per processed target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a single target ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Skipped,
    Failed,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 3] = [Self::Success, Self::Skipped, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub url: String,
    pub kind: OutcomeKind,
    /// Comment text used, skip reason, or error message depending on `kind`.
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn new(kind: OutcomeKind, url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The three classified sequences, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    #[serde(default)]
    pub successful_urls: Vec<OutcomeRecord>,
    #[serde(default)]
    pub skipped_urls: Vec<OutcomeRecord>,
    #[serde(default)]
    pub failed_urls: Vec<OutcomeRecord>,
}

impl History {
    pub fn entries(&self, kind: OutcomeKind) -> &[OutcomeRecord] {
        match kind {
            OutcomeKind::Success => &self.successful_urls,
            OutcomeKind::Skipped => &self.skipped_urls,
            OutcomeKind::Failed => &self.failed_urls,
        }
    }

    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            successful: self.successful_urls.len(),
            skipped: self.skipped_urls.len(),
            failed: self.failed_urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary().total() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.successful + self.skipped + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_uses_front_end_field_names() {
        let history = History {
            skipped_urls: vec![OutcomeRecord::new(
                OutcomeKind::Skipped,
                "https://example.com/p/1",
                "already commented",
            )],
            ..Default::default()
        };
        let json = serde_json::to_value(&history).unwrap();
        assert!(json["successfulUrls"].as_array().unwrap().is_empty());
        assert_eq!(json["skippedUrls"][0]["kind"], "skipped");
        assert_eq!(json["skippedUrls"][0]["detail"], "already commented");
    }

    #[test]
    fn summary_counts_each_sequence() {
        let mut history = History::default();
        assert!(history.is_empty());
        history
            .failed_urls
            .push(OutcomeRecord::new(OutcomeKind::Failed, "u", "boom"));
        history
            .failed_urls
            .push(OutcomeRecord::new(OutcomeKind::Failed, "u", "boom again"));
        let summary = history.summary();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total(), 2);
        assert_eq!(history.entries(OutcomeKind::Failed).len(), 2);
    }
}

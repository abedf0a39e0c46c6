/// Lifecycle status definitions for queued URLs
///
/// A URL moves `queued -> running -> completed | failed`. The two
/// terminal states are only left again through an explicit rerun, which
/// is modelled as a reset rather than a transition.
use std::fmt;

/// Represents the current lifecycle status of a crawl item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    /// Waiting to be picked up by a worker
    Queued,

    /// A worker is fetching and analyzing the URL
    Running,

    /// Analysis succeeded and results are persisted
    Completed,

    /// Fetch, analysis, or persistence failed
    Failed,
}

impl CrawlStatus {
    /// Returns true if this is a terminal status (no further automatic transition)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if a worker-driven transition from `self` to `to` is legal
    ///
    /// No transition skips `Running`: an item is never marked terminal
    /// without first being marked running. Re-entering `Queued` happens
    /// only via an explicit rerun reset, which is not a transition.
    pub fn can_transition(&self, to: CrawlStatus) -> bool {
        matches!(
            (self, to),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Queued, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

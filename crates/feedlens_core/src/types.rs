use std::fmt;

/// Stable identity of a feed item across mutation batches.
pub type ItemKey = String;

/// A label whose score exceeds this value counts as a match.
pub const NEGATIVE_THRESHOLD: f32 = 0.5;

/// A feed item as seen by one mutation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    pub key: ItemKey,
    pub author: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Per-label scores for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub scores: Vec<LabelScore>,
    pub is_negative: bool,
}

impl Classification {
    /// Builds a classification, deriving `is_negative` from the scores.
    pub fn from_scores(scores: Vec<LabelScore>) -> Self {
        let is_negative = !scores.iter().any(|s| s.score > NEGATIVE_THRESHOLD);
        Self {
            scores,
            is_negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub progress: Option<f32>,
}

impl ProgressEvent {
    pub fn downloading(progress: f32) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            progress: Some(progress),
        }
    }

    pub fn ready() -> Self {
        Self {
            status: ProgressStatus::Ready,
            progress: Some(100.0),
        }
    }

    /// `ready` or a full progress bar ends the loading phase.
    pub fn is_terminal(&self) -> bool {
        self.status == ProgressStatus::Ready || self.progress.is_some_and(|p| p >= 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The worker context did not exist when the request was sent.
    ContextGone,
    /// Any other failure: exhausted delivery, worker-side error, bad payload.
    Other(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ContextGone => write!(f, "worker context gone"),
            FailureKind::Other(message) => write!(f, "{message}"),
        }
    }
}

use serde::{Deserialize, Serialize};

/// A label whose score exceeds this value counts as a match.
pub const NEGATIVE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Downloading,
    Ready,
    Error,
}

/// One step of pipeline initialization, as relayed to the loader overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

impl ProgressEvent {
    pub fn downloading(progress: Option<f32>) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            progress,
        }
    }

    pub fn ready() -> Self {
        Self {
            status: ProgressStatus::Ready,
            progress: Some(100.0),
        }
    }

    pub fn error() -> Self {
        Self {
            status: ProgressStatus::Error,
            progress: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub scores: Vec<LabelScore>,
    pub is_negative: bool,
}

impl ClassificationResult {
    /// `is_negative` holds exactly when no label scores above the threshold.
    pub fn from_scores(scores: Vec<LabelScore>) -> Self {
        let is_negative = !scores.iter().any(|s| s.score > NEGATIVE_THRESHOLD);
        Self {
            scores,
            is_negative,
        }
    }
}

/// User-defined labels, unique and in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for label in labels {
            set.insert(label.into());
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Adds a label; blank or already-present labels are rejected.
    pub fn insert(&mut self, label: String) -> bool {
        let label = label.trim();
        if label.is_empty() || self.contains(label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    pub fn remove(&mut self, label: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l != label);
        self.labels.len() != before
    }
}

impl From<Vec<String>> for LabelSet {
    fn from(labels: Vec<String>) -> Self {
        Self::new(labels)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.labels
    }
}

//! Records exchanged between the page observer and the worker context.

use serde::{Deserialize, Serialize};

use crate::{ClassificationResult, LabelScore, ProgressEvent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "CLASSIFY_POST")]
    ClassifyPost { content: String },
    /// Fire-and-forget, worker to observer.
    #[serde(rename = "SHOW_LOADER")]
    ShowLoader {
        data: ProgressEvent,
        #[serde(
            rename = "modelLoaded",
            default,
            skip_serializing_if = "std::ops::Not::not"
        )]
        model_loaded: bool,
    },
}

/// Answer to `CLASSIFY_POST`. An empty classification means no labels are configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassifyReply {
    Classified {
        classification: Vec<LabelScore>,
        #[serde(rename = "isNegative")]
        is_negative: bool,
    },
    Failed {
        error: String,
    },
}

impl ClassifyReply {
    /// No labels configured goes out as an empty classification that is not negative.
    pub fn from_outcome(outcome: Option<ClassificationResult>) -> Self {
        match outcome {
            Some(result) => ClassifyReply::Classified {
                classification: result.scores,
                is_negative: result.is_negative,
            },
            None => ClassifyReply::Classified {
                classification: Vec::new(),
                is_negative: false,
            },
        }
    }

    /// Back to the coordinator's view: `Ok(None)` when no labels are configured.
    pub fn into_outcome(self) -> Result<Option<ClassificationResult>, String> {
        match self {
            ClassifyReply::Classified { classification, .. } if classification.is_empty() => {
                Ok(None)
            }
            ClassifyReply::Classified { classification, .. } => {
                Ok(Some(ClassificationResult::from_scores(classification)))
            }
            ClassifyReply::Failed { error } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_request_is_tagged() {
        let msg = WireMessage::ClassifyPost {
            content: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "CLASSIFY_POST", "content": "hello"})
        );
    }

    #[test]
    fn show_loader_carries_optional_completion_flag() {
        let parsed: WireMessage = serde_json::from_value(json!({
            "type": "SHOW_LOADER",
            "data": {"status": "downloading", "progress": 30.0}
        }))
        .unwrap();
        assert_eq!(
            parsed,
            WireMessage::ShowLoader {
                data: ProgressEvent::downloading(Some(30.0)),
                model_loaded: false,
            }
        );

        let done = WireMessage::ShowLoader {
            data: ProgressEvent::ready(),
            model_loaded: true,
        };
        assert_eq!(serde_json::to_value(&done).unwrap()["modelLoaded"], json!(true));
    }

    #[test]
    fn reply_variants_decode() {
        let ok: ClassifyReply = serde_json::from_value(json!({
            "classification": [{"label": "spam", "score": 0.7}],
            "isNegative": false
        }))
        .unwrap();
        let outcome = ok.into_outcome().unwrap().unwrap();
        assert!(!outcome.is_negative);

        let failed: ClassifyReply = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(failed.into_outcome(), Err("boom".to_string()));

        let empty = ClassifyReply::from_outcome(None);
        assert_eq!(empty.into_outcome(), Ok(None));
    }

    #[test]
    fn unlabeled_reply_is_not_negative_on_the_wire() {
        let wire = serde_json::to_value(ClassifyReply::from_outcome(None)).unwrap();
        assert_eq!(wire, json!({"classification": [], "isNegative": false}));
    }
}

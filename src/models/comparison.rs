use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::reply::ParsedReply;

/// Body of `POST /compare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// First image, base64 encoded (a data-URL header is allowed)
    pub image1: String,
    /// Second image, base64 encoded (a data-URL header is allowed)
    pub image2: String,
}

/// How a result was obtained from the model reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    /// The reply followed the expected format
    Success,
    /// The score is a fallback because the reply could not be parsed
    Degraded,
}

/// A finished image comparison. Cached by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Similarity in [0, 100]
    pub similarity_score: f64,
    /// Free-text explanation from the model
    pub explanation: String,
    /// Parse outcome
    pub status: ComparisonStatus,
    /// Short human readable summary
    pub message: String,
    /// When the comparison was computed
    pub timestamp: DateTime<Utc>,
    /// Auxiliary data (model name, decoded image info)
    pub data: Option<serde_json::Value>,
}

impl ComparisonResult {
    /// Build a result from a parsed reply
    pub fn from_reply(reply: &ParsedReply, data: Option<serde_json::Value>) -> Self {
        let (status, message) = match reply {
            ParsedReply::Scored { .. } => (
                ComparisonStatus::Success,
                "Images compared successfully".to_string(),
            ),
            ParsedReply::Degraded { failure, .. } => (
                ComparisonStatus::Degraded,
                format!("Model reply was not in the expected format: {}", failure),
            ),
        };

        Self {
            similarity_score: reply.score(),
            explanation: reply.explanation().to_string(),
            status,
            message,
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Whether a result was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache
    Hit,
    /// Freshly computed
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// A comparison result together with its cache status.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// The result
    pub result: ComparisonResult,
    /// Where it came from
    pub cache: CacheStatus,
}

//! Parsing of the model's free-text comparison reply.

use std::fmt;

/// Score used whenever the reply carries no usable number.
pub const DEFAULT_SCORE: f64 = 50.0;

const SCORE_LABEL: &str = "Score:";
const EXPLANATION_LABEL: &str = "Explanation:";
const NO_EXPLANATION: &str = "No explanation provided.";

/// Why a reply could not be turned into a score
#[derive(Clone, Debug, PartialEq)]
pub enum ParseFailure {
    /// No line starts with `Score:`
    MissingScoreLine,
    /// The `Score:` line holds something that is not a number
    InvalidScore(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingScoreLine => f.write_str("Could not parse score."),
            Self::InvalidScore(raw) => write!(f, "Could not parse score value '{}'.", raw),
        }
    }
}

/// Outcome of parsing a reply
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedReply {
    /// The reply followed the expected format
    Scored {
        /// Score clamped to [0, 100]
        score: f64,
        /// Text following the score line
        explanation: String,
    },
    /// The reply was usable only partially; the score fell back to [`DEFAULT_SCORE`]
    Degraded {
        /// Explanation prefixed with a note about the failure
        explanation: String,
        /// What went wrong
        failure: ParseFailure,
    },
}

impl ParsedReply {
    /// The similarity score, always in [0, 100]
    pub fn score(&self) -> f64 {
        match self {
            Self::Scored { score, .. } => *score,
            Self::Degraded { .. } => DEFAULT_SCORE,
        }
    }

    /// The explanation text
    pub fn explanation(&self) -> &str {
        match self {
            Self::Scored { explanation, .. } | Self::Degraded { explanation, .. } => explanation,
        }
    }

    /// True when the score is a fallback
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Parse a reply of the form `Score: <n>` followed by `Explanation: <text>`.
///
/// Never fails: a missing or malformed score degrades to [`DEFAULT_SCORE`].
pub fn parse_reply(reply: &str) -> ParsedReply {
    let lines: Vec<&str> = reply.trim().lines().collect();

    let Some(idx) = lines
        .iter()
        .position(|line| line.trim_start().starts_with(SCORE_LABEL))
    else {
        let failure = ParseFailure::MissingScoreLine;
        return ParsedReply::Degraded {
            explanation: format!("{} {}", failure, reply),
            failure,
        };
    };

    let raw_score = lines[idx]
        .trim_start()
        .trim_start_matches(SCORE_LABEL)
        .trim();
    let explanation = explanation_after(&lines[idx + 1..]);

    match raw_score.parse::<f64>() {
        Ok(score) if !score.is_nan() => ParsedReply::Scored {
            score: score.clamp(0.0, 100.0),
            explanation,
        },
        _ => {
            let failure = ParseFailure::InvalidScore(raw_score.to_string());
            ParsedReply::Degraded {
                explanation: format!("{} {}", failure, explanation),
                failure,
            }
        }
    }
}

fn explanation_after(lines: &[&str]) -> String {
    let text = lines.join("\n").replacen(EXPLANATION_LABEL, "", 1);
    let text = text.trim();
    if text.is_empty() {
        NO_EXPLANATION.to_string()
    } else {
        text.to_string()
    }
}

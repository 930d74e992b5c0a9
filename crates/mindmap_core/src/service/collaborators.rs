//! Seams to the external text, structuring and answering services.
//!
//! Implementations live outside this crate; the document service only sees
//! these traits.

use crate::tree::assembly::OutlineEntry;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Input could not be read or was not a supported document.
    InvalidInput(String),
    /// Collaborator ran but could not produce a usable result.
    Failed(String),
}

impl Display for CollaboratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid collaborator input: {message}"),
            Self::Failed(message) => write!(f, "collaborator failed: {message}"),
        }
    }
}

impl Error for CollaboratorError {}

/// Text extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: u32,
}

/// Extracts text and page count from a stored original.
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText, CollaboratorError>;
}

/// Derives a hierarchical outline from document text.
pub trait OutlineStructurer {
    fn structure(&self, text: &str) -> Result<OutlineEntry, CollaboratorError>;
}

/// Answer with a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub confidence: f64,
}

impl Answer {
    /// Builds an answer, clamping `confidence` into `[0, 1]`. NaN becomes 0.
    pub fn new(answer: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            answer: answer.into(),
            confidence,
        }
    }
}

/// Answers a question against node context.
pub trait QuestionAnswerer {
    fn answer(&self, question: &str, context: &str) -> Result<Answer, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::Answer;

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Answer::new("a", 1.7).confidence, 1.0);
        assert_eq!(Answer::new("a", -0.2).confidence, 0.0);
        assert_eq!(Answer::new("a", f64::NAN).confidence, 0.0);
        assert_eq!(Answer::new("a", 0.4).confidence, 0.4);
    }
}

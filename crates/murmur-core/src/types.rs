//! Core value types shared across the pipeline

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::voice::Voice;

/// Encoded audio for one unit, or for a whole reassembled text.
///
/// Cloning is cheap and never copies the payload.
pub type AudioBlob = Bytes;

/// One contiguous slice of input text, requested as a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit {
    /// Position in the unit sequence; 0 is the preview unit
    pub index: usize,
    pub content: String,
}

impl TextUnit {
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        Self {
            index,
            content: content.into(),
        }
    }

    pub fn is_preview(&self) -> bool {
        self.index == 0
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Input to one synthesis operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub full_text: String,
    #[serde(default)]
    pub voice: Voice,
}

impl SynthesisRequest {
    pub fn new(full_text: impl Into<String>, voice: Voice) -> Self {
        Self {
            full_text: full_text.into(),
            voice,
        }
    }
}

/// A fetched unit waiting for reassembly.
#[derive(Debug, Clone)]
pub struct CompletedUnit {
    pub index: usize,
    pub blob: AudioBlob,
}

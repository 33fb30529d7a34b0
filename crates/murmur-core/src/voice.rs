//! Upstream voice catalogue

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Voices offered by the speech endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl Voice {
    pub fn all() -> &'static [Voice] {
        &[
            Voice::Alloy,
            Voice::Echo,
            Voice::Fable,
            Voice::Onyx,
            Voice::Nova,
            Voice::Shimmer,
        ]
    }

    /// Wire name of the voice
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Voice::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown voice: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Nova".parse::<Voice>().unwrap(), Voice::Nova);
        assert_eq!(" shimmer ".parse::<Voice>().unwrap(), Voice::Shimmer);
        assert!("baritone".parse::<Voice>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Voice::Onyx).unwrap(), "\"onyx\"");
        let voice: Voice = serde_json::from_str("\"fable\"").unwrap();
        assert_eq!(voice, Voice::Fable);
        assert_eq!(Voice::all().len(), 6);
    }
}

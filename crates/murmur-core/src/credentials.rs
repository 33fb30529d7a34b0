//! Credential lookup

use std::collections::HashMap;

/// Source of API keys, keyed by provider name.
pub trait CredentialProvider: Send + Sync {
    fn api_key(&self, provider: &str) -> Option<String>;
}

/// Reads `<PROVIDER>_API_KEY` from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn variable_for(provider: &str) -> String {
        format!("{}_API_KEY", provider.to_ascii_uppercase().replace('-', "_"))
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self, provider: &str) -> Option<String> {
        std::env::var(Self::variable_for(provider))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Fixed key set, for embedding hosts that own their own credential store.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(provider.into(), key.into());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self, provider: &str) -> Option<String> {
        self.keys
            .get(provider)
            .filter(|key| !key.trim().is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        assert_eq!(EnvCredentials::variable_for("openai"), "OPENAI_API_KEY");
        assert_eq!(EnvCredentials::variable_for("my-tts"), "MY_TTS_API_KEY");
    }

    #[test]
    fn test_static_blank_key_is_missing() {
        let creds = StaticCredentials::new()
            .with_key("openai", "sk-test")
            .with_key("blank", "  ");
        assert_eq!(creds.api_key("openai").as_deref(), Some("sk-test"));
        assert_eq!(creds.api_key("blank"), None);
        assert_eq!(creds.api_key("other"), None);
    }
}

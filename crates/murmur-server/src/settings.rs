//! Layered server configuration

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use murmur_core::{ServerConfig, SpeechConfig};
use serde::{Deserialize, Serialize};

/// Base name of the optional config file (`murmur.toml`, `murmur.json`, ...)
const CONFIG_FILE: &str = "murmur";

/// Environment prefix; `MURMUR__SPEECH__MODEL=tts-1-hd` sets `speech.model`
const ENV_PREFIX: &str = "MURMUR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MurmurConfig {
    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl MurmurConfig {
    /// Defaults, then the optional config file, then the environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_builder(
            Config::builder().add_source(File::with_name(CONFIG_FILE).required(false)),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.speech.validate()?;
        Ok(config)
    }
}

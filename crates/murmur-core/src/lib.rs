//! Murmur Core - Low-Latency Chunked Text-to-Speech
//!
//! This crate turns long text into speech through a remote synthesis
//! service while keeping time-to-first-audio short.
//!
//! # Architecture
//!
//! - A short preview unit is split off the front of the text and requested
//!   first, followed by sentence-packed units
//! - Units are fetched through a bounded, self-tuning concurrency window
//! - Every unit goes through a two-tier (memory + disk) content cache
//! - Results are reassembled strictly in index order
//! - Playback starts on the preview and hands off to the full audio at the
//!   preview's natural end, without a gap
//!
//! # Example
//!
//! ```ignore
//! use murmur_core::{EnvCredentials, Pipeline, SpeechConfig, SynthesisRequest, Voice};
//!
//! let pipeline = Pipeline::from_config(&SpeechConfig::default(), Arc::new(EnvCredentials))?;
//! let request = SynthesisRequest::new("Hello there. This is a longer text.", Voice::Nova);
//! let audio = pipeline.synthesize(&request, |preview| play(preview), |_| {}).await?;
//! ```

pub mod cache;
pub mod chunker;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod playback;
pub mod reassembly;
pub mod tuning;
pub mod types;
pub mod voice;

pub use cache::{AudioCache, CacheKey, CacheStats};
pub use chunker::{split_text, Chunker};
pub use config::{ServerConfig, SpeechConfig};
pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use error::{Error, FailureKind, Result};
pub use fetcher::{HttpFetcher, SpeechFetcher};
pub use pipeline::{Pipeline, Synthesized};
pub use playback::{
    Handoff, Lane, LaneStatus, Narrator, NarratorHandle, PlaybackEvent, PlaybackState, Player,
    PlayerFactory, PlayerRole, SessionId,
};
pub use reassembly::Reassembler;
pub use tuning::{TuningController, TuningSnapshot};
pub use types::{AudioBlob, CompletedUnit, SynthesisRequest, TextUnit};
pub use voice::Voice;

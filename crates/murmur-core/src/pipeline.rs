//! Synthesis orchestration.
//!
//! The pipeline splits text into units, resolves them through the cache or
//! the fetcher under a bounded concurrency window, and stitches the results
//! back together in index order. Units are scheduled in ascending index
//! order, so unit 0 is always part of the first batch and `on_first_ready`
//! fires as soon as it resolves.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::cache::{AudioCache, CacheKey};
use crate::chunker::Chunker;
use crate::config::SpeechConfig;
use crate::credentials::CredentialProvider;
use crate::error::{Error, Result};
use crate::fetcher::{HttpFetcher, SpeechFetcher};
use crate::reassembly::Reassembler;
use crate::tuning::TuningController;
use crate::types::{AudioBlob, CompletedUnit, SynthesisRequest, TextUnit};
use crate::voice::Voice;

/// Where a unit's audio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Cache,
    Network,
}

/// Outcome of one synthesis call.
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub audio: AudioBlob,
    /// Units the text was split into for this call
    pub units: usize,
    pub cache_hits: usize,
}

/// Text-to-audio orchestrator.
pub struct Pipeline {
    chunker: Chunker,
    fetcher: Arc<dyn SpeechFetcher>,
    cache: Arc<AudioCache>,
    tuning: Arc<TuningController>,
}

impl Pipeline {
    pub fn new(
        chunker: Chunker,
        fetcher: Arc<dyn SpeechFetcher>,
        cache: Arc<AudioCache>,
        tuning: Arc<TuningController>,
    ) -> Self {
        Self {
            chunker,
            fetcher,
            cache,
            tuning,
        }
    }

    /// Wire up the HTTP fetcher, the two-tier cache and fresh tuning state.
    pub fn from_config(
        config: &SpeechConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let tuning = Arc::new(TuningController::from_config(config));
        let fetcher = Arc::new(HttpFetcher::new(config, credentials, tuning.clone())?);
        let cache = Arc::new(AudioCache::from_config(config));
        let chunker = Chunker::from_config(config, tuning.clone());

        Ok(Self::new(chunker, fetcher, cache, tuning))
    }

    /// Units the chunker would produce for `text` right now.
    pub fn plan(&self, text: &str) -> Vec<TextUnit> {
        self.chunker.split(text)
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    pub fn tuning(&self) -> &TuningController {
        &self.tuning
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Synthesize the full text and return the reassembled audio.
    ///
    /// See [`Pipeline::synthesize_detailed`] for the callback contract.
    pub async fn synthesize<F, P>(
        &self,
        request: &SynthesisRequest,
        on_first_ready: F,
        on_progress: P,
    ) -> Result<AudioBlob>
    where
        F: FnOnce(AudioBlob) + Send,
        P: FnMut(f32) + Send,
    {
        self.synthesize_detailed(request, on_first_ready, on_progress)
            .await
            .map(|done| done.audio)
    }

    /// Synthesize the full text, reporting how it was split.
    ///
    /// `on_first_ready` receives unit 0's audio exactly once, as soon as it
    /// resolves. `on_progress` receives the completed fraction after every
    /// batch. Any unit failure aborts the whole call; in-flight peers are
    /// dropped.
    pub async fn synthesize_detailed<F, P>(
        &self,
        request: &SynthesisRequest,
        on_first_ready: F,
        mut on_progress: P,
    ) -> Result<Synthesized>
    where
        F: FnOnce(AudioBlob) + Send,
        P: FnMut(f32) + Send,
    {
        let units = self.chunker.split(&request.full_text);
        if units.is_empty() {
            return Err(Error::InvalidInput("nothing to synthesize".to_string()));
        }

        let total = units.len();
        let started = Instant::now();
        info!(
            "Synthesizing {} units ({} chars, voice {})",
            total,
            request.full_text.chars().count(),
            request.voice
        );

        let mut reassembler = Reassembler::new(total);
        let mut on_first_ready = Some(on_first_ready);
        let mut cache_hits = 0;
        let mut next = 0;

        while next < total {
            let window = self.tuning.concurrency().max(1);
            let batch_end = (next + window).min(total);
            debug!("Scheduling units {}..{} (window {})", next, batch_end, window);

            let mut in_flight: FuturesUnordered<_> = units[next..batch_end]
                .iter()
                .map(|unit| self.resolve(unit, request.voice))
                .collect();

            while let Some((index, outcome)) = in_flight.next().await {
                let (blob, source) = outcome.map_err(|e| e.at_unit(index))?;
                if source == Source::Cache {
                    cache_hits += 1;
                }
                if index == 0 {
                    if let Some(callback) = on_first_ready.take() {
                        callback(blob.clone());
                    }
                }
                reassembler.accept(CompletedUnit { index, blob })?;
            }

            next = batch_end;
            on_progress(reassembler.accepted() as f32 / total as f32);
        }

        let audio = reassembler.finish()?;
        info!(
            "Synthesized {} units ({} from cache, {} bytes) in {:.2}s",
            total,
            cache_hits,
            audio.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(Synthesized {
            audio,
            units: total,
            cache_hits,
        })
    }

    async fn resolve(&self, unit: &TextUnit, voice: Voice) -> (usize, Result<(AudioBlob, Source)>) {
        let key = CacheKey::new(&unit.content, voice);
        if let Some(blob) = self.cache.get(&key) {
            return (unit.index, Ok((blob, Source::Cache)));
        }

        let outcome = self.fetcher.fetch(unit, voice).await;
        if let Ok(blob) = &outcome {
            self.cache.put(&key, blob.clone());
        }
        (unit.index, outcome.map(|blob| (blob, Source::Network)))
    }
}

//! Adaptive tuning driven by observed request latency.
//!
//! Two controllers share one feedback signal (wall-clock duration of each
//! upstream request):
//! - unit size: larger units when requests are fast, smaller when slow
//! - concurrency: fewer in-flight requests on latency spikes, more when
//!   the service is responsive
//!
//! Both keep a short rolling window so they react to recent conditions only.
//! The controller is an owned value; share it with `Arc` between the
//! chunker, the fetcher and the pipeline.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::SpeechConfig;

const UNIT_MIN_SAMPLES: usize = 3;
const UNIT_FAST_SECS: f64 = 1.0;
const UNIT_SLOW_SECS: f64 = 3.0;

const CONCURRENCY_MIN_SAMPLES: usize = 2;
const CONCURRENCY_SPIKE_FACTOR: f64 = 1.5;
const CONCURRENCY_SPIKE_SECS: f64 = 2.0;
const CONCURRENCY_FAST_SECS: f64 = 1.5;

/// One observed request latency.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceSample {
    pub timestamp: Instant,
    pub duration: Duration,
}

impl PerformanceSample {
    pub fn new(duration: Duration) -> Self {
        Self {
            timestamp: Instant::now(),
            duration,
        }
    }
}

/// Fixed-capacity window of samples, oldest evicted first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    capacity: usize,
    samples: VecDeque<PerformanceSample>,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: PerformanceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean_secs(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(|s| s.duration.as_secs_f64()).sum();
        Some(total / self.samples.len() as f64)
    }

    pub fn latest_secs(&self) -> Option<f64> {
        self.samples.back().map(|s| s.duration.as_secs_f64())
    }
}

/// Tunes the maximum size of non-preview units.
#[derive(Debug, Clone)]
pub struct UnitSizeTuner {
    window: LatencyWindow,
    current: usize,
    min: usize,
    max: usize,
    step: usize,
}

impl UnitSizeTuner {
    pub fn new(initial: usize, min: usize, max: usize, step: usize, window: usize) -> Self {
        Self {
            window: LatencyWindow::new(window),
            current: initial.clamp(min, max),
            min,
            max,
            step,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Record a sample; returns the new size when it changed.
    pub fn record(&mut self, sample: PerformanceSample) -> Option<usize> {
        self.window.push(sample);
        if self.window.len() < UNIT_MIN_SAMPLES {
            return None;
        }

        let mean = self.window.mean_secs()?;
        let next = if mean < UNIT_FAST_SECS {
            (self.current + self.step).min(self.max)
        } else if mean > UNIT_SLOW_SECS {
            self.current.saturating_sub(self.step).max(self.min)
        } else {
            self.current
        };

        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}

/// Tunes the number of in-flight requests.
#[derive(Debug, Clone)]
pub struct ConcurrencyTuner {
    window: LatencyWindow,
    current: usize,
    min: usize,
    max: usize,
}

impl ConcurrencyTuner {
    pub fn new(initial: usize, min: usize, max: usize, window: usize) -> Self {
        Self {
            window: LatencyWindow::new(window),
            current: initial.clamp(min, max),
            min,
            max,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Record a sample; returns the new limit when it changed.
    pub fn record(&mut self, sample: PerformanceSample) -> Option<usize> {
        self.window.push(sample);
        if self.window.len() < CONCURRENCY_MIN_SAMPLES {
            return None;
        }

        let mean = self.window.mean_secs()?;
        let latest = self.window.latest_secs()?;

        let next = if latest > mean * CONCURRENCY_SPIKE_FACTOR && latest > CONCURRENCY_SPIKE_SECS {
            self.current.saturating_sub(1).max(self.min)
        } else if mean < CONCURRENCY_FAST_SECS {
            (self.current + 1).min(self.max)
        } else {
            self.current
        };

        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}

/// Point-in-time view of the tuning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TuningSnapshot {
    pub max_unit_chars: usize,
    pub concurrency: usize,
    pub unit_samples: usize,
    pub concurrency_samples: usize,
}

/// Shared owner of both tuners.
///
/// Writers are serialized per tuner; readers may see a value that is one
/// sample behind.
#[derive(Debug)]
pub struct TuningController {
    unit_size: Mutex<UnitSizeTuner>,
    concurrency: Mutex<ConcurrencyTuner>,
}

impl TuningController {
    pub fn new(unit_size: UnitSizeTuner, concurrency: ConcurrencyTuner) -> Self {
        Self {
            unit_size: Mutex::new(unit_size),
            concurrency: Mutex::new(concurrency),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(
            UnitSizeTuner::new(
                config.unit_chars,
                config.min_unit_chars,
                config.max_unit_chars,
                config.unit_chars_step,
                config.unit_window,
            ),
            ConcurrencyTuner::new(
                config.concurrency,
                config.min_concurrency,
                config.max_concurrency,
                config.concurrency_window,
            ),
        )
    }

    /// Feed one request duration into both tuners.
    pub fn record_latency(&self, duration: Duration) {
        let sample = PerformanceSample::new(duration);

        if let Some(size) = self.unit_size.lock().record(sample) {
            info!("Adjusted max unit size to {} chars", size);
        }
        if let Some(limit) = self.concurrency.lock().record(sample) {
            info!("Adjusted concurrency limit to {}", limit);
        }
    }

    pub fn max_unit_chars(&self) -> usize {
        self.unit_size.lock().current()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.lock().current()
    }

    pub fn snapshot(&self) -> TuningSnapshot {
        let unit_size = self.unit_size.lock();
        let concurrency = self.concurrency.lock();
        TuningSnapshot {
            max_unit_chars: unit_size.current(),
            concurrency: concurrency.current(),
            unit_samples: unit_size.window.len(),
            concurrency_samples: concurrency.window.len(),
        }
    }
}

impl Default for TuningController {
    fn default() -> Self {
        Self::from_config(&SpeechConfig::default())
    }
}

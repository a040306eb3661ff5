//! Configuration for the coalescer and the merge pipeline.
//!
//! [`CoalescerConfig`] is the validated pair of batching limits a
//! [`BatchCoalescer`](crate::core::BatchCoalescer) is built with. [`MergerConfig`]
//! is the service-level settings file, deserialized with serde so that any
//! missing field falls back to its default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Batching limits, fixed for the lifetime of a coalescer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerConfig {
    max_batch_size: usize,
    batch_interval: Duration,
}

impl CoalescerConfig {
    /// Creates a validated configuration.
    ///
    /// # Parameters
    ///
    /// * `max_batch_size` - Number of requests that makes a generation due immediately
    /// * `batch_interval` - How long the first request of a generation may wait
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroBatchSize`] or [`ConfigError::ZeroBatchInterval`]
    /// when either limit is zero.
    pub fn new(max_batch_size: usize, batch_interval: Duration) -> Result<Self, ConfigError> {
        if max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if batch_interval.is_zero() {
            return Err(ConfigError::ZeroBatchInterval);
        }
        Ok(Self {
            max_batch_size,
            batch_interval,
        })
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn batch_interval(&self) -> Duration {
        self.batch_interval
    }
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 30,
            batch_interval: Duration::from_millis(5000),
        }
    }
}

/// Settings for the merge service and its prompt processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    /// Extra latency added to every completion call, for load testing.
    pub artificial_prompt_delay_seconds: f32,

    pub prompt_max_batch_size: usize,
    pub prompt_batch_interval_ms: u64,

    /// How long a built system prompt is reused before sampling new examples.
    pub system_prompt_cache_time_seconds: u64,
    pub system_prompt_example_sample_count: usize,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            artificial_prompt_delay_seconds: 0.0,
            prompt_max_batch_size: 30,
            prompt_batch_interval_ms: 5000,
            system_prompt_cache_time_seconds: 60,
            system_prompt_example_sample_count: 20,
        }
    }
}

impl MergerConfig {
    /// Loads settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The batching limits for the prompt coalescer.
    pub fn coalescer_config(&self) -> Result<CoalescerConfig, ConfigError> {
        CoalescerConfig::new(
            self.prompt_max_batch_size,
            Duration::from_millis(self.prompt_batch_interval_ms),
        )
    }

    pub fn artificial_prompt_delay(&self) -> Option<Duration> {
        if self.artificial_prompt_delay_seconds > 0.0 {
            Some(Duration::from_secs_f32(self.artificial_prompt_delay_seconds))
        } else {
            None
        }
    }

    pub fn system_prompt_cache_time(&self) -> Duration {
        Duration::from_secs(self.system_prompt_cache_time_seconds)
    }
}

//! Configuration types for pipeline execution

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Partitioning and concurrency settings for [`parallel`](crate::executor::parallel)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallelConfig {
    /// Number of contiguous partitions; defaults to the CPU count
    pub chunks: Option<usize>,
    /// Maximum partitions in flight at once; defaults to `chunks`
    pub max_concurrency: Option<usize>,
}

impl ParallelConfig {
    /// Create a new configuration with platform defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of partitions
    pub fn chunks(mut self, chunks: usize) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Set the in-flight limit
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn resolved_chunks(&self) -> usize {
        self.chunks.unwrap_or_else(num_cpus::get)
    }

    pub fn resolved_max_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| self.resolved_chunks())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunks == Some(0) {
            return Err("chunks must be greater than zero".to_string());
        }

        if self.max_concurrency == Some(0) {
            return Err("max_concurrency must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration such as
    /// `{"chunks": 4, "maxConcurrency": 2}`
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let config: ParallelConfig = serde_json::from_str(json)?;
        config.validate().map_err(PipelineError::InvalidConfig)?;
        Ok(config)
    }
}

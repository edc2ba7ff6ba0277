//! Worker pool configuration for the data loader.

use serde::{Deserialize, Serialize};

/// How many threads load and augment samples.
///
/// `num_workers == 0` means every sample is processed on the calling thread,
/// matching the usual data-loader convention.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkerPolicy {
    /// Dedicated loader threads.
    #[serde(default)]
    pub num_workers: usize,
}

impl WorkerPolicy {
    /// Create a policy with the given number of workers.
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers }
    }

    /// Whether batches are loaded in parallel.
    pub fn is_parallel(&self) -> bool {
        self.num_workers > 0
    }

    /// Builds a dedicated rayon pool with `num_workers` threads.
    ///
    /// Unlike the global pool this can be created once per data module, so
    /// several modules in one process do not compete for configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(pool))` when `num_workers > 0`
    /// - `Ok(None)` when loading should stay on the calling thread
    /// - `Err` if rayon fails to spawn the threads
    pub fn build_pool(&self) -> Result<Option<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
        if self.num_workers == 0 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers)
            .thread_name(|i| format!("crnn-loader-{i}"))
            .build()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_has_no_pool() {
        let policy = WorkerPolicy::new(0);
        assert!(!policy.is_parallel());
        assert!(policy.build_pool().unwrap().is_none());
    }

    #[test]
    fn test_pool_has_requested_threads() {
        let pool = WorkerPolicy::new(2).build_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}

//! ONNX Runtime configuration types.

use serde::{Deserialize, Serialize};

/// Execution providers the recognizer can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    #[default]
    CPU,
    /// NVIDIA CUDA execution provider
    CUDA {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
    },
}

/// Session options applied when a recognition model is loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of intra-op threads; `None` lets ONNX Runtime decide.
    pub intra_threads: Option<usize>,
    /// Providers in priority order. Empty means the ONNX Runtime default.
    #[serde(default)]
    pub execution_providers: Vec<OrtExecutionProvider>,
}

impl OrtSessionConfig {
    /// Create a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Set the execution providers.
    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = providers;
        self
    }
}

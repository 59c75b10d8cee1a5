//! The item worker seam: the external capability that answers one item.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use repeatrun_core::ResponseFormat;

/// Errors from a worker invocation.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The invocation itself failed (process error, transport error, ...).
    #[error("Worker invocation failed: {0}")]
    Invocation(String),

    /// The worker replied, but not with a flat JSON object.
    #[error("Worker reply was not a flat JSON object: {0}")]
    MalformedReply(String),
}

/// External capability that answers one item.
///
/// Input: the rendered prompt plus the required response field names.
/// Output: a mapping of those field names to string values, or an error.
/// The runner validates the mapping against the response format; the
/// worker is not trusted to do so.
#[async_trait]
pub trait ItemWorker: Send + Sync {
    /// Answer a single item.
    async fn invoke(
        &self,
        prompt: &str,
        format: &ResponseFormat,
    ) -> Result<HashMap<String, String>, WorkerError>;
}

mod http;
mod jobs;
#[cfg(test)]
pub(crate) mod scripted;

use std::future::Future;

use serde_json::Value;
use tracing::info;

use crate::error::ConnectorError;

pub use http::{Credentials, DEFAULT_BASE_URL, HttpTransport};
pub use jobs::{
    HANDOVER_STATUS, JobResolver, JobStatus, ORIGINAL_TASK_FIELD, ResolverConfig, SUB_TASK_FIELD,
    handover_target,
};

/// Paths are relative to the service base URL, e.g. `/monte-carlo`.
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        path: &str,
        body: Value,
    ) -> impl Future<Output = Result<Value, ConnectorError>> + Send;

    fn get_json(&self, path: &str) -> impl Future<Output = Result<Value, ConnectorError>> + Send;
}

pub const KEY_STATUS_PATH: &str = "/api-keys/status";

/// Asks the service whether the configured API key is accepted. A rejected
/// key surfaces as [`ConnectorError::Api`] with the service's status code.
pub async fn verify_credentials<T: Transport>(transport: &T) -> Result<Value, ConnectorError> {
    let status = transport.get_json(KEY_STATUS_PATH).await?;
    info!("API key accepted");
    Ok(status)
}

use std::time::Duration;

use siteqa_core::{Error, Result, Stage};

/// Runs a synchronous model call on the blocking pool, bounded by `timeout`.
///
/// A timed-out call keeps running on its worker thread; only the caller
/// stops waiting for it.
pub(crate) async fn run_model_call<T, F>(stage: Stage, timeout: Duration, call: F) -> Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(call)).await {
        Err(_) => Err(Error::Timeout { stage, after: timeout }),
        Ok(Err(join)) => Err(Error::Operation(format!("{stage} task failed: {join}"))),
        Ok(Ok(Err(e))) => Err(Error::model(stage, e)),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

/// Bounds an async collaborator call (HTTP generation).
pub(crate) async fn with_timeout<T, Fut>(stage: Stage, timeout: Duration, call: Fut) -> Result<T>
where
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Err(_) => Err(Error::Timeout { stage, after: timeout }),
        Ok(Err(e)) => Err(Error::model(stage, e)),
        Ok(Ok(value)) => Ok(value),
    }
}

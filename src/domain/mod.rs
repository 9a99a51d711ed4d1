pub mod history;
pub mod namespace;
pub mod node;
pub mod workload;

use std::future::Future;

use anyhow::Result;
use tracing::debug;

/// Wraps a best-effort fetch: a failure is logged and collapses to `None`
/// instead of propagating, so it can sit inside a `try_join!` alongside
/// required fetches without ever aborting them.
pub(crate) async fn best_effort<T, F>(what: &str, fut: F) -> Result<Option<T>>
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            debug!("{} unavailable: {:#}", what, err);
            Ok(None)
        }
    }
}

//! Timeout constants and an async wrapper that maps elapse to
//! [`ProtocolError::Timeout`].
//!
//! The codec layer itself never blocks or retries; bounding how long a
//! read or write may wait is the caller's job, and these helpers are how
//! the service layer does it.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Default timeout for connection attempts.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between keepalive probes, for embedders that run them.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Bound on the graceful-shutdown connection drain.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `fut` with a deadline; an elapsed deadline becomes
/// [`ProtocolError::Timeout`].
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

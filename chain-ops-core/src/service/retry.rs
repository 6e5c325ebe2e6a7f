use std::fmt::Display;
use std::future::Future;

use chain_ops_common::RetryPolicy;
use tokio::time::sleep;
use tracing::{info, warn};

/// Run `probe` until it succeeds, retrying at most `policy.max_attempts`
/// times with a constant delay. The error of the last attempt is returned
/// as is.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut probe: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = u64::from(policy.max_attempts);
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;

        match probe().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt > max_attempts => {
                warn!("Giving up after {} attempts: {}", attempt, e);
                return Err(e);
            }
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", attempt, max_attempts + 1, e);
                info!("Wait {}s.", policy.wait.as_secs());
                sleep(policy.wait).await;
            }
        }
    }
}

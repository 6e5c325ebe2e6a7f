use chain_ops_common::AccountAddress;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use super::{PollPolicy, ServiceError};
use crate::blockchain::ChainClient;

/// Poll the free balance of `address` until it is strictly greater than
/// `previous`, returning the new balance.
pub async fn wait_for_increase<C: ChainClient + ?Sized>(
    client: &C,
    address: &AccountAddress,
    previous: u128,
    policy: &PollPolicy,
) -> Result<u128, ServiceError> {
    if policy.timeout.is_none() {
        warn!("Waiting for funds of {} without a timeout", address);
    }
    let started = Instant::now();

    loop {
        let current = client.account_state(address).await?.free;
        if current > previous {
            info!("Balance of {} is now {}", address, current);
            return Ok(current);
        }

        let waited = started.elapsed();
        if let Some(timeout) = policy.timeout {
            if waited >= timeout {
                return Err(ServiceError::FundingTimeout {
                    address: address.clone(),
                    previous,
                    waited,
                });
            }
        }

        info!("Waiting for funds to arrive at {} (balance {})", address, current);
        sleep(policy.interval).await;
    }
}

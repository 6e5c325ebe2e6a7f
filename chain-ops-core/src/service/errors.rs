use std::time::Duration;

use chain_ops_common::{AccountAddress, FailureReason};
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::config::SettingsError;
use crate::faucet::FaucetError;

/// Service layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Blockchain error: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("Faucet error: {0}")]
    Faucet(#[from] FaucetError),

    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{call} failed: {reason}")]
    Submission { call: String, reason: FailureReason },

    #[error("Node is syncing")]
    NodeSyncing,

    #[error("Balance of {address} did not rise above {previous} within {waited:?}")]
    FundingTimeout {
        address: AccountAddress,
        previous: u128,
        waited: Duration,
    },
}

impl ServiceError {
    /// Included in a block but rejected by the runtime
    pub fn is_logical_rejection(&self) -> bool {
        matches!(
            self,
            ServiceError::Submission {
                reason: FailureReason::ExtrinsicFailed,
                ..
            }
        )
    }
}

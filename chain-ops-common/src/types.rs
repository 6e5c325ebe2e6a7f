// =================================================================
// types.rs - Chain-agnostic Domain Types
// =================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// SS58-encoded account address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-byte block hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub [u8; 32]);

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// On-chain account state at the moment of the query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Transferable balance
    pub free: u128,
    /// Reserved balance
    pub reserved: u128,
    /// Next sequence number the chain expects from this sender
    pub nonce: u64,
}

/// An event emitted by the runtime while applying an extrinsic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub pallet: String,
    pub variant: String,
}

impl LedgerEvent {
    pub fn new(pallet: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            pallet: pallet.into(),
            variant: variant.into(),
        }
    }

    pub fn extrinsic_success() -> Self {
        Self::new("System", "ExtrinsicSuccess")
    }

    pub fn extrinsic_failed() -> Self {
        Self::new("System", "ExtrinsicFailed")
    }

    /// The chain included the extrinsic but rejected the dispatched call
    pub fn is_extrinsic_failed(&self) -> bool {
        self.pallet == "System" && self.variant == "ExtrinsicFailed"
    }

    pub fn is_extrinsic_success(&self) -> bool {
        self.pallet == "System" && self.variant == "ExtrinsicSuccess"
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pallet, self.variant)
    }
}

/// Lifecycle update for a submitted extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Accepted into the transaction pool
    Ready,
    /// Gossiped to peers
    Broadcast,
    /// Included in a best block, not yet final
    InBlock(BlockHash),
    /// The block that included it is no longer the best block
    Retracted,
    /// Included in a finalized block, with the events the extrinsic emitted
    Finalized {
        block: BlockHash,
        events: Vec<LedgerEvent>,
    },
    /// Rejected by the pool
    Invalid(String),
    /// Dropped from the pool or the node reported an error for it
    Dropped(String),
}

/// Why a submission did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("transaction invalid")]
    TransactionInvalid(String),

    #[error("extrinsic failed")]
    ExtrinsicFailed,

    #[error("transaction dropped: {0}")]
    Dropped(String),

    #[error("status stream ended before finalization")]
    StreamEnded,
}

/// Single completion value of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success(BlockHash),
    Failure(FailureReason),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }
}

/// Bounded retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 means a single attempt
    pub max_attempts: u32,
    /// Constant delay between attempts
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait_seconds: u64) -> Self {
        Self {
            max_attempts,
            wait: Duration::from_secs(wait_seconds),
        }
    }

    /// Same interval, different bound
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 1)
    }
}

// blockchain/traits.rs

use async_trait::async_trait;
use chain_ops_common::{AccountAddress, AccountState, ExtrinsicCall, SubmissionStatus};
use futures_util::stream::BoxStream;

use super::BlockchainError;
use crate::accounts::AccountHandle;

/// Lifecycle updates of one submitted extrinsic, in the order the node reports them
pub type StatusStream = BoxStream<'static, Result<SubmissionStatus, BlockchainError>>;

/// Node operations the workflows depend on
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Human readable chain name reported by the node
    async fn chain_name(&self) -> Result<String, BlockchainError>;

    /// Whether the node is still importing blocks
    async fn is_syncing(&self) -> Result<bool, BlockchainError>;

    /// Balance and nonce at the latest block; unknown accounts read as empty
    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState, BlockchainError>;

    /// Generate fresh session keys inside the node keystore
    async fn rotate_session_keys(&self) -> Result<Vec<u8>, BlockchainError>;

    /// Sign `call` with `signer` at `nonce`, submit it and watch its status
    async fn submit(
        &self,
        call: &ExtrinsicCall,
        signer: &AccountHandle,
        nonce: u64,
    ) -> Result<StatusStream, BlockchainError>;

    /// `Balances.ExistentialDeposit` in planck
    async fn existential_deposit(&self) -> Result<u128, BlockchainError>;

    /// Start of the active staking era in unix milliseconds
    async fn active_era_start(&self) -> Result<Option<u64>, BlockchainError>;
}

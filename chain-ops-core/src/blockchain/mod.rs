pub mod calls;
pub mod error;
pub mod traits;
pub(crate) mod types;

use async_trait::async_trait;
use chain_ops_common::{AccountAddress, AccountState, BlockHash, ExtrinsicCall, LedgerEvent, SubmissionStatus};
use codec::Decode;
use futures_util::StreamExt;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::config::DefaultExtrinsicParamsBuilder;
use subxt::dynamic::Value;
use subxt::tx::TxStatus;
use subxt::{OnlineClient, PolkadotConfig};
use tracing::{debug, info};

use crate::accounts::AccountHandle;
pub use error::BlockchainError;
pub use traits::{ChainClient, StatusStream};
use types::{AccountInfo, ActiveEraInfo};

type ChainTxStatus = TxStatus<PolkadotConfig, OnlineClient<PolkadotConfig>>;

/// `subxt` backed connection to a Substrate node
pub struct BlockchainManager {
    client: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
}

impl BlockchainManager {
    pub async fn new(node_url: &str) -> Result<Self, BlockchainError> {
        info!("Connecting to blockchain: {}", node_url);

        let rpc_client = RpcClient::from_url(node_url)
            .await
            .map_err(|e| BlockchainError::ConnectionError(e.to_string()))?;
        let rpc = LegacyRpcMethods::<PolkadotConfig>::new(rpc_client.clone());
        let client = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client)
            .await
            .map_err(|e| BlockchainError::ConnectionError(e.to_string()))?;

        Ok(Self { client, rpc })
    }

    async fn fetch_storage(
        &self,
        pallet: &str,
        entry: &str,
        keys: Vec<Value>,
    ) -> Result<Option<Vec<u8>>, BlockchainError> {
        let at_block = self
            .client
            .storage()
            .at_latest()
            .await
            .map_err(|e| BlockchainError::StorageError(e.to_string()))?;

        let value = at_block
            .fetch(&subxt::dynamic::storage(pallet, entry, keys))
            .await
            .map_err(|e| BlockchainError::StorageError(e.to_string()))?;

        Ok(value.map(|thunk| thunk.encoded().to_vec()))
    }
}

#[async_trait]
impl ChainClient for BlockchainManager {
    async fn chain_name(&self) -> Result<String, BlockchainError> {
        self.rpc
            .system_chain()
            .await
            .map_err(|e| BlockchainError::QueryError(e.to_string()))
    }

    async fn is_syncing(&self) -> Result<bool, BlockchainError> {
        let health = self
            .rpc
            .system_health()
            .await
            .map_err(|e| BlockchainError::QueryError(e.to_string()))?;

        debug!("Node health: {} peers, syncing={}", health.peers, health.is_syncing);
        Ok(health.is_syncing)
    }

    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState, BlockchainError> {
        let account_id = calls::account_id(address)?;
        let raw = self
            .fetch_storage("System", "Account", vec![Value::from_bytes(account_id.0)])
            .await?;

        match raw {
            Some(bytes) => {
                let info = AccountInfo::decode(&mut &bytes[..])?;
                Ok(AccountState {
                    free: info.data.free,
                    reserved: info.data.reserved,
                    nonce: info.nonce as u64,
                })
            }
            // Accounts without a storage entry have never been endowed
            None => Ok(AccountState::default()),
        }
    }

    async fn rotate_session_keys(&self) -> Result<Vec<u8>, BlockchainError> {
        let keys = self
            .rpc
            .author_rotate_keys()
            .await
            .map_err(|e| BlockchainError::QueryError(e.to_string()))?;

        Ok(keys)
    }

    async fn submit(
        &self,
        call: &ExtrinsicCall,
        signer: &AccountHandle,
        nonce: u64,
    ) -> Result<StatusStream, BlockchainError> {
        let metadata = self.client.metadata();
        let payload = calls::build_payload(call, &metadata)?;
        let params = DefaultExtrinsicParamsBuilder::<PolkadotConfig>::new()
            .nonce(nonce)
            .build();

        debug!(
            "Submitting {} from {} with nonce {}",
            call.label(),
            signer.address(),
            nonce
        );

        let progress = self
            .client
            .tx()
            .sign_and_submit_then_watch(&payload, signer.keypair(), params)
            .await
            .map_err(|e| BlockchainError::TransactionError(format!("Failed to submit: {}", e)))?;

        let statuses = progress.then(|status| async move {
            match status {
                Ok(status) => convert_status(status).await,
                Err(e) => Err(BlockchainError::SubscriptionError(e.to_string())),
            }
        });

        Ok(statuses.boxed())
    }

    async fn existential_deposit(&self) -> Result<u128, BlockchainError> {
        let constant = self
            .client
            .constants()
            .at(&subxt::dynamic::constant("Balances", "ExistentialDeposit"))
            .map_err(|e| BlockchainError::MetadataError(e.to_string()))?;

        Ok(u128::decode(&mut constant.encoded())?)
    }

    async fn active_era_start(&self) -> Result<Option<u64>, BlockchainError> {
        let raw = self
            .fetch_storage("Staking", "ActiveEra", Vec::new())
            .await?;

        match raw {
            Some(bytes) => Ok(ActiveEraInfo::decode(&mut &bytes[..])?.start),
            None => Ok(None),
        }
    }
}

async fn convert_status(status: ChainTxStatus) -> Result<SubmissionStatus, BlockchainError> {
    let converted = match status {
        TxStatus::Validated => SubmissionStatus::Ready,
        TxStatus::Broadcasted { .. } => SubmissionStatus::Broadcast,
        TxStatus::NoLongerInBestBlock => SubmissionStatus::Retracted,
        TxStatus::InBestBlock(in_block) => SubmissionStatus::InBlock(BlockHash(in_block.block_hash().0)),
        TxStatus::InFinalizedBlock(in_block) => {
            let block = BlockHash(in_block.block_hash().0);
            let extrinsic_events = in_block
                .fetch_events()
                .await
                .map_err(|e| BlockchainError::QueryError(e.to_string()))?;

            let events = extrinsic_events
                .iter()
                .map(|event| {
                    event
                        .map(|details| LedgerEvent::new(details.pallet_name(), details.variant_name()))
                        .map_err(|e| BlockchainError::DecodeError(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            SubmissionStatus::Finalized { block, events }
        }
        TxStatus::Invalid { message } => SubmissionStatus::Invalid(message),
        TxStatus::Dropped { message } => SubmissionStatus::Dropped(message),
        TxStatus::Error { message } => SubmissionStatus::Dropped(message),
    };

    Ok(converted)
}

//! Scripted in-memory chain for service tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::post, Json, Router};
use chain_ops_common::{
    AccountAddress, AccountState, BlockHash, ExtrinsicCall, LedgerEvent, SubmissionStatus,
};
use futures_util::stream::{self, StreamExt};

use crate::accounts::AccountHandle;
use crate::blockchain::{BlockchainError, ChainClient, StatusStream};

pub(crate) const TEST_BLOCK: BlockHash = BlockHash([7u8; 32]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedSubmission {
    pub call: ExtrinsicCall,
    pub signer: AccountAddress,
    pub nonce: u64,
}

#[derive(Default)]
struct MockState {
    syncing: VecDeque<bool>,
    sync_checks: usize,
    // The last scripted balance keeps being returned once the queue runs dry
    balances: HashMap<AccountAddress, VecDeque<u128>>,
    balance_queries: HashMap<AccountAddress, usize>,
    nonces: HashMap<AccountAddress, u64>,
    scripts: HashMap<String, Vec<Result<SubmissionStatus, String>>>,
    submissions: Vec<RecordedSubmission>,
}

pub(crate) struct MockChain {
    state: Mutex<MockState>,
    session_keys: Vec<u8>,
    existential_deposit: u128,
    era_start: Option<u64>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            session_keys: vec![0xaa; 64],
            existential_deposit: 10_000_000_000,
            era_start: None,
        }
    }

    pub fn finalized_ok() -> Vec<SubmissionStatus> {
        vec![
            SubmissionStatus::Ready,
            SubmissionStatus::Broadcast,
            SubmissionStatus::InBlock(TEST_BLOCK),
            SubmissionStatus::Finalized {
                block: TEST_BLOCK,
                events: vec![LedgerEvent::extrinsic_success()],
            },
        ]
    }

    pub fn with_syncing(self, states: Vec<bool>) -> Self {
        self.state.lock().unwrap().syncing = states.into();
        self
    }

    pub fn with_balances(self, address: &AccountAddress, balances: Vec<u128>) -> Self {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.clone(), balances.into());
        self
    }

    pub fn with_nonce(self, address: &AccountAddress, nonce: u64) -> Self {
        self.state.lock().unwrap().nonces.insert(address.clone(), nonce);
        self
    }

    /// Statuses emitted for calls with this `Pallet.call` label
    pub fn with_script(self, label: &str, statuses: Vec<SubmissionStatus>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(label.to_string(), statuses.into_iter().map(Ok).collect());
        self
    }

    /// Script whose stream yields a subscription error at the end
    pub fn with_broken_script(self, label: &str, statuses: Vec<SubmissionStatus>) -> Self {
        let mut items: Vec<_> = statuses.into_iter().map(Ok).collect();
        items.push(Err("connection reset".to_string()));
        self.state.lock().unwrap().scripts.insert(label.to_string(), items);
        self
    }

    pub fn with_session_keys(mut self, keys: Vec<u8>) -> Self {
        self.session_keys = keys;
        self
    }

    pub fn with_era_start(mut self, start: u64) -> Self {
        self.era_start = Some(start);
        self
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submitted_labels(&self) -> Vec<String> {
        self.submissions().iter().map(|s| s.call.label()).collect()
    }

    pub fn balance_queries(&self, address: &AccountAddress) -> usize {
        self.state
            .lock()
            .unwrap()
            .balance_queries
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub fn sync_checks(&self) -> usize {
        self.state.lock().unwrap().sync_checks
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_name(&self) -> Result<String, BlockchainError> {
        Ok("Mock Devnet".to_string())
    }

    async fn is_syncing(&self) -> Result<bool, BlockchainError> {
        let mut state = self.state.lock().unwrap();
        state.sync_checks += 1;
        Ok(state.syncing.pop_front().unwrap_or(false))
    }

    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState, BlockchainError> {
        let mut state = self.state.lock().unwrap();
        *state.balance_queries.entry(address.clone()).or_default() += 1;

        let free = match state.balances.get_mut(address) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().copied().unwrap_or_default(),
            None => 0,
        };
        let nonce = state.nonces.get(address).copied().unwrap_or(0);

        Ok(AccountState {
            free,
            reserved: 0,
            nonce,
        })
    }

    async fn rotate_session_keys(&self) -> Result<Vec<u8>, BlockchainError> {
        Ok(self.session_keys.clone())
    }

    async fn submit(
        &self,
        call: &ExtrinsicCall,
        signer: &AccountHandle,
        nonce: u64,
    ) -> Result<StatusStream, BlockchainError> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(RecordedSubmission {
            call: call.clone(),
            signer: signer.address().clone(),
            nonce,
        });
        *state.nonces.entry(signer.address().clone()).or_default() += 1;

        let script = state
            .scripts
            .get(&call.label())
            .cloned()
            .unwrap_or_else(|| Self::finalized_ok().into_iter().map(Ok).collect());

        let items = script
            .into_iter()
            .map(|item| item.map_err(BlockchainError::SubscriptionError));
        Ok(stream::iter(items).boxed())
    }

    async fn existential_deposit(&self) -> Result<u128, BlockchainError> {
        Ok(self.existential_deposit)
    }

    async fn active_era_start(&self) -> Result<Option<u64>, BlockchainError> {
        Ok(self.era_start)
    }
}

/// Serve `app` on an ephemeral local port and return its `/assets` URL
pub(crate) async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/assets", addr)
}

/// Faucet answering every request with `status`
pub(crate) async fn serve_faucet(status: StatusCode) -> String {
    let app = Router::new().route(
        "/assets",
        post(move || async move { (status, Json(serde_json::json!({ "status": status.as_u16() }))) }),
    );
    serve(app).await
}

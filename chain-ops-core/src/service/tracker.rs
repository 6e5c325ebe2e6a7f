// =================================================================
// service/tracker.rs - Submission Confirmation Tracker
// =================================================================

use chain_ops_common::{BlockHash, ExtrinsicCall, FailureReason, SubmissionOutcome, SubmissionStatus};
use futures_util::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::ServiceError;
use crate::accounts::AccountHandle;
use crate::blockchain::{BlockchainError, ChainClient};

/// Lifecycle position of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Ready,
    Broadcast,
    InBlock,
    Finalized,
    Invalid,
    Dropped,
}

/// Folds status updates into exactly one [`SubmissionOutcome`]
#[derive(Debug)]
pub struct SubmissionTracker {
    label: String,
    state: TrackerState,
    resolved: bool,
}

impl SubmissionTracker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: TrackerState::Idle,
            resolved: false,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Feed the next status. Returns the outcome on the update that resolves
    /// the submission and `None` for everything else, including any update
    /// arriving after resolution.
    pub fn observe(&mut self, status: SubmissionStatus) -> Option<SubmissionOutcome> {
        if self.resolved {
            debug!("{}: ignoring {:?} after resolution", self.label, status);
            return None;
        }

        match status {
            SubmissionStatus::Ready => {
                info!("{}: Ready", self.label);
                self.state = TrackerState::Ready;
                None
            }
            SubmissionStatus::Broadcast => {
                info!("{}: Broadcast", self.label);
                self.state = TrackerState::Broadcast;
                None
            }
            SubmissionStatus::InBlock(block) => {
                info!("{}: InBlock {}", self.label, block);
                self.state = TrackerState::InBlock;
                None
            }
            SubmissionStatus::Retracted => {
                warn!("{}: block retracted, waiting for re-inclusion", self.label);
                self.state = TrackerState::Broadcast;
                None
            }
            SubmissionStatus::Finalized { block, events } => {
                self.state = TrackerState::Finalized;
                let outcome = match events.iter().find(|e| e.is_extrinsic_failed()) {
                    Some(event) => {
                        error!("{}: finalized in {} but rejected ({})", self.label, block, event);
                        SubmissionOutcome::Failure(FailureReason::ExtrinsicFailed)
                    }
                    None => {
                        info!("{}: Finalized {}", self.label, block);
                        SubmissionOutcome::Success(block)
                    }
                };
                self.resolve(outcome)
            }
            SubmissionStatus::Invalid(message) => {
                error!("{}: transaction invalid: {}", self.label, message);
                self.state = TrackerState::Invalid;
                self.resolve(SubmissionOutcome::Failure(FailureReason::TransactionInvalid(message)))
            }
            SubmissionStatus::Dropped(message) => {
                error!("{}: dropped: {}", self.label, message);
                self.state = TrackerState::Dropped;
                self.resolve(SubmissionOutcome::Failure(FailureReason::Dropped(message)))
            }
        }
    }

    fn resolve(&mut self, outcome: SubmissionOutcome) -> Option<SubmissionOutcome> {
        self.resolved = true;
        Some(outcome)
    }
}

/// Drive `statuses` until the submission resolves. The rest of the stream is
/// not polled. A stream that ends first resolves as
/// [`FailureReason::StreamEnded`].
pub async fn track<S>(label: &str, mut statuses: S) -> Result<SubmissionOutcome, BlockchainError>
where
    S: Stream<Item = Result<SubmissionStatus, BlockchainError>> + Unpin,
{
    let mut tracker = SubmissionTracker::new(label);

    while let Some(status) = statuses.next().await {
        if let Some(outcome) = tracker.observe(status?) {
            return Ok(outcome);
        }
    }

    warn!("{}: status stream ended in state {:?}", label, tracker.state());
    Ok(SubmissionOutcome::Failure(FailureReason::StreamEnded))
}

/// Sign `call` with the signer's current nonce and wait for finalization
pub async fn submit_and_confirm<C: ChainClient + ?Sized>(
    client: &C,
    call: &ExtrinsicCall,
    signer: &AccountHandle,
) -> Result<BlockHash, ServiceError> {
    let label = call.label();
    let nonce = client.account_state(signer.address()).await?.nonce;
    info!("Submitting {} signed by {} ({})", label, signer.label(), signer.address());

    let statuses = client.submit(call, signer, nonce).await?;

    match track(&label, statuses).await? {
        SubmissionOutcome::Success(block) => Ok(block),
        SubmissionOutcome::Failure(reason) => Err(ServiceError::Submission { call: label, reason }),
    }
}

/// Sign `call` and return once the pool accepted it, without waiting for
/// inclusion. Callers confirm the effect by observing chain state.
pub async fn submit_and_accept<C: ChainClient + ?Sized>(
    client: &C,
    call: &ExtrinsicCall,
    signer: &AccountHandle,
) -> Result<(), ServiceError> {
    let label = call.label();
    let nonce = client.account_state(signer.address()).await?.nonce;
    info!("Submitting {} signed by {} ({})", label, signer.label(), signer.address());

    let mut statuses = client.submit(call, signer, nonce).await?;
    let mut tracker = SubmissionTracker::new(label.as_str());

    while let Some(status) = statuses.next().await {
        if let Some(SubmissionOutcome::Failure(reason)) = tracker.observe(status?) {
            return Err(ServiceError::Submission { call: label, reason });
        }
        if tracker.state() != TrackerState::Idle {
            return Ok(());
        }
    }

    Err(ServiceError::Submission {
        call: label,
        reason: FailureReason::StreamEnded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, TEST_BLOCK};
    use chain_ops_common::{AccountAddress, LedgerEvent};
    use futures_util::stream;

    fn feed(statuses: Vec<SubmissionStatus>) -> Vec<SubmissionOutcome> {
        let mut tracker = SubmissionTracker::new("Test.call");
        statuses
            .into_iter()
            .filter_map(|status| tracker.observe(status))
            .collect()
    }

    fn finalized(events: Vec<LedgerEvent>) -> SubmissionStatus {
        SubmissionStatus::Finalized {
            block: TEST_BLOCK,
            events,
        }
    }

    #[test]
    fn test_happy_path_resolves_once_after_finalization() {
        let mut tracker = SubmissionTracker::new("Staking.bond");

        assert_eq!(tracker.observe(SubmissionStatus::Ready), None);
        assert_eq!(tracker.observe(SubmissionStatus::Broadcast), None);
        assert_eq!(tracker.observe(SubmissionStatus::InBlock(TEST_BLOCK)), None);
        assert_eq!(tracker.state(), TrackerState::InBlock);
        assert!(!tracker.is_resolved());

        let outcome = tracker.observe(finalized(vec![LedgerEvent::extrinsic_success()]));
        assert_eq!(outcome, Some(SubmissionOutcome::Success(TEST_BLOCK)));
        assert!(tracker.is_resolved());

        // A second finalization must not resolve again
        assert_eq!(tracker.observe(finalized(vec![])), None);
    }

    #[test]
    fn test_extrinsic_failed_event_fails_despite_finalization() {
        let outcomes = feed(vec![
            SubmissionStatus::Ready,
            SubmissionStatus::InBlock(TEST_BLOCK),
            finalized(vec![
                LedgerEvent::new("Balances", "Withdraw"),
                LedgerEvent::extrinsic_failed(),
            ]),
        ]);

        assert_eq!(
            outcomes,
            vec![SubmissionOutcome::Failure(FailureReason::ExtrinsicFailed)]
        );
    }

    #[test]
    fn test_invalid_resolves_immediately_and_ignores_the_rest() {
        let outcomes = feed(vec![
            SubmissionStatus::Invalid("stale nonce".to_string()),
            SubmissionStatus::Broadcast,
            finalized(vec![LedgerEvent::extrinsic_success()]),
            SubmissionStatus::Invalid("again".to_string()),
        ]);

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            SubmissionOutcome::Failure(reason) => assert_eq!(reason.to_string(), "transaction invalid"),
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_retracted_block_keeps_waiting() {
        let mut tracker = SubmissionTracker::new("Session.set_keys");
        tracker.observe(SubmissionStatus::InBlock(TEST_BLOCK));
        assert_eq!(tracker.observe(SubmissionStatus::Retracted), None);
        assert_eq!(tracker.state(), TrackerState::Broadcast);
        assert!(!tracker.is_resolved());
    }

    #[tokio::test]
    async fn test_track_stream_without_resolution() {
        let statuses = stream::iter(vec![
            Ok(SubmissionStatus::Ready),
            Ok(SubmissionStatus::Broadcast),
        ]);

        let outcome = track("Balances.transfer_allow_death", statuses).await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Failure(FailureReason::StreamEnded));
    }

    #[tokio::test]
    async fn test_track_propagates_subscription_errors() {
        let statuses = stream::iter(vec![
            Ok(SubmissionStatus::Ready),
            Err(BlockchainError::SubscriptionError("closed".to_string())),
        ]);

        let result = track("Staking.validate", statuses).await;
        assert!(matches!(result, Err(BlockchainError::SubscriptionError(_))));
    }

    #[tokio::test]
    async fn test_submit_and_confirm_uses_current_nonce() {
        let signer = AccountHandle::from_uri("Stash", "//Alice").unwrap();
        let chain = MockChain::new().with_nonce(signer.address(), 4);
        let call = ExtrinsicCall::SetController {
            controller: AccountAddress::new("5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"),
        };

        let block = submit_and_confirm(&chain, &call, &signer).await.unwrap();
        assert_eq!(block, TEST_BLOCK);

        submit_and_confirm(&chain, &call, &signer).await.unwrap();
        let nonces: Vec<u64> = chain.submissions().iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_submit_and_confirm_reports_logical_rejection() {
        let signer = AccountHandle::from_uri("Stash", "//Alice").unwrap();
        let chain = MockChain::new().with_script(
            "Staking.validate",
            vec![
                SubmissionStatus::Ready,
                SubmissionStatus::Finalized {
                    block: TEST_BLOCK,
                    events: vec![LedgerEvent::extrinsic_failed()],
                },
            ],
        );
        let call = ExtrinsicCall::Validate {
            commission: 0,
            blocked: false,
        };

        let err = submit_and_confirm(&chain, &call, &signer).await.unwrap_err();
        assert!(err.is_logical_rejection());
        assert_eq!(err.to_string(), "Staking.validate failed: extrinsic failed");
    }

    #[tokio::test]
    async fn test_submit_and_accept() {
        let signer = AccountHandle::from_uri("Root", "//Alice").unwrap();
        let dest = AccountAddress::new("5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty");
        let call = ExtrinsicCall::Transfer { dest, amount: 1 };

        let chain = MockChain::new();
        assert!(submit_and_accept(&chain, &call, &signer).await.is_ok());

        let rejecting = MockChain::new().with_script(
            "Balances.transfer_allow_death",
            vec![SubmissionStatus::Invalid("bad signature".to_string())],
        );
        let err = submit_and_accept(&rejecting, &call, &signer).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Submission {
                reason: FailureReason::TransactionInvalid(_),
                ..
            }
        ));
    }
}

pub mod errors;
pub mod network;
pub mod poller;
pub mod retry;
pub mod tracker;
pub mod types;
pub mod validator;

// Re-export main interfaces
pub use errors::ServiceError;
pub use network::Network;
pub use poller::wait_for_increase;
pub use retry::retry;
pub use tracker::{submit_and_accept, submit_and_confirm, track, SubmissionTracker, TrackerState};
pub use types::*;
pub use validator::{AccountSource, ValidatorReport, ValidatorSetup};

pub mod call;
pub mod types;

pub use call::{ExtrinsicCall, RewardDestination};
pub use types::*;

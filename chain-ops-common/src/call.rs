// =================================================================
// call.rs - Extrinsic Descriptors
// =================================================================

use crate::types::AccountAddress;
use serde::{Deserialize, Serialize};

/// Where staking rewards are paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardDestination {
    /// Paid into the stash and added to the bond
    Staked,
    /// Paid into the stash, not bonded
    Stash,
    /// Paid into the controller account
    Controller,
}

impl RewardDestination {
    pub fn variant_name(&self) -> &'static str {
        match self {
            RewardDestination::Staked => "Staked",
            RewardDestination::Stash => "Stash",
            RewardDestination::Controller => "Controller",
        }
    }
}

/// A state-changing call, described independently of the client library
/// that encodes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtrinsicCall {
    Transfer {
        dest: AccountAddress,
        amount: u128,
    },
    Bond {
        controller: AccountAddress,
        value: u128,
        payee: RewardDestination,
    },
    SetController {
        controller: AccountAddress,
    },
    SetSessionKeys {
        keys: Vec<u8>,
        proof: Vec<u8>,
    },
    /// Commission expressed in Perbill (parts per billion)
    Validate {
        commission: u32,
        blocked: bool,
    },
    SetIdentity {
        display: String,
    },
    SendDdcData {
        dest: AccountAddress,
        data: Vec<u8>,
    },
    Batch(Vec<ExtrinsicCall>),
}

impl ExtrinsicCall {
    /// `(pallet, call)` as named in runtime metadata
    pub fn name(&self) -> (&'static str, &'static str) {
        match self {
            ExtrinsicCall::Transfer { .. } => ("Balances", "transfer_allow_death"),
            ExtrinsicCall::Bond { .. } => ("Staking", "bond"),
            ExtrinsicCall::SetController { .. } => ("Staking", "set_controller"),
            ExtrinsicCall::SetSessionKeys { .. } => ("Session", "set_keys"),
            ExtrinsicCall::Validate { .. } => ("Staking", "validate"),
            ExtrinsicCall::SetIdentity { .. } => ("Identity", "set_identity"),
            ExtrinsicCall::SendDdcData { .. } => ("CereDdcModule", "send_data"),
            ExtrinsicCall::Batch(_) => ("Utility", "batch"),
        }
    }

    pub fn label(&self) -> String {
        let (pallet, call) = self.name();
        format!("{}.{}", pallet, call)
    }
}

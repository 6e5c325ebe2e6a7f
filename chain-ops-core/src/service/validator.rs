// =================================================================
// service/validator.rs - Validator Setup Workflow
// =================================================================

use chain_ops_common::{AccountAddress, BlockHash, ExtrinsicCall, RewardDestination};
use tracing::{info, warn};

use super::{retry, submit_and_accept, submit_and_confirm, wait_for_increase, PollPolicy, ServiceError};
use crate::accounts::AccountHandle;
use crate::blockchain::ChainClient;
use crate::config::{FundingMode, ValidatorSettings};
use crate::faucet::FaucetClient;

/// Where the stash and controller keys come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSource {
    /// Mnemonics from the settings
    Configured,
    /// Fresh keys, printed once so they can be saved
    Generated,
}

#[derive(Debug)]
pub struct Connected {
    pub chain: String,
}

#[derive(Debug)]
pub struct AccountsReady {
    pub connected: Connected,
    pub root: AccountHandle,
    pub stash: AccountHandle,
    pub controller: AccountHandle,
}

#[derive(Debug)]
pub struct Funded {
    pub accounts: AccountsReady,
    pub stash_balance: u128,
    pub controller_balance: u128,
}

#[derive(Debug)]
pub struct KeysRotated {
    pub funded: Funded,
    pub session_keys: Vec<u8>,
}

#[derive(Debug)]
pub struct Bonded {
    pub rotated: KeysRotated,
    pub bond_block: BlockHash,
}

#[derive(Debug)]
pub struct SessionSet {
    pub bonded: Bonded,
    pub session_block: BlockHash,
}

/// Summary of a completed setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorReport {
    pub chain: String,
    pub stash: AccountAddress,
    pub controller: AccountAddress,
    pub bonded: u128,
    /// Perbill
    pub commission: u32,
    pub bond_block: BlockHash,
    pub session_block: BlockHash,
    pub commission_block: BlockHash,
}

/// Turns funded stash/controller accounts into an active validator candidate.
///
/// Each step consumes the state produced by the previous one, so the order
/// is fixed by the signatures. Any error aborts the whole run.
pub struct ValidatorSetup<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    faucet: &'a FaucetClient,
    settings: &'a ValidatorSettings,
}

impl<'a, C: ChainClient + ?Sized> ValidatorSetup<'a, C> {
    pub fn new(client: &'a C, faucet: &'a FaucetClient, settings: &'a ValidatorSettings) -> Self {
        Self {
            client,
            faucet,
            settings,
        }
    }

    /// Run every step in order
    pub async fn run(
        &self,
        source: AccountSource,
        change_controller: bool,
    ) -> Result<ValidatorReport, ServiceError> {
        let connected = self.connect().await?;
        let accounts = self.load_accounts(connected, source)?;
        let funded = self.fund(accounts).await?;
        self.check_bond_value(funded.stash_balance)?;
        let funded = self.register_identities(funded).await?;
        let rotated = self.rotate_keys(funded).await?;
        let mut bonded = self.bond(rotated).await?;
        if change_controller {
            bonded = self.set_controller(bonded).await?;
        }
        let session_set = self.set_session_keys(bonded).await?;
        self.set_commission(session_set).await
    }

    /// Wait for the node to finish syncing
    pub async fn connect(&self) -> Result<Connected, ServiceError> {
        let chain = self.client.chain_name().await?;
        info!("Connected to {}", chain);

        let client = self.client;
        retry(&self.settings.retry, || async move {
            match client.is_syncing().await {
                Ok(false) => Ok(()),
                Ok(true) => Err(ServiceError::NodeSyncing),
                Err(e) => Err(ServiceError::from(e)),
            }
        })
        .await?;

        info!("Node is synced");
        Ok(Connected { chain })
    }

    pub fn load_accounts(
        &self,
        connected: Connected,
        source: AccountSource,
    ) -> Result<AccountsReady, ServiceError> {
        let root = AccountHandle::from_uri("Root", &self.settings.root_account_mnemonic)?;

        let (stash, controller) = match source {
            AccountSource::Configured => (
                AccountHandle::from_uri("Stash", &self.settings.stash_account_mnemonic)?,
                AccountHandle::from_uri("Controller", &self.settings.controller_account_mnemonic)?,
            ),
            AccountSource::Generated => {
                let (stash, stash_phrase) = AccountHandle::generate("Stash")?;
                let (controller, controller_phrase) = AccountHandle::generate("Controller")?;

                println!("=====================================================");
                println!("Generated accounts. Save these mnemonics, they are not stored anywhere.");
                println!("Stash:      {}", stash.address());
                println!("            {}", stash_phrase);
                println!("Controller: {}", controller.address());
                println!("            {}", controller_phrase);
                println!("=====================================================");

                (stash, controller)
            }
        };

        info!("Stash account: {}", stash.address());
        info!("Controller account: {}", controller.address());

        Ok(AccountsReady {
            connected,
            root,
            stash,
            controller,
        })
    }

    /// Fund stash and controller and wait until both balances went up
    pub async fn fund(&self, accounts: AccountsReady) -> Result<Funded, ServiceError> {
        let stash_before = self.client.account_state(accounts.stash.address()).await?.free;
        let controller_before = self.client.account_state(accounts.controller.address()).await?.free;
        let policy = PollPolicy {
            interval: self.settings.poll_interval,
            timeout: self.settings.funding_timeout,
        };

        let (stash_balance, controller_balance) = match self.settings.funding_mode {
            FundingMode::Faucet => {
                self.faucet.request_assets(accounts.stash.address()).await?;
                self.faucet.request_assets(accounts.controller.address()).await?;

                let stash = wait_for_increase(self.client, accounts.stash.address(), stash_before, &policy)
                    .await?;
                let controller = wait_for_increase(
                    self.client,
                    accounts.controller.address(),
                    controller_before,
                    &policy,
                )
                .await?;
                (stash, controller)
            }
            FundingMode::Endowment => (
                self.endow(&accounts.root, &accounts.stash, stash_before, &policy).await?,
                self.endow(&accounts.root, &accounts.controller, controller_before, &policy)
                    .await?,
            ),
        };

        Ok(Funded {
            accounts,
            stash_balance,
            controller_balance,
        })
    }

    // The next transfer from root is only built once this one landed, so
    // every endowment carries a fresh nonce.
    async fn endow(
        &self,
        root: &AccountHandle,
        target: &AccountHandle,
        previous: u128,
        policy: &PollPolicy,
    ) -> Result<u128, ServiceError> {
        info!(
            "Endowing {} with {} from {}",
            target.address(),
            self.settings.endowment_value,
            root.address()
        );
        let call = ExtrinsicCall::Transfer {
            dest: target.address().clone(),
            amount: self.settings.endowment_value,
        };
        submit_and_accept(self.client, &call, root).await?;
        wait_for_increase(self.client, target.address(), previous, policy).await
    }

    /// The bond must stay below the stash balance so fees can still be paid
    pub fn check_bond_value(&self, stash_balance: u128) -> Result<(), ServiceError> {
        if self.settings.bond_value >= stash_balance {
            return Err(ServiceError::Validation(format!(
                "Bond value needs to be lesser than balance. (Bond value: {}, balance: {})",
                self.settings.bond_value, stash_balance
            )));
        }
        Ok(())
    }

    pub async fn register_identities(&self, funded: Funded) -> Result<Funded, ServiceError> {
        let identities = [
            (&funded.accounts.stash, &self.settings.stash_identity),
            (&funded.accounts.controller, &self.settings.controller_identity),
        ];

        for (account, name) in identities {
            if let Some(name) = name {
                let call = ExtrinsicCall::SetIdentity {
                    display: name.clone(),
                };
                submit_and_confirm(self.client, &call, account).await?;
                info!("{} identity set to '{}'", account.label(), name);
            }
        }

        Ok(funded)
    }

    pub async fn rotate_keys(&self, funded: Funded) -> Result<KeysRotated, ServiceError> {
        let session_keys = self.client.rotate_session_keys().await?;
        info!("Session keys rotated: 0x{}", hex::encode(&session_keys));

        Ok(KeysRotated {
            funded,
            session_keys,
        })
    }

    pub async fn bond(&self, rotated: KeysRotated) -> Result<Bonded, ServiceError> {
        let accounts = &rotated.funded.accounts;
        // Identity deposits and fees may have been taken since funding
        let stash_balance = self.client.account_state(accounts.stash.address()).await?.free;
        self.check_bond_value(stash_balance)?;

        let call = ExtrinsicCall::Bond {
            controller: accounts.controller.address().clone(),
            value: self.settings.bond_value,
            payee: RewardDestination::Staked,
        };
        let bond_block = submit_and_confirm(self.client, &call, &accounts.stash).await?;
        info!("Bonded {} from {}", self.settings.bond_value, accounts.stash.address());

        Ok(Bonded {
            rotated,
            bond_block,
        })
    }

    pub async fn set_controller(&self, bonded: Bonded) -> Result<Bonded, ServiceError> {
        let accounts = &bonded.rotated.funded.accounts;
        let call = ExtrinsicCall::SetController {
            controller: accounts.controller.address().clone(),
        };
        submit_and_confirm(self.client, &call, &accounts.stash).await?;
        info!("Controller set to {}", accounts.controller.address());

        Ok(bonded)
    }

    pub async fn set_session_keys(&self, bonded: Bonded) -> Result<SessionSet, ServiceError> {
        let call = ExtrinsicCall::SetSessionKeys {
            keys: bonded.rotated.session_keys.clone(),
            proof: Vec::new(),
        };
        let controller = &bonded.rotated.funded.accounts.controller;
        let session_block = submit_and_confirm(self.client, &call, controller).await?;
        info!("Session keys set");

        Ok(SessionSet {
            bonded,
            session_block,
        })
    }

    pub async fn set_commission(&self, session_set: SessionSet) -> Result<ValidatorReport, ServiceError> {
        let SessionSet {
            bonded,
            session_block,
        } = session_set;
        let accounts = bonded.rotated.funded.accounts;

        if self.settings.commission == 0 {
            warn!("Validator commission is 0%");
        }
        let call = ExtrinsicCall::Validate {
            commission: self.settings.commission,
            blocked: false,
        };
        let commission_block = submit_and_confirm(self.client, &call, &accounts.controller).await?;
        info!("Commission set to {} Perbill", self.settings.commission);

        Ok(ValidatorReport {
            chain: accounts.connected.chain,
            stash: accounts.stash.address().clone(),
            controller: accounts.controller.address().clone(),
            bonded: self.settings.bond_value,
            commission: self.settings.commission,
            bond_block: bonded.bond_block,
            session_block,
            commission_block,
        })
    }
}

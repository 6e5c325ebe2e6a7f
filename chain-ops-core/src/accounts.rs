// =================================================================
// accounts.rs - Signing Accounts
// =================================================================

use std::fmt;
use std::str::FromStr;

use chain_ops_common::AccountAddress;
use subxt::utils::AccountId32;
use subxt_signer::bip39::Mnemonic;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;

use crate::blockchain::BlockchainError;

/// Words in a freshly generated mnemonic
pub const MNEMONIC_WORDS_COUNT: usize = 12;

/// An sr25519 keypair together with its SS58 address
pub struct AccountHandle {
    label: String,
    keypair: Keypair,
    address: AccountAddress,
}

impl AccountHandle {
    /// Derive from a mnemonic or secret URI such as `//Alice` or `<phrase>//stash`
    pub fn from_uri(label: &str, uri: &str) -> Result<Self, BlockchainError> {
        let secret = SecretUri::from_str(uri)
            .map_err(|e| BlockchainError::KeyError(format!("{} account: {}", label, e)))?;
        let keypair = Keypair::from_uri(&secret)
            .map_err(|e| BlockchainError::KeyError(format!("{} account: {}", label, e)))?;

        Ok(Self::from_keypair(label, keypair))
    }

    /// Create an account from fresh entropy, returning the mnemonic that restores it
    pub fn generate(label: &str) -> Result<(Self, Mnemonic), BlockchainError> {
        // 16 bytes of entropy encode to 12 words
        let entropy: [u8; 16] = rand::random();
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| BlockchainError::KeyError(e.to_string()))?;
        let keypair = Keypair::from_phrase(&mnemonic, None)
            .map_err(|e| BlockchainError::KeyError(format!("{} account: {}", label, e)))?;

        Ok((Self::from_keypair(label, keypair), mnemonic))
    }

    fn from_keypair(label: &str, keypair: Keypair) -> Self {
        let address = AccountAddress::new(AccountId32(keypair.public_key().0).to_string());
        Self {
            label: label.to_string(),
            keypair,
            address,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountHandle")
            .field("label", &self.label)
            .field("address", &self.address)
            .finish()
    }
}

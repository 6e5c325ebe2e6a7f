// =================================================================
// service/network.rs - Tokenomics Operations
// =================================================================

use std::str::FromStr;

use chain_ops_common::{AccountAddress, BlockHash, ExtrinsicCall};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use subxt::utils::AccountId32;
use tracing::info;

use super::{submit_and_confirm, ServiceError};
use crate::accounts::AccountHandle;
use crate::blockchain::ChainClient;
use crate::config::{NetworkSettings, SettingsError};

/// Pallet id of the treasury, `PalletId(*b"py/trsry")` behind the `modl` prefix
const TREASURY_SEED: &[u8] = b"modlpy/trsry";

/// Transfers and balance reads expressed in whole tokens
pub struct Network<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    settings: &'a NetworkSettings,
}

impl<'a, C: ChainClient + ?Sized> Network<'a, C> {
    pub fn new(client: &'a C, settings: &'a NetworkSettings) -> Self {
        Self { client, settings }
    }

    /// Whole tokens (e.g. `"1.5"`) to planck
    pub fn to_planck(&self, tokens: &str) -> Result<u128, ServiceError> {
        let invalid = |reason: String| ServiceError::Validation(format!("Invalid amount '{}': {}", tokens, reason));

        let amount = Decimal::from_str(tokens.trim())
            .map_err(|e| invalid(e.to_string()))?
            .normalize();
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(invalid("amount is negative".to_string()));
        }
        if amount.scale() > self.settings.decimals {
            return Err(invalid(format!(
                "more than {} decimal places",
                self.settings.decimals
            )));
        }

        let mantissa = u128::try_from(amount.mantissa().abs()).map_err(|e| invalid(e.to_string()))?;
        mantissa
            .checked_mul(10u128.pow(self.settings.decimals - amount.scale()))
            .ok_or_else(|| invalid("amount overflows u128".to_string()))
    }

    /// Planck to whole tokens without trailing zeros
    pub fn format_balance(&self, planck: u128) -> String {
        let unit = 10u128.pow(self.settings.decimals);
        let whole = planck / unit;
        let fraction = planck % unit;

        if fraction == 0 {
            return whole.to_string();
        }
        let digits = format!("{:0width$}", fraction, width = self.settings.decimals as usize);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }

    pub fn transfer_call(&self, dest: &AccountAddress, tokens: &str) -> Result<ExtrinsicCall, ServiceError> {
        Ok(ExtrinsicCall::Transfer {
            dest: dest.clone(),
            amount: self.to_planck(tokens)?,
        })
    }

    pub async fn transfer(
        &self,
        signer: &AccountHandle,
        dest: &AccountAddress,
        tokens: &str,
    ) -> Result<BlockHash, ServiceError> {
        let call = self.transfer_call(dest, tokens)?;
        let block = self.sign_and_send(signer, &call).await?;
        info!("Transferred {} from {} to {}", tokens, signer.address(), dest);
        Ok(block)
    }

    /// Send the same amount to every destination in one `Utility.batch`
    pub async fn batch_transfer(
        &self,
        signer: &AccountHandle,
        dests: &[AccountAddress],
        tokens: &str,
    ) -> Result<BlockHash, ServiceError> {
        if dests.is_empty() {
            return Err(ServiceError::Validation("No transfer destinations given".to_string()));
        }

        let calls = dests
            .iter()
            .map(|dest| self.transfer_call(dest, tokens))
            .collect::<Result<Vec<_>, _>>()?;
        self.sign_and_send_batch(signer, calls).await
    }

    /// Sign with the sender's current nonce and wait for finalization
    pub async fn sign_and_send(
        &self,
        signer: &AccountHandle,
        call: &ExtrinsicCall,
    ) -> Result<BlockHash, ServiceError> {
        submit_and_confirm(self.client, call, signer).await
    }

    pub async fn sign_and_send_batch(
        &self,
        signer: &AccountHandle,
        calls: Vec<ExtrinsicCall>,
    ) -> Result<BlockHash, ServiceError> {
        info!("Sending batch of {} calls from {}", calls.len(), signer.address());
        self.sign_and_send(signer, &ExtrinsicCall::Batch(calls)).await
    }

    pub async fn send_ddc(
        &self,
        signer: &AccountHandle,
        dest: &AccountAddress,
        data: &str,
    ) -> Result<BlockHash, ServiceError> {
        let call = ExtrinsicCall::SendDdcData {
            dest: dest.clone(),
            data: data.as_bytes().to_vec(),
        };
        self.sign_and_send(signer, &call).await
    }

    /// Free balance in planck
    pub async fn balance(&self, address: &AccountAddress) -> Result<u128, ServiceError> {
        Ok(self.client.account_state(address).await?.free)
    }

    pub async fn existential_deposit(&self) -> Result<u128, ServiceError> {
        Ok(self.client.existential_deposit().await?)
    }

    pub async fn treasury_balance(&self) -> Result<u128, ServiceError> {
        self.balance(&treasury_account()).await
    }

    /// Minutes left in the active era, `None` when the era has not started
    pub async fn era_time_remaining(&self, now: DateTime<Utc>) -> Result<Option<i64>, ServiceError> {
        let era_minutes = self
            .settings
            .era_time
            .ok_or(SettingsError::Missing("ERA_TIME"))?;
        if era_minutes <= 0 {
            return Err(ServiceError::Validation(format!(
                "Era length must be positive, got {} minutes",
                era_minutes
            )));
        }

        let Some(start) = self.client.active_era_start().await? else {
            return Ok(None);
        };
        let start = i64::try_from(start)
            .map_err(|_| ServiceError::Validation(format!("Era start {} out of range", start)))?;

        let era_end = era_minutes
            .checked_mul(60_000)
            .and_then(|length| start.checked_add(length))
            .ok_or_else(|| {
                ServiceError::Validation(format!("Era of {} minutes from {} overflows", era_minutes, start))
            })?;
        let remaining = era_end.saturating_sub(now.timestamp_millis()) / 60_000;
        Ok(Some(remaining.max(0)))
    }
}

/// Sovereign account of the treasury pallet
pub fn treasury_account() -> AccountAddress {
    let mut id = [0u8; 32];
    id[..TREASURY_SEED.len()].copy_from_slice(TREASURY_SEED);
    AccountAddress::new(AccountId32(id).to_string())
}

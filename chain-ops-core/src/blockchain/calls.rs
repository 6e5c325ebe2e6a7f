// =================================================================
// blockchain/calls.rs - Dynamic Extrinsic Encoding
// =================================================================

use std::str::FromStr;

use chain_ops_common::{AccountAddress, ExtrinsicCall};
use subxt::dynamic::Value;
use subxt::ext::scale_value;
use subxt::tx::DynamicPayload;
use subxt::utils::AccountId32;
use subxt::Metadata;

use super::BlockchainError;

/// Longest raw value `pallet_identity::Data` can hold
pub const MAX_IDENTITY_DISPLAY_LEN: usize = 32;

/// Build the dynamic payload submitted for `call`
pub(crate) fn build_payload(
    call: &ExtrinsicCall,
    metadata: &Metadata,
) -> Result<DynamicPayload, BlockchainError> {
    let (pallet, name) = call.name();
    let fields = call_fields(call, metadata)?;
    Ok(subxt::dynamic::tx(pallet, name, fields))
}

/// Encode `call` as a `RuntimeCall` value, for nesting inside a batch
fn runtime_call_value(call: &ExtrinsicCall, metadata: &Metadata) -> Result<Value, BlockchainError> {
    let (pallet, name) = call.name();
    let fields = call_fields(call, metadata)?;
    Ok(Value::unnamed_variant(
        pallet,
        [Value::unnamed_variant(name, fields)],
    ))
}

fn call_fields(call: &ExtrinsicCall, metadata: &Metadata) -> Result<Vec<Value>, BlockchainError> {
    let fields = match call {
        ExtrinsicCall::Transfer { dest, amount } => {
            vec![multi_address(dest)?, Value::u128(*amount)]
        }
        ExtrinsicCall::Bond {
            controller,
            value,
            payee,
        } => vec![
            multi_address(controller)?,
            Value::u128(*value),
            Value::unnamed_variant(payee.variant_name(), Vec::new()),
        ],
        ExtrinsicCall::SetController { controller } => vec![multi_address(controller)?],
        ExtrinsicCall::SetSessionKeys { keys, proof } => {
            vec![session_keys_value(keys, metadata)?, Value::from_bytes(proof)]
        }
        ExtrinsicCall::Validate {
            commission,
            blocked,
        } => vec![Value::named_composite([
            ("commission", Value::u128(*commission as u128)),
            ("blocked", Value::bool(*blocked)),
        ])],
        ExtrinsicCall::SetIdentity { display } => vec![identity_info(display)?],
        ExtrinsicCall::SendDdcData { dest, data } => {
            vec![Value::from_bytes(account_id(dest)?.0), Value::from_bytes(data)]
        }
        ExtrinsicCall::Batch(calls) => {
            let inner = calls
                .iter()
                .map(|c| runtime_call_value(c, metadata))
                .collect::<Result<Vec<_>, _>>()?;
            vec![Value::unnamed_composite(inner)]
        }
    };

    Ok(fields)
}

pub(crate) fn account_id(address: &AccountAddress) -> Result<AccountId32, BlockchainError> {
    AccountId32::from_str(address.as_str())
        .map_err(|_| BlockchainError::InvalidAddress(address.to_string()))
}

fn multi_address(address: &AccountAddress) -> Result<Value, BlockchainError> {
    let id = account_id(address)?;
    Ok(Value::unnamed_variant("Id", [Value::from_bytes(id.0)]))
}

/// `author_rotateKeys` returns the SCALE encoding of the runtime's session
/// keys type, which has to be decoded against metadata before it can be
/// re-encoded as a call argument.
fn session_keys_value(keys: &[u8], metadata: &Metadata) -> Result<Value, BlockchainError> {
    let keys_ty = metadata
        .pallet_by_name("Session")
        .and_then(|pallet| pallet.call_variant_by_name("set_keys"))
        .and_then(|variant| variant.fields.first())
        .map(|field| field.ty.id)
        .ok_or_else(|| {
            BlockchainError::MetadataError("Session.set_keys not found in metadata".to_string())
        })?;

    let value = scale_value::scale::decode_as_type(&mut &keys[..], keys_ty, metadata.types())
        .map_err(|e| BlockchainError::DecodeError(format!("Invalid session keys: {}", e)))?;

    Ok(value.remove_context())
}

fn identity_info(display: &str) -> Result<Value, BlockchainError> {
    let bytes = display.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_IDENTITY_DISPLAY_LEN {
        return Err(BlockchainError::TransactionError(format!(
            "Identity display name must be 1..={} bytes, got {}",
            MAX_IDENTITY_DISPLAY_LEN,
            bytes.len()
        )));
    }

    let none = || Value::unnamed_variant("None", Vec::new());
    Ok(Value::named_composite([
        ("additional", Value::unnamed_composite(Vec::new())),
        (
            "display",
            Value::unnamed_variant(format!("Raw{}", bytes.len()), [Value::from_bytes(bytes)]),
        ),
        ("legal", none()),
        ("web", none()),
        ("riot", none()),
        ("email", none()),
        ("pgp_fingerprint", none()),
        ("image", none()),
        ("twitter", none()),
    ]))
}

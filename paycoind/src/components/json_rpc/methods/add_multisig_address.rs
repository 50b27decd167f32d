use secp256k1::PublicKey;
use serde_json::Value;

use super::{array_param, check_arity, int_param, opt_str_param, type_mismatch};
use crate::{
    address::{self, Address},
    components::{
        json_rpc::{
            registry::{CallContext, CallError, CallResult},
            server::LegacyCode,
        },
        keystore::KeyStore,
    },
};

const USAGE: &str = "addmultisigaddress <nrequired> <'[\"key\",\"key\"]'> [account]\n\
    Add a nrequired-to-sign multisignature address to the wallet.\n\
    Each key is a Paycoin address or hex-encoded public key.\n\
    If [account] is specified, assign address to [account].";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 2, 3, help, USAGE)?;
    let required = int_param(params, 0)?;
    let keys = array_param(params, 1)?;
    let account = opt_str_param(params, 2)?;

    if required < 1 {
        return Err(misc(
            "a multisignature address must require at least one key to redeem".into(),
        ));
    }
    if (keys.len() as i64) < required {
        return Err(misc(format!(
            "not enough keys supplied (got {} keys, but need at least {required} to redeem)",
            keys.len(),
        )));
    }
    if keys.len() > address::MAX_MULTISIG_KEYS {
        return Err(misc(format!(
            "Number of addresses involved in the multisignature address creation > {}",
            address::MAX_MULTISIG_KEYS,
        )));
    }

    let wallet = KeyStore::new(ctx.conn, ctx.network);
    let pubkeys = keys
        .iter()
        .map(|key| match key {
            Value::String(key) => resolve_pubkey(ctx, &wallet, key),
            other => Err(type_mismatch("str", other)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    // `required` is within 1..=16 here.
    let script = address::multisig_script(required as usize, &pubkeys);
    let address = wallet.add_script(&script, account)?;

    Ok(Value::String(address.encode(ctx.network)))
}

/// Returns the serialized public key named by `key`, which is either a wallet address
/// or a hex-encoded public key.
fn resolve_pubkey(
    ctx: &CallContext<'_>,
    wallet: &KeyStore<'_>,
    key: &str,
) -> Result<Vec<u8>, CallError> {
    match Address::decode(ctx.network, key) {
        Ok(address) if address.is_script() => {
            Err(misc(format!("{key} is a pay-to-script address")))
        }
        Ok(address) => wallet
            .pubkey(&address)?
            .ok_or_else(|| misc(format!("no full public key for address {key}"))),
        Err(_) => {
            let invalid = || misc(format!("Invalid public key: {key}"));
            let bytes = hex::decode(key).map_err(|_| invalid())?;
            // Parsing checks the length, the prefix, and that the point is on the curve.
            PublicKey::from_slice(&bytes).map_err(|_| invalid())?;
            Ok(bytes)
        }
    }
}

fn misc(message: String) -> CallError {
    LegacyCode::Misc.with_message(message).into()
}

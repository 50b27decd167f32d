use serde::Serialize;
use serde_json::Value;

use super::{check_arity, str_param};
use crate::{
    address::Address,
    components::{
        json_rpc::registry::{CallContext, CallError, CallResult},
        keystore::{KeyStore, WalletOwnership},
    },
};

const USAGE: &str = "validateaddress <paycoinaddress>\n\
    Return information about <paycoinaddress>.";

/// The result of validating a Paycoin address.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct ValidateAddress {
    /// Whether the address is valid.
    isvalid: bool,

    /// The normalized address string.
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,

    /// The hex-encoded scriptPubKey generated for the address.
    #[serde(rename = "scriptPubKey", skip_serializing_if = "Option::is_none")]
    script_pub_key: Option<String>,

    /// Whether the address is a P2SH (script) address.
    #[serde(skip_serializing_if = "Option::is_none")]
    isscript: Option<bool>,

    /// Whether the wallet holds the key for the address.
    #[serde(skip_serializing_if = "Option::is_none")]
    ismine: Option<bool>,
}

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 1, 1, help, USAGE)?;
    let address = str_param(params, 0)?;

    let result = match Address::decode(ctx.network, address) {
        Err(_) => ValidateAddress {
            isvalid: false,
            address: None,
            script_pub_key: None,
            isscript: None,
            ismine: None,
        },
        Ok(decoded) => ValidateAddress {
            isvalid: true,
            address: Some(decoded.encode(ctx.network)),
            script_pub_key: Some(hex::encode(decoded.script_pubkey())),
            isscript: Some(decoded.is_script()),
            ismine: Some(KeyStore::new(ctx.conn, ctx.network).is_mine(&decoded)?),
        },
    };

    serde_json::to_value(result).map_err(|e| CallError::Fault(e.into()))
}

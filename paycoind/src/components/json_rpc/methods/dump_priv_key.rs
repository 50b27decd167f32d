use secrecy::ExposeSecret;
use serde_json::Value;

use super::{check_arity, str_param};
use crate::{
    address::Address,
    components::{
        json_rpc::{
            registry::{CallContext, CallResult},
            server::LegacyCode,
        },
        keystore::KeyStore,
    },
};

const USAGE: &str = "dumpprivkey <paycoinaddress>\n\
    Reveals the private key corresponding to <paycoinaddress>.";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 1, 1, help, USAGE)?;
    let address = Address::decode(ctx.network, str_param(params, 0)?).map_err(|_| {
        LegacyCode::InvalidAddressOrKey.with_static("Invalid Paycoin address")
    })?;

    let wif = KeyStore::new(ctx.conn, ctx.network).dump_wif(&address)?;

    Ok(Value::String(wif.expose_secret().clone()))
}

use serde_json::Value;

use super::{check_arity, opt_bool_param, opt_str_param, str_param};
use crate::components::{
    json_rpc::registry::{CallContext, CallResult},
    keystore::KeyStore,
};

const USAGE: &str = "importprivkey <paycoinprivkey> [label] [rescan=true]\n\
    Adds a private key (as returned by dumpprivkey) to your wallet.";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 1, 3, help, USAGE)?;
    let wif = str_param(params, 0)?;
    let label = opt_str_param(params, 1)?;
    // There is no local chain to rescan; the flag is only type-checked.
    opt_bool_param(params, 2)?;

    KeyStore::new(ctx.conn, ctx.network).import_wif(wif, label)?;

    Ok(Value::Null)
}

use serde_json::Value;

use super::{check_arity, opt_str_param};
use crate::components::{
    json_rpc::registry::{CallContext, CallResult},
    keystore::KeyStore,
};

const USAGE: &str = "getnewaddress [account]\n\
    Returns a new Paycoin address for receiving payments.  \
    If [account] is specified, it is added to the address book \
    so payments received with the address will be credited to [account].";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 0, 1, help, USAGE)?;
    let label = opt_str_param(params, 0)?;

    let address = KeyStore::new(ctx.conn, ctx.network).generate(label)?;

    Ok(Value::String(address.encode(ctx.network)))
}

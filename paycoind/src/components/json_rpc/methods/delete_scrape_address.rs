use serde_json::Value;

use super::{check_arity, str_param};
use crate::components::{
    json_rpc::registry::{CallContext, CallResult},
    keystore::KeyStore,
    scrapes::ScrapeStore,
};

const USAGE: &str = "deletescrapeaddress <staking address>\n\
    Delete the auto scrape address for a given address.";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 1, 1, help, USAGE)?;
    let staking = str_param(params, 0)?;

    let wallet = KeyStore::new(ctx.conn, ctx.network);
    ScrapeStore::new(ctx.conn, ctx.network).delete(&wallet, staking)?;

    Ok(Value::Bool(true))
}

use serde_json::Value;

use super::{check_arity, str_param};
use crate::components::{
    json_rpc::registry::{CallContext, CallResult},
    keystore::KeyStore,
    scrapes::ScrapeStore,
};

const USAGE: &str = "getscrapeaddress <staking address>\n\
    Get the auto scrape address for a given address.";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 1, 1, help, USAGE)?;
    let staking = str_param(params, 0)?;

    let wallet = KeyStore::new(ctx.conn, ctx.network);
    let scrape = ScrapeStore::new(ctx.conn, ctx.network).get(&wallet, staking)?;

    Ok(Value::String(scrape))
}

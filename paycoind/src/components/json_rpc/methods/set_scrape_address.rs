use serde_json::Value;

use super::{check_arity, str_param};
use crate::components::{
    json_rpc::registry::{CallContext, CallResult},
    keystore::KeyStore,
    scrapes::ScrapeStore,
};

const USAGE: &str = "setscrapeaddress <staking address> <address>\n\
    Set an auto scrape address to send stake rewards to from a given address.\n\
    Only one scrape address can be set per staking address.";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 2, 2, help, USAGE)?;
    let staking = str_param(params, 0)?;
    let scrape = str_param(params, 1)?;

    let wallet = KeyStore::new(ctx.conn, ctx.network);
    let scrape = ScrapeStore::new(ctx.conn, ctx.network).set(&wallet, staking, scrape)?;

    Ok(Value::String(scrape))
}

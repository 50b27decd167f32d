use serde::Serialize;
use serde_json::Value;

use super::check_arity;
use crate::components::{
    json_rpc::registry::{CallContext, CallError, CallResult},
    scrapes::{ScrapeRecord, ScrapeStore},
};

const USAGE: &str = "listscrapeaddresses\n\
    List all the defined scrape addresses.";

/// One entry of the `listscrapeaddresses` result.
#[derive(Clone, Debug, Serialize)]
struct Entry {
    stakingaddress: String,
    scrapeaddress: String,
}

impl From<ScrapeRecord> for Entry {
    fn from(record: ScrapeRecord) -> Self {
        Self {
            stakingaddress: record.staking_address,
            scrapeaddress: record.scrape_address,
        }
    }
}

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 0, 0, help, USAGE)?;

    let entries = ScrapeStore::new(ctx.conn, ctx.network)
        .list()?
        .into_iter()
        .map(Entry::from)
        .collect::<Vec<_>>();

    serde_json::to_value(entries).map_err(|e| CallError::Fault(e.into()))
}

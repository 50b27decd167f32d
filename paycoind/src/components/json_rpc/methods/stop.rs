use std::time::Duration;

use serde_json::Value;

use super::check_arity;
use crate::components::json_rpc::registry::{CallContext, CallResult};

const USAGE: &str = "stop\n\
    Stop Paycoin server.";

/// Lets the response reach the caller before the server goes down.
const SHUTDOWN_DELAY: Duration = Duration::from_millis(100);

pub(super) fn call(_ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 0, 0, help, USAGE)?;

    tokio::spawn(async {
        tokio::time::sleep(SHUTDOWN_DELAY).await;
        request_shutdown();
    });

    Ok(Value::String("Paycoin server stopping".into()))
}

/// Asks the process to shut down through the same path as Ctrl-C.
fn request_shutdown() {
    #[cfg(unix)]
    if let Err(e) = nix::sys::signal::raise(nix::sys::signal::SIGINT) {
        tracing::error!("Failed to request shutdown: {e}");
    }

    #[cfg(not(unix))]
    {
        tracing::error!("The stop method is not supported on this platform");
    }
}

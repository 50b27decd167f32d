//! JSON-RPC endpoint.
//!
//! Methods are held in an immutable [`CommandTable`] built at startup, and every call
//! goes through the [`Dispatcher`], which applies the safe-mode policy and normalizes
//! failures into Bitcoin RPC error codes. Command-line callers convert their string
//! arguments with [`convert`] first.

use tracing::{info, warn};

use crate::{
    config::RpcSection,
    error::{Error, ErrorKind},
};

use super::{TaskHandle, database::Database};

#[cfg(feature = "rpc-cli")]
pub(crate) mod client;
pub(crate) mod convert;
mod dispatcher;
pub(crate) mod methods;
mod registry;
pub(crate) mod server;


pub(crate) use dispatcher::{Dispatcher, SafeMode};
pub(crate) use registry::CommandTable;

#[derive(Debug)]
pub(crate) struct JsonRpc {}

impl JsonRpc {
    /// Opens the RPC endpoint and spawns the task that serves it.
    pub(crate) async fn spawn(config: &RpcSection, db: Database) -> Result<TaskHandle, Error> {
        let listen_addr = match config.bind.as_slice() {
            [] => {
                return Err(ErrorKind::Init
                    .context("Configure `rpc.bind` to start the RPC server")
                    .into());
            }
            [addr] => *addr,
            _ => {
                return Err(ErrorKind::Init
                    .context("Only one RPC bind address is supported (for now)")
                    .into());
            }
        };
        let users = server::Users::from_config(&config.auth)?;

        let safe_mode = SafeMode::from_config(config);
        if config.disable_safe_mode() {
            warn!("Safe mode is disabled; every RPC method stays available during alerts");
        } else if safe_mode.is_active() {
            warn!("Starting in safe mode for testing");
        }

        let commands = CommandTable::build(methods::all().iter().copied())?;
        let dispatcher = Dispatcher::new(commands, db, safe_mode);

        info!("Spawning RPC server");
        info!("Trying to open RPC endpoint at {}...", listen_addr);
        let (_, handle) =
            server::spawn(listen_addr, config.timeout(), users, dispatcher).await?;

        Ok(crate::spawn!("JSON-RPC server", async move {
            handle.stopped().await;
            Ok(())
        }))
    }
}

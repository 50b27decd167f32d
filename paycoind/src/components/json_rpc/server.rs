//! JSON-RPC server that is compatible with `bitcoind`-style clients.

use std::net::SocketAddr;
use std::time::Duration;

use jsonrpsee::server::{RpcServiceBuilder, Server, ServerHandle};
use tracing::info;

use crate::error::{Error, ErrorKind};

use super::Dispatcher;

mod authorization;
pub(crate) use authorization::{PasswordHash, Users};

mod error;
pub(crate) use error::LegacyCode;

mod http_request_compatibility;
mod rpc_call_compatibility;

/// Starts serving `dispatcher` on `listen_addr`.
///
/// Returns the bound address and a handle that resolves once the server stops.
pub(crate) async fn spawn(
    listen_addr: SocketAddr,
    timeout: Duration,
    users: Users,
    dispatcher: Dispatcher,
) -> Result<(SocketAddr, ServerHandle), Error> {
    let http_middleware = tower::ServiceBuilder::new()
        .layer(authorization::AuthorizationLayer::new(users))
        .layer(http_request_compatibility::HttpRequestMiddlewareLayer::default())
        .timeout(timeout);

    let rpc_middleware = RpcServiceBuilder::new()
        .rpc_logger(1024)
        .layer_fn(rpc_call_compatibility::FixRpcResponseMiddleware::new);

    let server_instance = Server::builder()
        .http_only()
        .set_http_middleware(http_middleware)
        .set_rpc_middleware(rpc_middleware)
        .build(listen_addr)
        .await
        .map_err(|e| ErrorKind::Init.context(e))?;
    let addr = server_instance
        .local_addr()
        .map_err(|e| ErrorKind::Init.context(e))?;
    info!("Opened RPC endpoint at {}", addr);

    let rpc_module = dispatcher.into_rpc_module()?;

    Ok((addr, server_instance.start(rpc_module)))
}

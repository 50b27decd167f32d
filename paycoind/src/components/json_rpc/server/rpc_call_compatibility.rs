//! Compatibility fixes for JSON-RPC remote procedure calls.
//!
//! These fixes are applied at the JSON-RPC call level,
//! after the RPC request is parsed and split into calls.

use futures::future::BoxFuture;
use jsonrpsee::{
    MethodResponse,
    server::middleware::rpc::{RpcService, RpcServiceT, layer::ResponseFuture},
    types::{ErrorCode, ErrorObject, Id},
};
use tracing::debug;

use crate::components::json_rpc::server::error::LegacyCode;

/// JSON-RPC middleware that makes framework error codes match `bitcoind`.
///
/// [`jsonrpsee`] reports failures inside the framework with the JSON-RPC 2.0
/// `InternalError` code (`-32603`). Bitcoin-style clients only know the node's own
/// enumeration, in which an unclassified failure is [`LegacyCode::Misc`].
pub(crate) struct FixRpcResponseMiddleware {
    service: RpcService,
}

impl FixRpcResponseMiddleware {
    pub(crate) fn new(service: RpcService) -> Self {
        Self { service }
    }
}

impl<'a> RpcServiceT<'a> for FixRpcResponseMiddleware {
    type Future = ResponseFuture<BoxFuture<'a, MethodResponse>>;

    fn call(&self, request: jsonrpsee::types::Request<'a>) -> Self::Future {
        let service = self.service.clone();
        ResponseFuture::future(Box::pin(async move {
            let response = service.call(request).await;
            match response.as_error_code() {
                Some(code) if code == ErrorCode::InternalError.code() => {
                    let new_error_code = LegacyCode::Misc.into();
                    debug!("Replacing RPC error: {code} with {new_error_code}");
                    match rewrite_error(response.as_result(), new_error_code) {
                        Some(fixed) => fixed,
                        None => response,
                    }
                }
                _ => response,
            }
        }))
    }
}

/// Rebuilds an error response with a different code, keeping its id and message.
fn rewrite_error(response: &str, code: i32) -> Option<MethodResponse> {
    let json: serde_json::Value = serde_json::from_str(response).ok()?;
    let id = match &json["id"] {
        serde_json::Value::Null => Id::Null,
        serde_json::Value::Number(n) => Id::Number(n.as_u64()?),
        serde_json::Value::String(s) => Id::Str(s.clone().into()),
        _ => return None,
    };
    let message = json["error"]["message"]
        .as_str()
        .unwrap_or("Internal error")
        .to_owned();

    Some(MethodResponse::error(
        id,
        ErrorObject::owned(code, message, None::<()>),
    ))
}

//! Compatibility fixes for JSON-RPC HTTP requests.
//!
//! These fixes are applied at the HTTP level, before the RPC request is parsed.

use std::future::Future;
use std::pin::Pin;

use futures::FutureExt;
use http_body_util::BodyExt;
use hyper::{StatusCode, header};
use jsonrpsee::{
    core::BoxError,
    server::{HttpBody, HttpRequest, HttpResponse},
    types::{ErrorCode, ErrorObject},
};
use serde::{Deserialize, Serialize};
use tower::Service;

/// HTTP middleware with compatibility workarounds for Bitcoin-style RPC clients.
///
/// ### Map between the client's JSON-RPC version and JSON-RPC 2.0.
///
/// [`jsonrpsee`] only supports JSON-RPC 2.0, while `paycoind` clients speak the
/// "Bitcoin JSON-RPC" of `bitcoind` (a mix of 1.0, 1.1, and 2.0): requests carry no
/// `jsonrpc` member, and responses always carry both `result` and `error`, with the
/// HTTP status reflecting the error.
///
/// ### Add missing `content-type` HTTP header
///
/// Bitcoin-style clients commonly send no `content-type`, or `text/plain`. Unlike web
/// browsers, [`jsonrpsee`] does not do content sniffing, so we assume such content is
/// JSON and let the parser error if we are incorrect.
#[derive(Clone, Debug)]
pub(crate) struct HttpRequestMiddleware<S> {
    service: S,
}

impl<S> HttpRequestMiddleware<S> {
    /// Sets the `content-type` HTTP header to `application/json` if it is missing or
    /// starts with `text/plain`.
    ///
    /// Other content types are left for [`jsonrpsee`] to reject. In particular,
    /// `application/x-www-form-urlencoded` must stay rejected, so that browser forms
    /// can't be used to attack a local RPC port.
    fn insert_or_replace_content_type_header(headers: &mut header::HeaderMap) {
        let plain_or_missing = headers.get(header::CONTENT_TYPE).is_none_or(|value| {
            value
                .to_str()
                .ok()
                .unwrap_or_default()
                .starts_with("text/plain")
        });

        if plain_or_missing {
            headers.insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            );
        }
    }

    /// Maps whatever JSON-RPC version the client is using to JSON-RPC 2.0.
    ///
    /// Also returns the client's request id when it had to be replaced, because
    /// [`jsonrpsee`] would not accept it.
    async fn request_to_json_rpc_2(
        request: HttpRequest<HttpBody>,
    ) -> Result<(JsonRpcVersion, Option<serde_json::Value>, HttpRequest<HttpBody>), BoxError>
    {
        let (parts, body) = request.into_parts();
        let bytes = body.collect().await?.to_bytes();

        let (version, client_id, bytes) =
            match serde_json::from_slice::<'_, JsonRpcRequest>(bytes.as_ref()) {
                Ok(request) => match request.version() {
                    JsonRpcVersion::Unknown => (JsonRpcVersion::Unknown, None, bytes.to_vec()),
                    version => {
                        let (request, client_id) = request.into_2();
                        (version, client_id, serde_json::to_vec(&request)?)
                    }
                },
                _ => (JsonRpcVersion::Unknown, None, bytes.to_vec()),
            };

        Ok((
            version,
            client_id,
            HttpRequest::from_parts(parts, HttpBody::from(bytes)),
        ))
    }

    /// Maps JSON-RPC 2.0 to whatever JSON-RPC version the client is using, restoring
    /// the client's request id if it was replaced.
    async fn response_from_json_rpc_2(
        version: JsonRpcVersion,
        client_id: Option<serde_json::Value>,
        response: HttpResponse<HttpBody>,
    ) -> Result<HttpResponse<HttpBody>, BoxError> {
        let (mut parts, body) = response.into_parts();
        let bytes = body.collect().await?.to_bytes();

        let bytes = match serde_json::from_slice::<'_, JsonRpcResponse>(bytes.as_ref()) {
            Ok(mut response) => {
                if let Some(id) = client_id {
                    response.id = id;
                }

                // Bitcoin-flavoured clients expect the HTTP status to reflect the error.
                if let JsonRpcVersion::Bitcoind = version {
                    if let Some(e) = response
                        .error
                        .as_ref()
                        .and_then(|e| serde_json::from_str::<'_, ErrorObject<'_>>(e.get()).ok())
                    {
                        parts.status = match e.code().into() {
                            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
                            ErrorCode::MethodNotFound => StatusCode::NOT_FOUND,
                            _ => StatusCode::INTERNAL_SERVER_ERROR,
                        };
                    }
                }

                serde_json::to_vec(&response.into_version(version))?
            }
            _ => bytes.to_vec(),
        };

        // The body changed size.
        parts.headers.remove(header::CONTENT_LENGTH);

        Ok(HttpResponse::from_parts(parts, HttpBody::from(bytes)))
    }
}

/// Implements [`tower::Layer`] for [`HttpRequestMiddleware`].
#[derive(Clone, Default)]
pub(crate) struct HttpRequestMiddlewareLayer {}

impl<S> tower::Layer<S> for HttpRequestMiddlewareLayer {
    type Service = HttpRequestMiddleware<S>;

    fn layer(&self, service: S) -> Self::Service {
        HttpRequestMiddleware { service }
    }
}

impl<S> Service<HttpRequest<HttpBody>> for HttpRequestMiddleware<S>
where
    S: Service<HttpRequest, Response = HttpResponse> + Clone + Send + 'static,
    S::Error: Into<BoxError> + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: HttpRequest<HttpBody>) -> Self::Future {
        Self::insert_or_replace_content_type_header(request.headers_mut());

        let mut service = self.service.clone();

        async move {
            let (version, client_id, request) = Self::request_to_json_rpc_2(request).await?;
            let response = service.call(request).await.map_err(Into::into)?;
            Self::response_from_json_rpc_2(version, client_id, response).await
        }
        .boxed()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JsonRpcVersion {
    /// `bitcoind` style: no `jsonrpc` member, with `params` and `id`.
    Bitcoind,
    /// The client is indicating strict 2.0 handling.
    TwoPointZero,
    /// On parse errors we don't modify anything, and let [`jsonrpsee`] handle it.
    Unknown,
}

/// Stands in for request ids that [`jsonrpsee`] cannot represent.
const PLACEHOLDER_ID: &str = "paycoind-client-id";

/// A version-agnostic JSON-RPC request.
#[derive(Debug, Deserialize, Serialize)]
struct JsonRpcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    jsonrpc: Option<String>,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Box<serde_json::value::RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    fn version(&self) -> JsonRpcVersion {
        match (self.jsonrpc.as_deref(), &self.params, &self.id) {
            (
                Some("2.0"),
                _,
                None
                | Some(
                    serde_json::Value::Null
                    | serde_json::Value::String(_)
                    | serde_json::Value::Number(_),
                ),
            ) => JsonRpcVersion::TwoPointZero,
            (None, Some(_), Some(_)) => JsonRpcVersion::Bitcoind,
            _ => JsonRpcVersion::Unknown,
        }
    }

    /// Converts this into a JSON-RPC 2.0 request.
    ///
    /// `bitcoind` echoes any JSON value as the id, but [`jsonrpsee`] only accepts
    /// unsigned integers, strings, and `null`. Other ids are swapped for
    /// [`PLACEHOLDER_ID`] and returned, so the response can carry them back.
    fn into_2(mut self) -> (Self, Option<serde_json::Value>) {
        self.jsonrpc = Some("2.0".into());

        let supported = match &self.id {
            None | Some(serde_json::Value::Null | serde_json::Value::String(_)) => true,
            Some(serde_json::Value::Number(n)) => n.as_u64().is_some(),
            Some(_) => false,
        };
        let client_id = if supported {
            None
        } else {
            self.id
                .replace(serde_json::Value::String(PLACEHOLDER_ID.into()))
        };

        (self, client_id)
    }
}

/// A version-agnostic JSON-RPC response.
#[derive(Debug, Deserialize, Serialize)]
struct JsonRpcResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    jsonrpc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Box<serde_json::value::RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Box<serde_json::value::RawValue>>,
    id: serde_json::Value,
}

impl JsonRpcResponse {
    fn into_version(mut self, version: JsonRpcVersion) -> Self {
        let json_null = || serde_json::value::to_raw_value(&()).ok();

        match version {
            JsonRpcVersion::Bitcoind => {
                self.jsonrpc = None;
                self.result = self.result.or_else(json_null);
                self.error = self.error.or_else(json_null);
            }
            JsonRpcVersion::TwoPointZero => {
                // A valid result of `null` is parsed into `None` here, so restore it when
                // there is no error.
                if self.error.is_none() {
                    self.result = self.result.or_else(json_null);
                }
            }
            JsonRpcVersion::Unknown => (),
        }
        self
    }
}

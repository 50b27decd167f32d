//! A client for `paycoind`-compatible JSON-RPC servers.

use std::net::SocketAddr;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use jsonrpsee::core::{
    client::{ClientT, Error as ClientError},
    params::ArrayParams,
};
use jsonrpsee_http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::convert;

/// A connection to a JSON-RPC server using HTTP Basic authentication.
pub(crate) struct RpcClient {
    inner: HttpClient,
}

impl RpcClient {
    /// Prepares a client for the server at `addr`.
    ///
    /// No connection is made until the first call.
    pub(crate) fn new(
        addr: SocketAddr,
        user: &str,
        password: &SecretString,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let credentials = Base64::encode_string(
            format!("{user}:{}", password.expose_secret()).as_bytes(),
        );
        let mut auth = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| ClientError::Custom(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", auth);

        let inner = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(timeout)
            .build(format!("http://{addr}"))?;

        Ok(Self { inner })
    }

    /// Calls `method` with positional JSON parameters.
    ///
    /// Failures reported by the server come back as [`ClientError::Call`].
    pub(crate) async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        let mut array = ArrayParams::new();
        for param in params {
            array.insert(param)?;
        }
        self.inner.request(method, array).await
    }

    /// Calls `method` with command-line arguments, converting them to JSON first.
    pub(crate) async fn call_with_strings(
        &self,
        method: &str,
        args: &[String],
    ) -> Result<Value, ClientError> {
        let params = convert::convert(method, args).map_err(ClientError::Call)?;
        self.call(method, params).await
    }
}

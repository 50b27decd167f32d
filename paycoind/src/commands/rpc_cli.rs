//! `rpc` subcommand

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use abscissa_core::{Runnable, Shutdown};
use jsonrpsee::core::client::Error as ClientError;
use secrecy::SecretString;

use crate::{
    cli::RpcCliCmd, components::json_rpc::client::RpcClient, error::Error, prelude::*,
};

macro_rules! wfl {
    ($f:ident, $message_id:literal) => {
        write!($f, "{}", $crate::fl!($message_id))
    };

    ($f:ident, $message_id:literal, $($args:expr),* $(,)?) => {
        write!($f, "{}", $crate::fl!($message_id, $($args), *))
    };
}

impl RpcCliCmd {
    /// Picks the credentials to authenticate with.
    ///
    /// Command-line flags win over the config file. Entries that only carry a `pwhash`
    /// cannot be used by a client.
    fn credentials(&self) -> Result<(String, SecretString), RpcCliError> {
        let config = APP.config();
        let from_config = config.rpc.auth.iter().find(|auth| {
            auth.password.is_some()
                && self.rpcuser.as_ref().is_none_or(|user| user == &auth.user)
        });

        let user = self
            .rpcuser
            .clone()
            .or_else(|| from_config.map(|auth| auth.user.clone()))
            .ok_or(RpcCliError::MissingCredentials)?;
        let password = self
            .rpcpassword
            .clone()
            .map(SecretString::new)
            .or_else(|| from_config.and_then(|auth| auth.password.clone()))
            .ok_or(RpcCliError::MissingCredentials)?;

        Ok((user, password))
    }

    async fn start(&self) -> Result<(), Error> {
        let config = APP.config();
        let (user, password) = self.credentials()?;

        let addr = server_addr(&config.rpc.bind)?;
        // The client only connects when the call is made, so connection failures
        // surface as failed requests.
        let client = RpcClient::new(addr, &user, &password, config.rpc.timeout())
            .map_err(|_| RpcCliError::FailedToConnect)?;

        let response = client
            .call_with_strings(&self.command, &self.params)
            .await
            .map_err(|e| match e {
                ClientError::Call(e) if e.code() == -3 && e.message().starts_with("Error parsing") => {
                    RpcCliError::InvalidParameter(e.message().to_owned())
                }
                ClientError::Call(e) => RpcCliError::RequestFailed(format!(
                    "error code: {}\nerror message:\n{}",
                    e.code(),
                    e.message(),
                )),
                e => RpcCliError::RequestFailed(e.to_string()),
            })?;

        match response {
            serde_json::Value::Null => (),
            serde_json::Value::String(s) => println!("{s}"),
            _ => {
                let pretty = serde_json::to_string_pretty(&response)
                    .map_err(|e| RpcCliError::RequestFailed(e.to_string()))?;
                println!("{pretty}");
            }
        }

        Ok(())
    }
}

/// Returns the address to reach the server at.
///
/// The server listens on the first `rpc.bind` address. A wildcard listen address is
/// reached over loopback.
fn server_addr(bind: &[SocketAddr]) -> Result<SocketAddr, RpcCliError> {
    let mut addr = *bind.first().ok_or(RpcCliError::NoRpcServer)?;
    let loopback: IpAddr = match addr.ip() {
        IpAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
        IpAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
    };
    if addr.ip().is_unspecified() {
        addr.set_ip(loopback);
    }
    Ok(addr)
}

impl Runnable for RpcCliCmd {
    fn run(&self) {
        match abscissa_tokio::run(&APP, self.start()) {
            Ok(Ok(())) => (),
            Ok(Err(e)) => {
                eprintln!("{}", e);
                APP.shutdown_with_exitcode(Shutdown::Forced, 1);
            }
            Err(e) => {
                eprintln!("{}", e);
                APP.shutdown_with_exitcode(Shutdown::Forced, 1);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RpcCliError {
    FailedToConnect,
    InvalidParameter(String),
    MissingCredentials,
    NoRpcServer,
    RequestFailed(String),
}

impl fmt::Display for RpcCliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedToConnect => wfl!(f, "err-rpc-cli-conn-failed"),
            Self::InvalidParameter(e) => wfl!(f, "err-rpc-cli-invalid-param", error = e),
            Self::MissingCredentials => wfl!(f, "err-rpc-cli-no-credentials"),
            Self::NoRpcServer => wfl!(f, "err-rpc-cli-no-server"),
            Self::RequestFailed(e) => wfl!(f, "err-rpc-cli-request-failed", error = e),
        }
    }
}

impl std::error::Error for RpcCliError {}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::{RpcCliError, server_addr};

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn picks_the_server_address() {
        assert_eq!(server_addr(&[]), Err(RpcCliError::NoRpcServer));
        assert_eq!(
            server_addr(&[addr("127.0.0.1:8999"), addr("10.0.0.1:8999")]),
            Ok(addr("127.0.0.1:8999")),
        );
        assert_eq!(server_addr(&[addr("0.0.0.0:8999")]), Ok(addr("127.0.0.1:8999")));
        assert_eq!(server_addr(&[addr("[::]:8999")]), Ok(addr("[::1]:8999")));
    }
}

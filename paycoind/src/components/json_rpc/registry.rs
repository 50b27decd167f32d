//! The table of RPC commands.

use std::collections::BTreeMap;
use std::fmt;

use abscissa_core::error::BoxError;
use jsonrpsee::types::{ErrorCode, ErrorObjectOwned};
use serde_json::Value;
use tracing::warn;

use super::server::LegacyCode;
use crate::{
    error::{Error, ErrorKind},
    network::Network,
};

/// Everything a command handler may touch while it runs.
pub(crate) struct CallContext<'a> {
    pub(crate) conn: &'a rusqlite::Connection,
    pub(crate) network: Network,
    pub(crate) commands: &'a CommandTable,
}

/// Ways in which a command handler can fail.
#[derive(Debug)]
pub(crate) enum CallError {
    /// The parameters did not match the command's signature, or help was requested.
    /// Carries the command's usage text.
    Usage(&'static str),
    /// A failure with a specific RPC error code.
    Rpc(ErrorObjectOwned),
    /// Any other failure. Reported to the caller as [`LegacyCode::Misc`].
    Fault(BoxError),
}

impl From<ErrorObjectOwned> for CallError {
    fn from(e: ErrorObjectOwned) -> Self {
        CallError::Rpc(e)
    }
}

impl From<rusqlite::Error> for CallError {
    fn from(e: rusqlite::Error) -> Self {
        CallError::Fault(e.into())
    }
}

impl CallError {
    /// Normalizes this failure into the error object sent on the wire.
    pub(crate) fn into_rpc(self, method: &str) -> ErrorObjectOwned {
        match self {
            CallError::Usage(usage) => {
                ErrorObjectOwned::owned(ErrorCode::InvalidParams.code(), usage, None::<()>)
            }
            CallError::Rpc(e) => e,
            CallError::Fault(e) => {
                warn!("RPC method {method} failed: {e}");
                LegacyCode::Misc.with_message(e.to_string())
            }
        }
    }
}

pub(crate) type CallResult = Result<Value, CallError>;

/// A command handler.
///
/// When `help` is `true` the handler must return [`CallError::Usage`] without side
/// effects.
pub(crate) type Actor = fn(&CallContext<'_>, &[Value], bool) -> CallResult;

#[derive(Clone, Copy)]
pub(crate) struct Command {
    pub(crate) name: &'static str,
    pub(crate) actor: Actor,
    /// Whether the command may run while safe mode is active.
    pub(crate) safe_mode_ok: bool,
    /// Whether the command changes wallet state, and so needs exclusive database access.
    pub(crate) mutates: bool,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("safe_mode_ok", &self.safe_mode_ok)
            .field("mutates", &self.mutates)
            .finish_non_exhaustive()
    }
}

/// The immutable mapping from method names to commands.
#[derive(Debug)]
pub(crate) struct CommandTable {
    commands: BTreeMap<&'static str, Command>,
}

impl CommandTable {
    /// Builds the table, refusing empty or duplicate names.
    pub(crate) fn build(commands: impl IntoIterator<Item = Command>) -> Result<Self, Error> {
        let mut table = BTreeMap::new();
        for command in commands {
            if command.name.is_empty() {
                return Err(ErrorKind::Init
                    .context("RPC command names must not be empty")
                    .into());
            }
            if table.insert(command.name, command).is_some() {
                return Err(ErrorKind::Init
                    .context(format!("RPC command {} is registered twice", command.name))
                    .into());
            }
        }
        Ok(Self { commands: table })
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Returns the command names in sorted order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// Returns the usage text of `name`, as produced by its handler in help mode.
    pub(crate) fn usage(&self, ctx: &CallContext<'_>, name: &str) -> Option<String> {
        let command = self.get(name)?;
        Some(match (command.actor)(ctx, &[], true) {
            Err(CallError::Usage(usage)) => usage.to_owned(),
            // Handlers that ignore the help flag have no usage to offer.
            _ => name.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{CallContext, CallError, CallResult, Command, CommandTable};

    fn noop(_: &CallContext<'_>, _: &[Value], help: bool) -> CallResult {
        if help {
            return Err(CallError::Usage("noop\nDoes nothing."));
        }
        Ok(Value::Null)
    }

    fn command(name: &'static str) -> Command {
        Command {
            name,
            actor: noop,
            safe_mode_ok: true,
            mutates: false,
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert!(CommandTable::build([command("a"), command("b"), command("a")]).is_err());
        assert!(CommandTable::build([command("")]).is_err());
    }

    #[test]
    fn lookup_and_names() {
        let table = CommandTable::build([command("zeta"), command("alpha")]).unwrap();
        assert!(table.get("alpha").is_some());
        assert!(table.get("missing").is_none());
        assert_eq!(table.names().collect::<Vec<_>>(), ["alpha", "zeta"]);
    }

    #[test]
    fn usage_maps_to_invalid_params() {
        let err = CallError::Usage("noop\nDoes nothing.").into_rpc("noop");
        assert_eq!(err.code(), -32602);
        assert_eq!(err.message(), "noop\nDoes nothing.");

        let err = CallError::Fault("disk on fire".into()).into_rpc("noop");
        assert_eq!(err.code(), -1);
        assert_eq!(err.message(), "disk on fire");
    }
}

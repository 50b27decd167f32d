//! The RPC methods served by `paycoind`.
//!
//! Each method lives in its own module, exposing a `USAGE` string and a `call` handler
//! with the [`Actor`](super::registry::Actor) signature.

use serde_json::Value;

use super::{
    registry::{CallError, Command},
    server::LegacyCode,
};
use crate::components::{keystore::KeyError, scrapes::ScrapeError};

mod add_multisig_address;
mod delete_scrape_address;
mod dump_priv_key;
mod get_new_address;
mod get_scrape_address;
mod help;
mod import_priv_key;
mod list_scrape_addresses;
mod set_scrape_address;
mod stop;
mod validate_address;

static ALL: &[Command] = &[
    Command {
        name: "help",
        actor: help::call,
        safe_mode_ok: true,
        mutates: false,
    },
    Command {
        name: "stop",
        actor: stop::call,
        safe_mode_ok: true,
        mutates: false,
    },
    Command {
        name: "validateaddress",
        actor: validate_address::call,
        safe_mode_ok: true,
        mutates: false,
    },
    Command {
        name: "getnewaddress",
        actor: get_new_address::call,
        safe_mode_ok: true,
        mutates: true,
    },
    Command {
        name: "importprivkey",
        actor: import_priv_key::call,
        safe_mode_ok: false,
        mutates: true,
    },
    Command {
        name: "dumpprivkey",
        actor: dump_priv_key::call,
        safe_mode_ok: true,
        mutates: false,
    },
    Command {
        name: "addmultisigaddress",
        actor: add_multisig_address::call,
        safe_mode_ok: false,
        mutates: true,
    },
    Command {
        name: "setscrapeaddress",
        actor: set_scrape_address::call,
        safe_mode_ok: false,
        mutates: true,
    },
    Command {
        name: "getscrapeaddress",
        actor: get_scrape_address::call,
        safe_mode_ok: true,
        mutates: false,
    },
    Command {
        name: "deletescrapeaddress",
        actor: delete_scrape_address::call,
        safe_mode_ok: false,
        mutates: true,
    },
    Command {
        name: "listscrapeaddresses",
        actor: list_scrape_addresses::call,
        safe_mode_ok: true,
        mutates: false,
    },
];

/// Returns every command served by `paycoind`.
pub(crate) fn all() -> &'static [Command] {
    ALL
}

/// Fails with the usage text when help is requested or the parameter count is outside
/// `min..=max`.
fn check_arity(
    params: &[Value],
    min: usize,
    max: usize,
    help: bool,
    usage: &'static str,
) -> Result<(), CallError> {
    if help || params.len() < min || params.len() > max {
        Err(CallError::Usage(usage))
    } else {
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "real",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "array",
        Value::Object(_) => "obj",
    }
}

fn type_mismatch(expected: &str, value: &Value) -> CallError {
    LegacyCode::Type
        .with_message(format!("Expected type {expected}, got {}", type_name(value)))
        .into()
}

/// Returns the string parameter at `index`, if present.
fn opt_str_param(params: &[Value], index: usize) -> Result<Option<&str>, CallError> {
    match params.get(index) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(type_mismatch("str", other)),
    }
}

/// Returns the string parameter at `index`, which the arity check guarantees exists.
fn str_param(params: &[Value], index: usize) -> Result<&str, CallError> {
    opt_str_param(params, index)?
        .ok_or_else(|| LegacyCode::Misc.with_static("Missing parameter").into())
}

/// Returns the integer parameter at `index`, which the arity check guarantees exists.
fn int_param(params: &[Value], index: usize) -> Result<i64, CallError> {
    match params.get(index) {
        Some(Value::Number(n)) if !n.is_f64() => n
            .as_i64()
            .ok_or_else(|| LegacyCode::Type.with_static("Integer out of range").into()),
        Some(other) => Err(type_mismatch("int", other)),
        None => Err(LegacyCode::Misc.with_static("Missing parameter").into()),
    }
}

/// Returns the array parameter at `index`, which the arity check guarantees exists.
fn array_param(params: &[Value], index: usize) -> Result<&[Value], CallError> {
    match params.get(index) {
        Some(Value::Array(values)) => Ok(values),
        Some(other) => Err(type_mismatch("array", other)),
        None => Err(LegacyCode::Misc.with_static("Missing parameter").into()),
    }
}

fn opt_bool_param(params: &[Value], index: usize) -> Result<Option<bool>, CallError> {
    match params.get(index) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(type_mismatch("bool", other)),
    }
}

impl From<ScrapeError> for CallError {
    fn from(e: ScrapeError) -> Self {
        let code = match e {
            ScrapeError::InvalidStakingAddress | ScrapeError::InvalidScrapeAddress => {
                LegacyCode::InvalidAddressOrKey
            }
            ScrapeError::NotInWallet | ScrapeError::SameAsStaking | ScrapeError::NotFound(_) => {
                LegacyCode::Wallet
            }
            ScrapeError::Storage(e) => return CallError::Fault(e.into()),
        };
        code.with_message(e.to_string()).into()
    }
}

impl From<KeyError> for CallError {
    fn from(e: KeyError) -> Self {
        let code = match e {
            KeyError::InvalidEncoding | KeyError::WrongNetwork | KeyError::InvalidKey(_) => {
                LegacyCode::InvalidAddressOrKey
            }
            KeyError::UnknownAddress(_) => LegacyCode::Wallet,
            KeyError::Storage(e) => return CallError::Fault(e.into()),
        };
        code.with_message(e.to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CallError, all, array_param, check_arity, int_param, opt_bool_param, str_param};
    use crate::components::json_rpc::registry::CommandTable;

    #[test]
    fn command_table_builds() {
        let table = CommandTable::build(all().iter().copied()).unwrap();
        assert_eq!(table.names().count(), all().len());

        let unsafe_methods = all()
            .iter()
            .filter(|c| !c.safe_mode_ok)
            .map(|c| c.name)
            .collect::<Vec<_>>();
        assert_eq!(
            unsafe_methods,
            [
                "importprivkey",
                "addmultisigaddress",
                "setscrapeaddress",
                "deletescrapeaddress",
            ],
        );

        // Everything refused in safe mode writes to the wallet.
        assert!(all().iter().all(|c| c.safe_mode_ok || c.mutates));
        let readers = all()
            .iter()
            .filter(|c| !c.mutates)
            .map(|c| c.name)
            .collect::<Vec<_>>();
        assert_eq!(
            readers,
            [
                "help",
                "stop",
                "validateaddress",
                "dumpprivkey",
                "getscrapeaddress",
                "listscrapeaddresses",
            ],
        );
    }

    #[test]
    fn arity() {
        assert!(check_arity(&[json!("a")], 1, 2, false, "usage").is_ok());
        assert!(matches!(
            check_arity(&[], 1, 2, false, "usage"),
            Err(CallError::Usage("usage")),
        ));
        assert!(matches!(
            check_arity(&[json!("a")], 1, 1, true, "usage"),
            Err(CallError::Usage("usage")),
        ));
    }

    #[test]
    fn parameter_types() {
        let params = [json!("PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v"), json!(1)];
        assert_eq!(
            str_param(&params, 0).unwrap(),
            "PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v",
        );
        match str_param(&params, 1) {
            Err(CallError::Rpc(e)) => {
                assert_eq!(e.code(), -3);
                assert_eq!(e.message(), "Expected type str, got int");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(opt_bool_param(&params, 2).unwrap(), None);

        let params = [json!(2), json!(1.5), json!(["a"])];
        assert_eq!(int_param(&params, 0).unwrap(), 2);
        match int_param(&params, 1) {
            Err(CallError::Rpc(e)) => assert_eq!(e.message(), "Expected type int, got real"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(array_param(&params, 2).unwrap(), [json!("a")]);
        assert!(array_param(&params, 0).is_err());
    }
}

//! Conversion of command-line arguments into JSON-RPC parameters.
//!
//! Command-line callers can only supply strings. Each method declares the JSON type of
//! its positional parameters, and arguments are parsed accordingly before the request
//! is sent. Callers that build JSON themselves skip this step.

use phf::phf_map;
use serde_json::Value;

use super::server::LegacyCode;

/// The JSON type expected for a positional parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParamKind {
    /// Passed through as a JSON string.
    Str,
    /// A JSON number literal.
    Num,
    /// `true` or `false`.
    Bool,
    /// Any JSON literal (typically an array or object).
    Json,
}

use ParamKind::{Bool, Json, Num, Str};

/// Parameter types for each method that takes parameters.
///
/// Covers the methods served by `paycoind` as well as the wallet and chain methods of a
/// full node, so that the command-line client can talk to either.
static PARAM_KINDS: phf::Map<&'static str, &'static [ParamKind]> = phf_map! {
    "help" => &[Str],
    "stop" => &[],
    "validateaddress" => &[Str],
    "getnewaddress" => &[Str],
    "importprivkey" => &[Str, Str, Bool],
    "dumpprivkey" => &[Str],
    "setscrapeaddress" => &[Str, Str],
    "getscrapeaddress" => &[Str],
    "deletescrapeaddress" => &[Str],
    "listscrapeaddresses" => &[],
    "getblock" => &[Str, Bool],
    "getblockhash" => &[Num],
    "getrawtransaction" => &[Str, Num],
    "settxfee" => &[Num],
    "sendtoaddress" => &[Str, Num],
    "sendfrom" => &[Str, Str, Num, Num],
    "sendmany" => &[Str, Json, Num],
    "move" => &[Str, Str, Num, Num],
    "getbalance" => &[Str, Num],
    "getreceivedbyaddress" => &[Str, Num],
    "getreceivedbyaccount" => &[Str, Num],
    "listreceivedbyaddress" => &[Num, Bool],
    "listreceivedbyaccount" => &[Num, Bool],
    "listtransactions" => &[Str, Num, Num],
    "listaccounts" => &[Num],
    "listsinceblock" => &[Str, Num],
    "listunspent" => &[Num, Num, Json],
    "listminting" => &[Num, Num],
    "addmultisigaddress" => &[Num, Json],
    "createmultisig" => &[Num, Json],
    "createrawtransaction" => &[Json, Json],
    "signrawtransaction" => &[Str, Json, Json],
    "walletpassphrase" => &[Str, Num, Bool],
    "keypoolrefill" => &[Num],
    "reservebalance" => &[Bool, Num],
    "sendalert" => &[Str, Str, Num, Num, Num, Num, Num],
};

/// Returns the declared parameter types of `method`, if it is known.
pub(crate) fn param_kinds(method: &str) -> Option<&'static [ParamKind]> {
    PARAM_KINDS.get(method).copied()
}

/// Converts `args` into the JSON parameters expected by `method`.
///
/// Arguments beyond the declared parameters are parsed as JSON where possible and
/// otherwise passed as strings. Unknown methods receive every argument as a string.
pub(crate) fn convert(
    method: &str,
    args: &[String],
) -> Result<Vec<Value>, jsonrpsee::types::ErrorObjectOwned> {
    let Some(kinds) = param_kinds(method) else {
        return Ok(args.iter().cloned().map(Value::String).collect());
    };

    args.iter()
        .enumerate()
        .map(|(index, arg)| match kinds.get(index) {
            Some(Str) => Ok(Value::String(arg.clone())),
            Some(&kind) => parse_typed(arg, kind).ok_or_else(|| {
                LegacyCode::Type.with_message(format!(
                    "Error parsing parameter {index} of {method}: expected {}",
                    match kind {
                        Num => "a number",
                        Bool => "true or false",
                        Json | Str => "a JSON value",
                    },
                ))
            }),
            None => Ok(serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone()))),
        })
        .collect()
}

fn parse_typed(arg: &str, kind: ParamKind) -> Option<Value> {
    let value = serde_json::from_str::<Value>(arg).ok()?;
    let matches = match kind {
        Num => value.is_number(),
        Bool => value.is_boolean(),
        Json | Str => true,
    };
    matches.then_some(value)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::convert;

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strings_pass_through() {
        assert_eq!(
            convert(
                "setscrapeaddress",
                &args(&["PBMJh8s5cFz", "PAjArWaTwv8"])
            )
            .unwrap(),
            vec![json!("PBMJh8s5cFz"), json!("PAjArWaTwv8")],
        );
        // Even when they look like other JSON values.
        assert_eq!(
            convert("getnewaddress", &args(&["123"])).unwrap(),
            vec![json!("123")],
        );
    }

    #[test]
    fn typed_parameters() {
        assert_eq!(
            convert(
                "importprivkey",
                &args(&["U9nhhCCbFfY64wozUZ6ScrNNvBqhGtoi8cNHXmaLm3wi1VHtjhr8", "test", "false"]),
            )
            .unwrap(),
            vec![
                json!("U9nhhCCbFfY64wozUZ6ScrNNvBqhGtoi8cNHXmaLm3wi1VHtjhr8"),
                json!("test"),
                json!(false),
            ],
        );
        assert_eq!(
            convert("sendmany", &args(&["", r#"{"PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ":1.5}"#, "6"]))
                .unwrap()[1..],
            [json!({"PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ": 1.5}), json!(6)],
        );
    }

    #[test]
    fn type_mismatch_names_method_and_index() {
        let err = convert("getblockhash", &args(&["tip"])).unwrap_err();
        assert_eq!(err.code(), -3);
        assert!(err.message().contains("parameter 0 of getblockhash"));

        let err = convert("reservebalance", &args(&["1"])).unwrap_err();
        assert_eq!(err.code(), -3);
    }

    #[test]
    fn extra_arguments_are_best_effort() {
        assert_eq!(
            convert("getscrapeaddress", &args(&["PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v", "7", "x"]))
                .unwrap(),
            vec![
                json!("PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v"),
                json!(7),
                json!("x"),
            ],
        );
    }

    #[test]
    fn unknown_methods_get_strings() {
        assert_eq!(
            convert("frobnicate", &args(&["1", "true"])).unwrap(),
            vec![Value::String("1".into()), Value::String("true".into())],
        );
    }
}

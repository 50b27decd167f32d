use serde_json::Value;

use super::{check_arity, opt_str_param};
use crate::components::json_rpc::registry::{CallContext, CallResult};

const USAGE: &str = "help [command]\n\
    List commands, or get help for a command.";

pub(super) fn call(ctx: &CallContext<'_>, params: &[Value], help: bool) -> CallResult {
    check_arity(params, 0, 1, help, USAGE)?;

    let text = match opt_str_param(params, 0)? {
        Some(command) => ctx
            .commands
            .usage(ctx, command)
            .unwrap_or_else(|| format!("help: unknown command: {command}")),
        None => ctx
            .commands
            .names()
            .filter_map(|name| ctx.commands.usage(ctx, name))
            .map(|usage| usage.lines().next().unwrap_or_default().to_owned())
            .collect::<Vec<_>>()
            .join("\n"),
    };

    Ok(Value::String(text))
}

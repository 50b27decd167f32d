use std::path::PathBuf;

use abscissa_core::{Command, Runnable};
use clap::{Parser, builder::Styles};

use crate::fl;

#[derive(Debug, Parser, Command)]
#[command(author, about, version)]
#[command(help_template = format!("\
{{before-help}}{{about-with-newline}}
{}{}:{} {{usage}}

{{all-args}}{{after-help}}\
    ",
    Styles::default().get_usage().render(),
    fl!("usage-header"),
    Styles::default().get_usage().render_reset()))]
#[command(next_help_heading = fl!("flags-header"))]
pub struct EntryPoint {
    #[command(subcommand)]
    pub(crate) cmd: PaycoindCmd,

    /// Enable verbose logging
    #[arg(short, long)]
    pub(crate) verbose: bool,

    /// Specify the data directory (default: `$HOME/.paycoin`)
    #[arg(long)]
    pub(crate) datadir: Option<PathBuf>,

    /// Use the specified config file, relative to the data directory
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Debug, Parser, Command, Runnable)]
pub(crate) enum PaycoindCmd {
    /// Start the JSON-RPC server.
    Start(StartCmd),

    /// Generate an example `paycoind.toml` config.
    ExampleConfig(ExampleConfigCmd),

    /// Generate a `[[rpc.auth]]` entry for a new RPC user.
    AddRpcUser(AddRpcUserCmd),

    /// Send a command to a running paycoind.
    #[cfg(feature = "rpc-cli")]
    Rpc(RpcCliCmd),
}

/// `start` subcommand
#[derive(Debug, Parser, Command)]
pub(crate) struct StartCmd {}

/// `example-config` subcommand
#[derive(Debug, Parser, Command)]
pub(crate) struct ExampleConfigCmd {
    /// Where to write the example config (`-` for stdout, the default)
    #[arg(short, long)]
    pub(crate) output: Option<String>,

    /// Overwrite the output file if it exists
    #[arg(long)]
    pub(crate) force: bool,
}

/// `add-rpc-user` subcommand
#[derive(Debug, Parser, Command)]
pub(crate) struct AddRpcUserCmd {
    /// The username to add
    pub(crate) username: String,
}

/// `rpc` subcommand
#[cfg(feature = "rpc-cli")]
#[derive(Debug, Parser, Command)]
pub(crate) struct RpcCliCmd {
    /// Username for the RPC server (default: the first `[[rpc.auth]]` entry with a
    /// `password`)
    #[arg(long)]
    pub(crate) rpcuser: Option<String>,

    /// Password for the RPC server
    #[arg(long)]
    pub(crate) rpcpassword: Option<String>,

    /// The method to call
    pub(crate) command: String,

    /// Positional parameters, converted to JSON according to the method
    #[arg(allow_hyphen_values = true)]
    pub(crate) params: Vec<String>,
}

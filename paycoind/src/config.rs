//! paycoind Config

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use documented::{Documented, DocumentedFields};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::commands::{lock_datadir, resolve_datadir_path};
use crate::network::Network;

/// paycoind Configuration
///
/// Most fields are `Option<T>` to enable distinguishing between a user relying on a
/// default value (which may change over time), and a user explicitly configuring an
/// option with the current default value (which should be preserved). The sole exception
/// to this is `consensus.network`, which cannot change for the lifetime of the wallet.
#[derive(Clone, Debug, Default, Deserialize, Serialize, DocumentedFields)]
#[serde(deny_unknown_fields)]
pub struct PaycoindConfig {
    /// The data directory.
    ///
    /// This cannot be set in a config file; it must be provided on the command line, and
    /// is set to `None` until `EntryPoint::process_config` is called.
    #[serde(skip)]
    pub(crate) datadir: Option<PathBuf>,

    /// The consensus network this node belongs to.
    #[serde(default)]
    pub consensus: ConsensusSection,

    /// Settings for how wallet data is stored.
    #[serde(default)]
    pub database: DatabaseSection,

    /// Settings for the JSON-RPC interface.
    #[serde(default)]
    pub rpc: RpcSection,
}

impl PaycoindConfig {
    /// Returns the data directory to use.
    ///
    /// Only `pub(crate)` so it can be used in error messages. If you need to access a
    /// file in the datadir, use one of the dedicated path getters.
    pub(crate) fn datadir(&self) -> &Path {
        self.datadir
            .as_deref()
            .expect("must be set by command before running any code using paths")
    }

    /// Ensures only a single paycoind process is using the data directory.
    ///
    /// This should be called inside any command that writes to the datadir.
    pub(crate) fn lock_datadir(&self) -> Result<fmutex::Guard<'static>, crate::error::Error> {
        lock_datadir(self.datadir())
    }

    /// Returns the path to the wallet database.
    pub(crate) fn wallet_db_path(&self) -> PathBuf {
        resolve_datadir_path(self.datadir(), self.database.wallet_path())
    }
}

/// The consensus network this node belongs to.
///
/// Address and secret key encodings are network-specific, so this MUST match the network
/// of the node that the wallet is used with.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(deny_unknown_fields)]
pub struct ConsensusSection {
    /// Network type, either "main" or "test".
    #[serde(default)]
    pub network: Network,
}

/// Settings for how wallet data is stored.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    /// Path to the wallet database file.
    ///
    /// This can be either an absolute path, or a path relative to the data directory.
    /// Note that on Windows, you must either use single quotes for this field's value, or
    /// replace all backslashes `\` with forward slashes `/`.
    pub wallet: Option<PathBuf>,
}

impl DatabaseSection {
    /// Path to the wallet database file.
    ///
    /// Default is `wallet.db`.
    fn wallet_path(&self) -> &Path {
        self.wallet
            .as_deref()
            .unwrap_or_else(|| Path::new("wallet.db"))
    }
}

/// Settings for the JSON-RPC interface.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(deny_unknown_fields)]
pub struct RpcSection {
    /// Addresses to listen for JSON-RPC connections.
    ///
    /// Note: The RPC server is disabled by default, and `paycoind start` refuses to run
    /// without it. To enable the RPC server, set a listen address in the config:
    /// ```toml
    /// [rpc]
    /// bind = ["127.0.0.1:8999"]
    /// ```
    ///
    /// # Security
    ///
    /// If you bind the RPC port to a public IP address, anyone who learns an RPC
    /// password can control the wallet.
    #[serde(default)]
    pub bind: Vec<SocketAddr>,

    /// Timeout (in seconds) during HTTP requests.
    pub timeout: Option<u64>,

    /// Whether to keep every RPC method available while the node has raised a network
    /// warning.
    ///
    /// By default, methods that change wallet state are refused while a warning is
    /// active ("safe mode").
    pub disable_safe_mode: Option<bool>,

    /// Whether to start with a network warning raised, so that safe mode is active
    /// from startup.
    ///
    /// Lets RPC clients check how they handle `-2` (forbidden by safe mode) errors. Has
    /// no effect when `disable_safe_mode` is set.
    pub test_safe_mode: Option<bool>,

    /// A list of users for which access to the JSON-RPC interface is authorized.
    #[serde(default)]
    pub auth: Vec<RpcAuthSection>,
}

impl RpcSection {
    /// Timeout during HTTP requests.
    ///
    /// Default is 30 seconds.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(30))
    }

    /// Whether safe mode is disabled.
    ///
    /// Default is `false`.
    pub fn disable_safe_mode(&self) -> bool {
        self.disable_safe_mode.unwrap_or(false)
    }

    /// Whether to raise a test warning at startup.
    ///
    /// Default is `false`.
    pub fn test_safe_mode(&self) -> bool {
        self.test_safe_mode.unwrap_or(false)
    }
}

/// A user that is authorized to access the JSON-RPC interface.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(deny_unknown_fields)]
pub struct RpcAuthSection {
    /// The username for accessing the JSON-RPC interface.
    ///
    /// Each username must be unique. If duplicates are present, only one of the passwords
    /// will work.
    pub user: String,

    /// The password for this user.
    ///
    /// This cannot be set when `pwhash` is set.
    #[serde(default, serialize_with = "serialize_rpc_password")]
    pub password: Option<SecretString>,

    /// A hash of the password for this user.
    ///
    /// This can be generated with `paycoind add-rpc-user`.
    pub pwhash: Option<String>,
}

fn serialize_rpc_password<S: serde::Serializer>(
    password: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match password {
        Some(p) => p.expose_secret().serialize(serializer),
        None => None::<String>.serialize(serializer),
    }
}

impl PaycoindConfig {
    /// Generates an example config file, with all default values included as comments.
    pub fn generate_example() -> String {
        // Spell out every default, so that each documented field can show its value.
        let defaults = PaycoindConfig {
            datadir: None,
            consensus: ConsensusSection::default(),
            database: DatabaseSection {
                wallet: Some(DatabaseSection::default().wallet_path().to_path_buf()),
            },
            rpc: RpcSection {
                timeout: Some(RpcSection::default().timeout().as_secs()),
                disable_safe_mode: Some(RpcSection::default().disable_safe_mode()),
                test_safe_mode: Some(RpcSection::default().test_safe_mode()),
                ..RpcSection::default()
            },
        };
        let defaults = match toml::Value::try_from(&defaults) {
            Ok(toml::Value::Table(table)) => table,
            _ => toml::Table::new(),
        };

        let mut example = ExampleWriter {
            out: EXAMPLE_HEADER.to_owned(),
        };
        for section in Self::FIELD_NAMES {
            let defaults = defaults.get(*section).and_then(toml::Value::as_table);
            match *section {
                "consensus" => example.section::<ConsensusSection>(section, defaults),
                "database" => example.section::<DatabaseSection>(section, defaults),
                "rpc" => example.section::<RpcSection>(section, defaults),
                // Top-level fields correspond to CLI settings.
                _ => (),
            }
        }
        example.out
    }
}

const EXAMPLE_HEADER: &str = "\
# Default configuration for paycoind.
#
# This file is generated as an example using the current defaults. It can be used
# as a skeleton for custom configs.
#
# Required fields are uncommented and set to an example value. Every other field
# is commented out and shows its current default (or `UNSET` if it has none).
#
# Leaving a field commented out means that paycoind will always use the latest
# default value, even if it changes in future.
";

/// Fields that must appear uncommented in the example config.
const REQUIRED_FIELDS: &[(&str, &str)] = &[("consensus", "network")];

/// Renders config sections as commented TOML, using the doc comments of the config types.
struct ExampleWriter {
    out: String,
}

impl ExampleWriter {
    fn comment(&mut self, docs: &str) {
        for line in docs.lines() {
            // Strip the space after `///`, keeping any further indentation.
            let line = line.strip_prefix(' ').unwrap_or(line);
            if line.is_empty() {
                self.out.push_str("#\n");
            } else {
                self.out.push_str(&format!("# {line}\n"));
            }
        }
    }

    fn section<T: Documented + DocumentedFields>(
        &mut self,
        name: &str,
        defaults: Option<&toml::Table>,
    ) {
        self.out.push_str("\n#\n");
        self.comment(T::DOCS);
        self.out.push_str(&format!("#\n[{name}]\n\n"));
        self.fields::<T>(name, defaults);
    }

    /// Writes a section that may be repeated (`[[name]]`), commented out in full.
    fn list_section<T: Documented + DocumentedFields>(&mut self, name: &str) {
        self.out.push_str("\n#\n");
        self.comment(T::DOCS);
        self.out.push_str("#\n# Repeat this section to add more entries to the list.\n#\n");
        self.out.push_str(&format!("#[[{name}]]\n\n"));
        self.fields::<T>(name, None);
    }

    fn fields<T: DocumentedFields>(&mut self, section: &str, defaults: Option<&toml::Table>) {
        for field in T::FIELD_NAMES {
            if (section, *field) == ("rpc", "auth") {
                self.list_section::<RpcAuthSection>("rpc.auth");
                continue;
            }

            self.comment(T::get_field_docs(field).unwrap_or_default());
            let prefix = if REQUIRED_FIELDS.contains(&(section, *field)) {
                ""
            } else {
                "#"
            };
            let value = defaults
                .and_then(|table| table.get(*field))
                .map_or_else(|| "UNSET".to_owned(), toml::Value::to_string);
            self.out.push_str(&format!("{prefix}{field} = {value}\n\n"));
        }
    }
}

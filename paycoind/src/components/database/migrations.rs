//! The wallet database structure.
//!
//! The database structure is managed by [`Database::open`], which applies the migrations
//! in this module to produce the current structure.
//!
//! The SQL code in this module's constants encodes the current database structure, as
//! represented internally by SQLite. We do not use these constants at runtime; instead we
//! check the output of the migrations in a test, to pin the expected database structure.
//!
//! [`Database::open`]: super::Database::open

// The constants in this module are only used in tests, but `#[cfg(test)]` prevents them
// from showing up in `cargo doc --document-private-items`.
#![allow(dead_code)]

use std::fmt;

use schemerz::Migrator;
use schemerz_rusqlite::{RusqliteAdapter, RusqliteMigration};

mod initial_setup;
mod keystore_scripts;
mod scrape_addresses;

/// The table in which `schemerz` records the applied migrations.
const MIGRATIONS_TABLE: &str = "schemerz_migrations";

/// Stores the private keys owned by this wallet.
///
/// ### Columns
///
/// - `address`: The Base58Check pay-to-pubkey-hash address of the key, on the network the
///   wallet was created for.
/// - `pubkey`: The serialized public key. This is 33 bytes if `compressed` is set and 65
///   bytes otherwise.
/// - `secret_key`: The 32-byte secp256k1 secret key.
/// - `compressed`: Whether the key was imported or generated as a compressed key.
/// - `label`: An optional account label.
/// - `added`: The time at which the key was added, as an RFC 3339 timestamp.
pub(crate) const TABLE_KEYSTORE_KEYS: &str = r#"
CREATE TABLE keystore_keys (
    address TEXT NOT NULL PRIMARY KEY,
    pubkey BLOB NOT NULL,
    secret_key BLOB NOT NULL,
    compressed INTEGER NOT NULL,
    label TEXT,
    added TEXT NOT NULL
)
"#;

/// Stores the redeem scripts of pay-to-script-hash addresses added to this wallet.
///
/// ### Columns
///
/// - `address`: The Base58Check pay-to-script-hash address of the script.
/// - `script`: The serialized redeem script.
/// - `label`: An optional account label.
/// - `added`: The time at which the script was added, as an RFC 3339 timestamp.
pub(crate) const TABLE_KEYSTORE_SCRIPTS: &str = r#"
CREATE TABLE keystore_scripts (
    address TEXT NOT NULL PRIMARY KEY,
    script BLOB NOT NULL,
    label TEXT,
    added TEXT NOT NULL
)
"#;

/// Maps staking addresses to the address their stake rewards are redirected to.
///
/// ### Columns
///
/// - `staking_address`: An address owned by the wallet.
/// - `scrape_address`: Any valid address; never equal to `staking_address`.
pub(crate) const TABLE_SCRAPE_ADDRESSES: &str = r#"
CREATE TABLE scrape_addresses (
    staking_address TEXT NOT NULL PRIMARY KEY,
    scrape_address TEXT NOT NULL
)
"#;

/// Errors that can occur while migrating the wallet database.
#[derive(Debug)]
pub(crate) enum MigrationError {
    Sqlite(rusqlite::Error),
    Migrator(String),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            MigrationError::Migrator(e) => write!(f, "Migration failed: {e}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Sqlite(e) => Some(e),
            MigrationError::Migrator(_) => None,
        }
    }
}

impl From<rusqlite::Error> for MigrationError {
    fn from(e: rusqlite::Error) -> Self {
        MigrationError::Sqlite(e)
    }
}

pub(super) fn all() -> impl Iterator<Item = Box<dyn RusqliteMigration<Error = MigrationError>>> {
    [
        // initial_setup
        Box::new(initial_setup::Migration) as _,
        // scrape_addresses
        Box::new(scrape_addresses::Migration) as _,
        // keystore_scripts
        Box::new(keystore_scripts::Migration) as _,
    ]
    .into_iter()
}

/// Brings the database at `conn` up to the latest structure.
pub(crate) fn init_or_migrate(conn: &mut rusqlite::Connection) -> Result<(), MigrationError> {
    let adapter = RusqliteAdapter::new(conn, Some(MIGRATIONS_TABLE.into()));
    adapter
        .init()
        .map_err(|e| MigrationError::Migrator(e.to_string()))?;

    let mut migrator = Migrator::new(adapter);
    migrator
        .register_multiple(all())
        .map_err(|e| MigrationError::Migrator(e.to_string()))?;
    migrator
        .up(None)
        .map_err(|e| MigrationError::Migrator(e.to_string()))
}

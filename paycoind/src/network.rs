//! Paycoin network parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Paycoin consensus network.
///
/// The network only determines the version bytes used when encoding addresses and
/// secret keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// The public Paycoin network.
    #[default]
    Main,
    /// The public test network.
    Test,
}

impl Network {
    /// Version byte of pay-to-pubkey-hash addresses.
    ///
    /// Mainnet addresses start with `P`.
    pub fn pubkey_address_prefix(self) -> u8 {
        match self {
            Network::Main => 55,
            Network::Test => 111,
        }
    }

    /// Version byte of pay-to-script-hash addresses.
    pub fn script_address_prefix(self) -> u8 {
        match self {
            Network::Main => 117,
            Network::Test => 196,
        }
    }

    /// Version byte of WIF-encoded secret keys.
    pub fn secret_key_prefix(self) -> u8 {
        128 + self.pubkey_address_prefix()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Main => "main",
            Network::Test => "test",
        })
    }
}

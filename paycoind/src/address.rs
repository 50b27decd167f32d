//! Base58check address encoding.
//!
//! A Paycoin address is a one-byte version prefix followed by a 20-byte hash, encoded
//! with base58check (the payload followed by the first four bytes of its double
//! SHA-256). The version prefix selects both the network and the kind of address.

use std::fmt;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::network::Network;

const CHECKSUM_LEN: usize = 4;
const HASH_LEN: usize = 20;

/// A decoded Paycoin address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    /// Pay to the holder of the key with this public key hash.
    PubKeyHash([u8; HASH_LEN]),
    /// Pay to a script with this hash.
    ScriptHash([u8; HASH_LEN]),
}

/// The classification of a string claiming to be an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// A valid pay-to-pubkey-hash address.
    PubKeyHash,
    /// A valid pay-to-script-hash address.
    Script,
    /// Not a valid address for the network.
    Invalid,
}

/// Errors that can occur while decoding a base58check string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressError {
    /// The string contains characters outside the base58 alphabet.
    Base58,
    /// The trailing checksum does not match the payload.
    Checksum,
    /// The payload has the wrong length.
    InvalidLength(usize),
    /// The version byte does not belong to the network.
    UnknownVersion(u8),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Base58 => write!(f, "invalid base58 encoding"),
            AddressError::Checksum => write!(f, "checksum mismatch"),
            AddressError::InvalidLength(len) => write!(f, "invalid payload length {len}"),
            AddressError::UnknownVersion(version) => {
                write!(f, "unknown version byte {version}")
            }
        }
    }
}

impl std::error::Error for AddressError {}

/// Computes `SHA256(SHA256(data))`.
pub(crate) fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// Computes `RIPEMD160(SHA256(data))`.
pub(crate) fn hash160(data: &[u8]) -> [u8; HASH_LEN] {
    let digest = Ripemd160::digest(Sha256::digest(data));
    let mut out = [0; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Encodes `payload` with a trailing double-SHA256 checksum.
pub(crate) fn encode_check(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&sha256d(payload)[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decodes a base58check string, verifying and stripping the checksum.
pub(crate) fn decode_check(s: &str) -> Result<Vec<u8>, AddressError> {
    let mut data = bs58::decode(s)
        .into_vec()
        .map_err(|_| AddressError::Base58)?;
    if data.len() < CHECKSUM_LEN {
        return Err(AddressError::InvalidLength(data.len()));
    }
    let checksum = data.split_off(data.len() - CHECKSUM_LEN);
    if sha256d(&data)[..CHECKSUM_LEN] != checksum[..] {
        return Err(AddressError::Checksum);
    }
    Ok(data)
}

impl Address {
    /// Returns the pay-to-pubkey-hash address for a serialized public key.
    pub fn from_pubkey(pubkey: &[u8]) -> Self {
        Address::PubKeyHash(hash160(pubkey))
    }

    /// Decodes an address, checking that it belongs to `network`.
    pub fn decode(network: Network, s: &str) -> Result<Self, AddressError> {
        let data = decode_check(s)?;
        let (&version, hash) = data
            .split_first()
            .ok_or(AddressError::InvalidLength(0))?;
        let hash: [u8; HASH_LEN] = hash
            .try_into()
            .map_err(|_| AddressError::InvalidLength(data.len()))?;

        if version == network.pubkey_address_prefix() {
            Ok(Address::PubKeyHash(hash))
        } else if version == network.script_address_prefix() {
            Ok(Address::ScriptHash(hash))
        } else {
            Err(AddressError::UnknownVersion(version))
        }
    }

    /// Encodes this address for `network`.
    pub fn encode(&self, network: Network) -> String {
        let (version, hash) = match self {
            Address::PubKeyHash(hash) => (network.pubkey_address_prefix(), hash),
            Address::ScriptHash(hash) => (network.script_address_prefix(), hash),
        };
        let mut payload = Vec::with_capacity(1 + HASH_LEN);
        payload.push(version);
        payload.extend_from_slice(hash);
        encode_check(&payload)
    }

    /// Returns `true` if this is a pay-to-script-hash address.
    pub fn is_script(&self) -> bool {
        matches!(self, Address::ScriptHash(_))
    }

    /// Returns the output script that pays to this address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        match self {
            // OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG
            Address::PubKeyHash(hash) => {
                [&[0x76, 0xa9, 0x14][..], &hash[..], &[0x88, 0xac][..]].concat()
            }
            // OP_HASH160 <hash> OP_EQUAL
            Address::ScriptHash(hash) => [&[0xa9, 0x14][..], &hash[..], &[0x87][..]].concat(),
        }
    }
}

/// The most keys a CHECKMULTISIG script can name with a small-integer opcode.
pub(crate) const MAX_MULTISIG_KEYS: usize = 16;

/// Returns the `required`-of-`pubkeys.len()` CHECKMULTISIG script.
///
/// Callers must keep `1 <= required <= pubkeys.len() <= MAX_MULTISIG_KEYS`, and pass
/// serialized public keys (33 or 65 bytes).
pub(crate) fn multisig_script(required: usize, pubkeys: &[Vec<u8>]) -> Vec<u8> {
    // OP_1 through OP_16.
    let small_int = |n: usize| 0x50 + n as u8;

    let mut script = vec![small_int(required)];
    for pubkey in pubkeys {
        script.push(pubkey.len() as u8);
        script.extend_from_slice(pubkey);
    }
    script.push(small_int(pubkeys.len()));
    // OP_CHECKMULTISIG
    script.push(0xae);
    script
}

/// Classifies `s` as an address of `network`.
pub fn classify(network: Network, s: &str) -> AddressKind {
    match Address::decode(network, s) {
        Ok(Address::PubKeyHash(_)) => AddressKind::PubKeyHash,
        Ok(Address::ScriptHash(_)) => AddressKind::Script,
        Err(_) => AddressKind::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAKING: &str = "PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v";
    const SCRAPE: &str = "PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ";

    #[test]
    fn decodes_mainnet_pubkey_hash() {
        let address = Address::decode(Network::Main, SCRAPE).unwrap();
        assert_eq!(
            address,
            Address::PubKeyHash(
                hex::decode("177353f3ad4484ad20d126a8fe2a6da85026dd5d")
                    .unwrap()
                    .try_into()
                    .unwrap()
            )
        );
        assert_eq!(address.encode(Network::Main), SCRAPE);
        assert!(!address.is_script());
    }

    #[test]
    fn pubkey_hashes_to_address() {
        let pubkey =
            hex::decode("026c279d9d64b08bed45c837d9601cc92931c540935aee9447abb7ca991e80ca36")
                .unwrap();
        assert_eq!(Address::from_pubkey(&pubkey).encode(Network::Main), STAKING);
    }

    #[test]
    fn script_addresses() {
        let hash = hex::decode("1e48d88029064432e456d9bbe6c378d4c67b871b").unwrap();
        let address = Address::ScriptHash(hash.try_into().unwrap());
        let encoded = address.encode(Network::Main);
        assert_eq!(encoded, "p8JhjsLwdSiry9jpWKxdqTjS5KM6Quttfd");
        assert_eq!(classify(Network::Main, &encoded), AddressKind::Script);
        assert_eq!(
            hex::encode(address.script_pubkey()),
            "a9141e48d88029064432e456d9bbe6c378d4c67b871b87"
        );
    }

    #[test]
    fn pubkey_hash_script() {
        let address = Address::decode(Network::Main, STAKING).unwrap();
        assert_eq!(
            hex::encode(address.script_pubkey()),
            "76a9141e48d88029064432e456d9bbe6c378d4c67b871b88ac"
        );
    }

    #[test]
    fn multisig_scripts() {
        let a = hex::decode("026c279d9d64b08bed45c837d9601cc92931c540935aee9447abb7ca991e80ca36")
            .unwrap();
        let b = hex::decode("0388c2037017c62240b6b72ac1a2a5f94da790596ebd06177c8572752922165cb4")
            .unwrap();

        let script = multisig_script(1, &[a.clone(), b.clone()]);
        assert_eq!(
            hex::encode(&script),
            format!("5121{}21{}52ae", hex::encode(&a), hex::encode(&b)),
        );
        assert_eq!(script.len(), 1 + 2 * 34 + 2);

        let script = multisig_script(2, &[a.clone(), b.clone()]);
        assert_eq!(script[0], 0x52);
        assert_eq!(multisig_script(1, &[a])[..2], [0x51, 0x21]);
    }

    #[test]
    fn truncated_addresses_are_invalid() {
        assert_eq!(classify(Network::Main, "PBMJh8s5cFz"), AddressKind::Invalid);
        assert_eq!(classify(Network::Main, "PAjArWaTwv8"), AddressKind::Invalid);
        assert_eq!(classify(Network::Main, ""), AddressKind::Invalid);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut corrupted = SCRAPE.to_owned();
        corrupted.pop();
        corrupted.push('K');
        assert_eq!(
            Address::decode(Network::Main, &corrupted),
            Err(AddressError::Checksum)
        );
    }

    #[test]
    fn non_base58_characters_are_rejected() {
        assert_eq!(
            Address::decode(Network::Main, "P0OIl"),
            Err(AddressError::Base58)
        );
    }

    #[test]
    fn addresses_are_network_specific() {
        assert_eq!(
            Address::decode(Network::Test, STAKING),
            Err(AddressError::UnknownVersion(55))
        );

        let testnet = "miH5qDZDNMwc4YuJMoxivi6iJHoSCT8yrh";
        assert_eq!(classify(Network::Test, testnet), AddressKind::PubKeyHash);
        assert_eq!(classify(Network::Main, testnet), AddressKind::Invalid);
        assert_eq!(
            Address::decode(Network::Test, testnet).unwrap(),
            Address::decode(Network::Main, STAKING).unwrap(),
        );
    }
}

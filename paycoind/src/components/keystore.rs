//! The wallet key store.
//!
//! Keys are held in the `keystore_keys` table of the wallet database. The key store is
//! the source of truth for address ownership: an address is "in the wallet" when the
//! store holds the secret key for it.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::{Connection, OptionalExtension, named_params};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use secrecy::SecretString;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    address::{self, Address},
    network::Network,
};

const SECRET_KEY_LEN: usize = 32;
const COMPRESSED_FLAG: u8 = 0x01;

/// Answers whether an address belongs to the local wallet.
pub(crate) trait WalletOwnership {
    fn is_mine(&self, address: &Address) -> Result<bool, rusqlite::Error>;
}

#[derive(Debug)]
pub(crate) enum KeyError {
    /// The WIF string could not be decoded.
    InvalidEncoding,
    /// The WIF string was for a different network.
    WrongNetwork,
    /// The decoded bytes are not a valid secp256k1 secret key.
    InvalidKey(secp256k1::Error),
    /// The address has no key in the wallet.
    UnknownAddress(String),
    Storage(rusqlite::Error),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidEncoding => write!(f, "Invalid private key encoding"),
            KeyError::WrongNetwork => write!(f, "Private key is for a different network"),
            KeyError::InvalidKey(e) => write!(f, "Invalid private key: {e}"),
            KeyError::UnknownAddress(addr) => {
                write!(f, "Private key for address {addr} is not known")
            }
            KeyError::Storage(e) => write!(f, "Wallet database error: {e}"),
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyError::InvalidKey(e) => Some(e),
            KeyError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for KeyError {
    fn from(e: rusqlite::Error) -> Self {
        KeyError::Storage(e)
    }
}

/// A secp256k1 secret key together with the form of public key it commits to.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct PrivateKey {
    secret: SecretKey,
    compressed: bool,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Generates a fresh compressed key from the OS randomness source.
    pub(crate) fn generate() -> Self {
        let mut bytes = [0; SECRET_KEY_LEN];
        let secret = loop {
            OsRng.fill_bytes(&mut bytes);
            // The chance of landing outside the curve order is negligible, but not zero.
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                break secret;
            }
        };
        Self {
            secret,
            compressed: true,
        }
    }

    /// Parses a key in wallet import format.
    pub(crate) fn from_wif(network: Network, wif: &str) -> Result<Self, KeyError> {
        let payload = address::decode_check(wif).map_err(|_| KeyError::InvalidEncoding)?;

        let (&version, rest) = payload.split_first().ok_or(KeyError::InvalidEncoding)?;
        let compressed = match rest.len() {
            SECRET_KEY_LEN => false,
            len if len == SECRET_KEY_LEN + 1 && rest[SECRET_KEY_LEN] == COMPRESSED_FLAG => true,
            _ => return Err(KeyError::InvalidEncoding),
        };
        if version != network.secret_key_prefix() {
            return Err(KeyError::WrongNetwork);
        }

        let secret =
            SecretKey::from_slice(&rest[..SECRET_KEY_LEN]).map_err(KeyError::InvalidKey)?;
        Ok(Self { secret, compressed })
    }

    /// Renders the key in wallet import format.
    pub(crate) fn to_wif(&self, network: Network) -> SecretString {
        let mut payload = Vec::with_capacity(2 + SECRET_KEY_LEN);
        payload.push(network.secret_key_prefix());
        payload.extend_from_slice(&self.secret.secret_bytes());
        if self.compressed {
            payload.push(COMPRESSED_FLAG);
        }
        SecretString::new(address::encode_check(&payload))
    }

    pub(crate) fn pubkey_bytes(&self) -> Vec<u8> {
        let pubkey = PublicKey::from_secret_key(&Secp256k1::signing_only(), &self.secret);
        if self.compressed {
            pubkey.serialize().to_vec()
        } else {
            pubkey.serialize_uncompressed().to_vec()
        }
    }

    pub(crate) fn address(&self) -> Address {
        Address::from_pubkey(&self.pubkey_bytes())
    }
}

/// Read and write access to the keys held by the wallet.
pub(crate) struct KeyStore<'a> {
    conn: &'a Connection,
    network: Network,
}

impl<'a> KeyStore<'a> {
    pub(crate) fn new(conn: &'a Connection, network: Network) -> Self {
        Self { conn, network }
    }

    /// Adds `key` to the wallet, returning its address.
    ///
    /// Adding a key that is already present leaves the stored key untouched.
    pub(crate) fn insert(&self, key: &PrivateKey, label: Option<&str>) -> Result<Address, KeyError> {
        let address = key.address();
        let encoded = address.encode(self.network);

        let inserted = self.conn.execute(
            "INSERT INTO keystore_keys (address, pubkey, secret_key, compressed, label, added)
            VALUES (:address, :pubkey, :secret_key, :compressed, :label, :added)
            ON CONFLICT (address) DO NOTHING",
            named_params! {
                ":address": encoded,
                ":pubkey": key.pubkey_bytes(),
                ":secret_key": key.secret.secret_bytes().to_vec(),
                ":compressed": key.compressed,
                ":label": label,
                ":added": OffsetDateTime::now_utc(),
            },
        )?;
        if inserted > 0 {
            info!("Added key for {encoded} to the wallet");
        }

        Ok(address)
    }

    /// Imports a key given in wallet import format.
    pub(crate) fn import_wif(&self, wif: &str, label: Option<&str>) -> Result<Address, KeyError> {
        let key = PrivateKey::from_wif(self.network, wif)?;
        self.insert(&key, label)
    }

    /// Generates a new key and adds it to the wallet.
    pub(crate) fn generate(&self, label: Option<&str>) -> Result<Address, KeyError> {
        self.insert(&PrivateKey::generate(), label)
    }

    /// Returns the serialized public key for `address`, if the wallet holds its key.
    pub(crate) fn pubkey(&self, address: &Address) -> Result<Option<Vec<u8>>, KeyError> {
        if address.is_script() {
            return Ok(None);
        }

        Ok(self
            .conn
            .query_row(
                "SELECT pubkey FROM keystore_keys WHERE address = :address",
                named_params! {":address": address.encode(self.network)},
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Adds a redeem script to the wallet, returning its pay-to-script-hash address.
    ///
    /// Adding a script that is already present only updates its label.
    pub(crate) fn add_script(&self, script: &[u8], label: Option<&str>) -> Result<Address, KeyError> {
        let address = Address::ScriptHash(address::hash160(script));
        let encoded = address.encode(self.network);

        self.conn.execute(
            "INSERT INTO keystore_scripts (address, script, label, added)
            VALUES (:address, :script, :label, :added)
            ON CONFLICT (address) DO UPDATE SET label = excluded.label",
            named_params! {
                ":address": encoded,
                ":script": script,
                ":label": label,
                ":added": OffsetDateTime::now_utc(),
            },
        )?;
        info!("Added redeem script for {encoded} to the wallet");

        Ok(address)
    }

    /// Returns the wallet import format of the key for `address`.
    pub(crate) fn dump_wif(&self, address: &Address) -> Result<SecretString, KeyError> {
        let encoded = address.encode(self.network);

        let row = self
            .conn
            .query_row(
                "SELECT secret_key, compressed FROM keystore_keys WHERE address = :address",
                named_params! {":address": encoded},
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()?;

        let (secret, compressed) = row.ok_or(KeyError::UnknownAddress(encoded))?;
        let secret = SecretKey::from_slice(&secret).map_err(KeyError::InvalidKey)?;
        Ok(PrivateKey { secret, compressed }.to_wif(self.network))
    }
}

impl WalletOwnership for KeyStore<'_> {
    fn is_mine(&self, address: &Address) -> Result<bool, rusqlite::Error> {
        // Only pubkey-hash addresses can be backed by a single key.
        if address.is_script() {
            return Ok(false);
        }

        self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM keystore_keys WHERE address = :address)",
            named_params! {":address": address.encode(self.network)},
            |row| row.get(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use secrecy::ExposeSecret;

    use super::{KeyError, KeyStore, PrivateKey, WalletOwnership};
    use crate::{address::Address, components::database::migrations, network::Network};

    const WIF: &str = "U9nhhCCbFfY64wozUZ6ScrNNvBqhGtoi8cNHXmaLm3wi1VHtjhr8";
    const WIF_ADDRESS: &str = "PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v";

    fn wallet() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations::init_or_migrate(&mut conn).unwrap();
        conn
    }

    #[test]
    fn parses_compressed_wif() {
        let key = PrivateKey::from_wif(Network::Main, WIF).unwrap();
        assert!(key.compressed);
        assert_eq!(
            hex::encode(key.secret.secret_bytes()),
            "8b92a80368adedc4b3e2bba56ffeb331dc69ee035a2bfa439d266e2dbb2af31c",
        );
        assert_eq!(key.address().encode(Network::Main), WIF_ADDRESS);
        assert_eq!(key.to_wif(Network::Main).expose_secret(), WIF);
    }

    #[test]
    fn compression_flag_selects_address() {
        let compressed =
            PrivateKey::from_wif(Network::Main, "U57PdXwd38fAKhRaCsERgrK8YWmNmad2nqzrQ8QKrZvFY5Su3RGB")
                .unwrap();
        let uncompressed =
            PrivateKey::from_wif(Network::Main, "78jEHS8qwrmSg8M4u5arYgiiashQxsDEzxxheQt3uvDyK16StSt")
                .unwrap();
        assert_eq!(compressed.secret, uncompressed.secret);
        assert_eq!(
            compressed.address().encode(Network::Main),
            "PKGSi8HTQzLx89rkZrRrVkPFjrcSC55NP9",
        );
        assert_eq!(
            uncompressed.address().encode(Network::Main),
            "PMsYj4nuMuX6uCuig8TeS82KLVhb6hBZqt",
        );
    }

    #[test]
    fn rejects_malformed_wif() {
        assert!(matches!(
            PrivateKey::from_wif(Network::Main, "U9nhhCCbFfY64"),
            Err(KeyError::InvalidEncoding),
        ));
        // An address has the right checksum but the wrong payload length.
        assert!(matches!(
            PrivateKey::from_wif(Network::Main, WIF_ADDRESS),
            Err(KeyError::InvalidEncoding),
        ));
        assert!(matches!(
            PrivateKey::from_wif(Network::Test, WIF),
            Err(KeyError::WrongNetwork),
        ));
    }

    #[test]
    fn import_then_dump() {
        let conn = wallet();
        let store = KeyStore::new(&conn, Network::Main);

        let address = store.import_wif(WIF, Some("staking")).unwrap();
        assert_eq!(address.encode(Network::Main), WIF_ADDRESS);
        assert!(store.is_mine(&address).unwrap());
        assert_eq!(store.dump_wif(&address).unwrap().expose_secret(), WIF);

        // Importing again is a no-op.
        store.import_wif(WIF, None).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM keystore_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn ownership() {
        let conn = wallet();
        let store = KeyStore::new(&conn, Network::Main);
        let generated = store.generate(None).unwrap();

        assert!(store.is_mine(&generated).unwrap());
        let other = Address::decode(Network::Main, "PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ").unwrap();
        assert!(!store.is_mine(&other).unwrap());
        let Address::PubKeyHash(hash) = generated else {
            panic!("generated keys have pubkey-hash addresses");
        };
        assert!(!store.is_mine(&Address::ScriptHash(hash)).unwrap());

        // Keys are only visible through the network the wallet was created for.
        let testnet = KeyStore::new(&conn, Network::Test);
        assert!(!testnet.is_mine(&generated).unwrap());
    }

    #[test]
    fn pubkeys_and_scripts() {
        let conn = wallet();
        let store = KeyStore::new(&conn, Network::Main);
        let address = store.import_wif(WIF, None).unwrap();

        assert_eq!(
            hex::encode(store.pubkey(&address).unwrap().unwrap()),
            "026c279d9d64b08bed45c837d9601cc92931c540935aee9447abb7ca991e80ca36",
        );
        let other = Address::decode(Network::Main, "PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ").unwrap();
        assert_eq!(store.pubkey(&other).unwrap(), None);

        let script = [0x51, 0x51, 0xae];
        let first = store.add_script(&script, Some("first")).unwrap();
        assert!(first.is_script());
        assert_eq!(store.add_script(&script, Some("second")).unwrap(), first);
        let (count, label): (i64, String) = conn
            .query_row("SELECT COUNT(*), MAX(label) FROM keystore_scripts", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!((count, label.as_str()), (1, "second"));
    }

    #[test]
    fn dump_unknown_address() {
        let conn = wallet();
        let store = KeyStore::new(&conn, Network::Main);
        let address = Address::decode(Network::Main, WIF_ADDRESS).unwrap();
        assert!(matches!(
            store.dump_wif(&address),
            Err(KeyError::UnknownAddress(a)) if a == WIF_ADDRESS,
        ));
    }
}

//! Persistent scrape addresses.
//!
//! A scrape address receives the stake rewards earned by a staking address held in the
//! wallet. Each staking address has at most one scrape address.
//!
//! Every operation validates its inputs in a fixed order: address syntax first, then
//! wallet ownership, then the state of the mapping. Callers rely on this order to map
//! failures to stable error codes.

use std::fmt;

use rusqlite::{Connection, OptionalExtension, named_params};
use tracing::info;

use crate::{
    address::Address,
    components::keystore::WalletOwnership,
    network::Network,
};

#[derive(Debug)]
pub(crate) enum ScrapeError {
    /// The staking address is not a valid address.
    InvalidStakingAddress,
    /// The staking address is valid but not held by the wallet.
    NotInWallet,
    /// The scrape address is not a valid address.
    InvalidScrapeAddress,
    /// The scrape address equals the staking address.
    SameAsStaking,
    /// No scrape address is set for the given staking address.
    NotFound(String),
    Storage(rusqlite::Error),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::InvalidStakingAddress => write!(f, "Invalid Paycoin address."),
            ScrapeError::NotInWallet => write!(f, "Staking address must be in wallet."),
            ScrapeError::InvalidScrapeAddress => write!(f, "Invalid scrape address."),
            ScrapeError::SameAsStaking => write!(
                f,
                "Cannot set scrape address to the same as staking address."
            ),
            ScrapeError::NotFound(staking) => {
                write!(f, "No scrape address set for address {staking}")
            }
            ScrapeError::Storage(e) => write!(f, "Wallet database error: {e}"),
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ScrapeError {
    fn from(e: rusqlite::Error) -> Self {
        ScrapeError::Storage(e)
    }
}

/// A staking address and the address its rewards are sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ScrapeRecord {
    pub(crate) staking_address: String,
    pub(crate) scrape_address: String,
}

/// The scrape address mapping stored in the wallet database.
pub(crate) struct ScrapeStore<'a> {
    conn: &'a Connection,
    network: Network,
}

impl<'a> ScrapeStore<'a> {
    pub(crate) fn new(conn: &'a Connection, network: Network) -> Self {
        Self { conn, network }
    }

    /// Checks that `staking` is a valid address held by `wallet`.
    fn owned_staking_address(
        &self,
        wallet: &impl WalletOwnership,
        staking: &str,
    ) -> Result<Address, ScrapeError> {
        let address = Address::decode(self.network, staking)
            .map_err(|_| ScrapeError::InvalidStakingAddress)?;
        if !wallet.is_mine(&address)? {
            return Err(ScrapeError::NotInWallet);
        }
        Ok(address)
    }

    /// Sets the scrape address for `staking`, replacing any previous one.
    ///
    /// Returns the scrape address once the mapping has been committed.
    pub(crate) fn set(
        &self,
        wallet: &impl WalletOwnership,
        staking: &str,
        scrape: &str,
    ) -> Result<String, ScrapeError> {
        let staking_address = self.owned_staking_address(wallet, staking)?;

        let scrape_address =
            Address::decode(self.network, scrape).map_err(|_| ScrapeError::InvalidScrapeAddress)?;
        if scrape_address == staking_address {
            return Err(ScrapeError::SameAsStaking);
        }

        self.conn.execute(
            "INSERT INTO scrape_addresses (staking_address, scrape_address)
            VALUES (:staking_address, :scrape_address)
            ON CONFLICT (staking_address) DO UPDATE
            SET scrape_address = excluded.scrape_address",
            named_params! {
                ":staking_address": staking,
                ":scrape_address": scrape,
            },
        )?;
        info!("Set scrape address for {staking} to {scrape}");

        Ok(scrape.to_owned())
    }

    /// Returns the scrape address for `staking`.
    pub(crate) fn get(
        &self,
        wallet: &impl WalletOwnership,
        staking: &str,
    ) -> Result<String, ScrapeError> {
        self.owned_staking_address(wallet, staking)?;

        self.conn
            .query_row(
                "SELECT scrape_address FROM scrape_addresses
                WHERE staking_address = :staking_address",
                named_params! {":staking_address": staking},
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| ScrapeError::NotFound(staking.to_owned()))
    }

    /// Removes the scrape address for `staking`.
    pub(crate) fn delete(
        &self,
        wallet: &impl WalletOwnership,
        staking: &str,
    ) -> Result<(), ScrapeError> {
        self.owned_staking_address(wallet, staking)?;

        let removed = self.conn.execute(
            "DELETE FROM scrape_addresses WHERE staking_address = :staking_address",
            named_params! {":staking_address": staking},
        )?;
        if removed == 0 {
            return Err(ScrapeError::NotFound(staking.to_owned()));
        }
        info!("Deleted scrape address for {staking}");

        Ok(())
    }

    /// Returns every mapping, ordered by staking address.
    pub(crate) fn list(&self) -> Result<Vec<ScrapeRecord>, ScrapeError> {
        let mut stmt = self.conn.prepare(
            "SELECT staking_address, scrape_address FROM scrape_addresses
            ORDER BY staking_address",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(ScrapeRecord {
                    staking_address: row.get(0)?,
                    scrape_address: row.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rusqlite::Connection;

    use super::{ScrapeError, ScrapeRecord, ScrapeStore};
    use crate::{
        address::Address,
        components::{database::migrations, keystore::WalletOwnership},
        network::Network,
    };

    const STAKING: &str = "PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v";
    const SCRAPE: &str = "PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ";
    const OTHER: &str = "PKGSi8HTQzLx89rkZrRrVkPFjrcSC55NP9";
    const SCRIPT: &str = "p8JhjsLwdSiry9jpWKxdqTjS5KM6Quttfd";

    struct Wallet(HashSet<Address>);

    impl Wallet {
        fn holding(addresses: &[&str]) -> Self {
            Self(
                addresses
                    .iter()
                    .map(|a| Address::decode(Network::Main, a).unwrap())
                    .collect(),
            )
        }
    }

    impl WalletOwnership for Wallet {
        fn is_mine(&self, address: &Address) -> Result<bool, rusqlite::Error> {
            Ok(self.0.contains(address))
        }
    }

    fn db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations::init_or_migrate(&mut conn).unwrap();
        conn
    }

    #[test]
    fn set_get_delete() {
        let conn = db();
        let store = ScrapeStore::new(&conn, Network::Main);
        let wallet = Wallet::holding(&[STAKING]);

        assert_eq!(store.set(&wallet, STAKING, SCRAPE).unwrap(), SCRAPE);
        assert_eq!(store.get(&wallet, STAKING).unwrap(), SCRAPE);
        store.delete(&wallet, STAKING).unwrap();
        assert!(matches!(
            store.get(&wallet, STAKING),
            Err(ScrapeError::NotFound(a)) if a == STAKING,
        ));
        assert!(matches!(
            store.delete(&wallet, STAKING),
            Err(ScrapeError::NotFound(_)),
        ));
    }

    #[test]
    fn set_overwrites() {
        let conn = db();
        let store = ScrapeStore::new(&conn, Network::Main);
        let wallet = Wallet::holding(&[STAKING]);

        store.set(&wallet, STAKING, SCRAPE).unwrap();
        store.set(&wallet, STAKING, SCRIPT).unwrap();
        assert_eq!(store.get(&wallet, STAKING).unwrap(), SCRIPT);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn syntax_is_checked_before_ownership() {
        let conn = db();
        let store = ScrapeStore::new(&conn, Network::Main);
        let wallet = Wallet::holding(&[]);

        assert!(matches!(
            store.set(&wallet, "PBMJh8s5cFz", "PAjArWaTwv8"),
            Err(ScrapeError::InvalidStakingAddress),
        ));
        assert!(matches!(
            store.get(&wallet, "PBMJh8s5cFz"),
            Err(ScrapeError::InvalidStakingAddress),
        ));
        assert!(matches!(
            store.delete(&wallet, "PBMJh8s5cFz"),
            Err(ScrapeError::InvalidStakingAddress),
        ));
    }

    #[test]
    fn unowned_staking_address() {
        let conn = db();
        let store = ScrapeStore::new(&conn, Network::Main);
        let wallet = Wallet::holding(&[OTHER]);

        // Ownership is checked before the scrape address.
        assert!(matches!(
            store.set(&wallet, STAKING, "garbage"),
            Err(ScrapeError::NotInWallet),
        ));
        assert!(matches!(
            store.get(&wallet, STAKING),
            Err(ScrapeError::NotInWallet),
        ));
        assert!(matches!(
            store.delete(&wallet, STAKING),
            Err(ScrapeError::NotInWallet),
        ));
    }

    #[test]
    fn invalid_scrape_address() {
        let conn = db();
        let store = ScrapeStore::new(&conn, Network::Main);
        let wallet = Wallet::holding(&[STAKING]);

        assert!(matches!(
            store.set(&wallet, STAKING, "PAjArWaTwv8"),
            Err(ScrapeError::InvalidScrapeAddress),
        ));
        // Testnet addresses are not valid on mainnet.
        assert!(matches!(
            store.set(&wallet, STAKING, "miH5qDZDNMwc4YuJMoxivi6iJHoSCT8yrh"),
            Err(ScrapeError::InvalidScrapeAddress),
        ));
        assert!(matches!(
            store.set(&wallet, STAKING, STAKING),
            Err(ScrapeError::SameAsStaking),
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_is_ordered() {
        let conn = db();
        let store = ScrapeStore::new(&conn, Network::Main);
        let wallet = Wallet::holding(&[STAKING, OTHER]);

        store.set(&wallet, OTHER, SCRAPE).unwrap();
        store.set(&wallet, STAKING, SCRIPT).unwrap();
        assert_eq!(
            store.list().unwrap(),
            vec![
                ScrapeRecord {
                    staking_address: STAKING.into(),
                    scrape_address: SCRIPT.into(),
                },
                ScrapeRecord {
                    staking_address: OTHER.into(),
                    scrape_address: SCRAPE.into(),
                },
            ],
        );
    }

    #[test]
    fn mapping_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.db");
        let wallet = Wallet::holding(&[STAKING]);

        {
            let mut conn = Connection::open(&path).unwrap();
            migrations::init_or_migrate(&mut conn).unwrap();
            ScrapeStore::new(&conn, Network::Main)
                .set(&wallet, STAKING, SCRAPE)
                .unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        assert_eq!(
            ScrapeStore::new(&conn, Network::Main)
                .get(&wallet, STAKING)
                .unwrap(),
            SCRAPE,
        );
    }
}

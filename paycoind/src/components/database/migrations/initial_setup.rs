use std::collections::HashSet;

use schemerz_rusqlite::RusqliteMigration;
use uuid::Uuid;

use super::MigrationError;

pub(super) const MIGRATION_ID: Uuid = Uuid::from_u128(0x5f0c1a7e_3b9d_4c62_8e41_d27a90b4c6f3);

pub(super) struct Migration;

impl schemerz::Migration<Uuid> for Migration {
    fn id(&self) -> Uuid {
        MIGRATION_ID
    }

    fn dependencies(&self) -> HashSet<Uuid> {
        HashSet::new()
    }

    fn description(&self) -> &'static str {
        "Initializes the key store."
    }
}

impl RusqliteMigration for Migration {
    type Error = MigrationError;

    fn up(&self, transaction: &rusqlite::Transaction<'_>) -> Result<(), Self::Error> {
        transaction.execute_batch(
            "CREATE TABLE keystore_keys (
                address TEXT NOT NULL PRIMARY KEY,
                pubkey BLOB NOT NULL,
                secret_key BLOB NOT NULL,
                compressed INTEGER NOT NULL,
                label TEXT,
                added TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn down(&self, _transaction: &rusqlite::Transaction<'_>) -> Result<(), Self::Error> {
        Ok(())
    }
}

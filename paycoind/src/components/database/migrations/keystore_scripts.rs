use std::collections::HashSet;

use schemerz_rusqlite::RusqliteMigration;
use uuid::Uuid;

use super::{MigrationError, initial_setup};

pub(super) const MIGRATION_ID: Uuid = Uuid::from_u128(0x2d9b7e43_61af_4c08_9f15_b3e0c4a86d21);

pub(super) struct Migration;

impl schemerz::Migration<Uuid> for Migration {
    fn id(&self) -> Uuid {
        MIGRATION_ID
    }

    fn dependencies(&self) -> HashSet<Uuid> {
        [initial_setup::MIGRATION_ID].into_iter().collect()
    }

    fn description(&self) -> &'static str {
        "Adds the redeem script table to the key store."
    }
}

impl RusqliteMigration for Migration {
    type Error = MigrationError;

    fn up(&self, transaction: &rusqlite::Transaction<'_>) -> Result<(), Self::Error> {
        transaction.execute_batch(
            "CREATE TABLE keystore_scripts (
                address TEXT NOT NULL PRIMARY KEY,
                script BLOB NOT NULL,
                label TEXT,
                added TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn down(&self, transaction: &rusqlite::Transaction<'_>) -> Result<(), Self::Error> {
        transaction.execute_batch("DROP TABLE keystore_scripts;")?;
        Ok(())
    }
}

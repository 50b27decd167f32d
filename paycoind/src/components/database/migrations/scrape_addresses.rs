use std::collections::HashSet;

use schemerz_rusqlite::RusqliteMigration;
use uuid::Uuid;

use super::{MigrationError, initial_setup};

pub(super) const MIGRATION_ID: Uuid = Uuid::from_u128(0xc84e2d19_7a05_4f3b_b6e8_19f2a3d5e870);

pub(super) struct Migration;

impl schemerz::Migration<Uuid> for Migration {
    fn id(&self) -> Uuid {
        MIGRATION_ID
    }

    fn dependencies(&self) -> HashSet<Uuid> {
        [initial_setup::MIGRATION_ID].into_iter().collect()
    }

    fn description(&self) -> &'static str {
        "Adds the scrape address table."
    }
}

impl RusqliteMigration for Migration {
    type Error = MigrationError;

    fn up(&self, transaction: &rusqlite::Transaction<'_>) -> Result<(), Self::Error> {
        transaction.execute_batch(
            "CREATE TABLE scrape_addresses (
                staking_address TEXT NOT NULL PRIMARY KEY,
                scrape_address TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn down(&self, transaction: &rusqlite::Transaction<'_>) -> Result<(), Self::Error> {
        transaction.execute_batch("DROP TABLE scrape_addresses;")?;
        Ok(())
    }
}

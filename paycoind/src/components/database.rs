use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tokio::fs;

use crate::{
    config::PaycoindConfig,
    error::{Error, ErrorKind},
    network::Network,
};

mod connection;

pub(crate) mod migrations;

#[cfg(test)]
pub(crate) mod testing;


pub(crate) type DbHandle = deadpool::managed::Object<connection::DbManager>;

/// The wallet database, shared by the key store and the scrape address store.
#[derive(Clone)]
pub(crate) struct Database {
    path: Arc<PathBuf>,
    db_data_pool: connection::DbPool,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub(crate) async fn open(config: &PaycoindConfig) -> Result<Self, Error> {
        Self::open_at(config.wallet_db_path(), config.consensus.network).await
    }

    /// Opens the database at `path`, creating it if necessary, and applies any missing
    /// migrations.
    pub(crate) async fn open_at(path: impl AsRef<Path>, network: Network) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let db_exists = fs::try_exists(&path)
            .await
            .map_err(|e| ErrorKind::Init.context(e))?;

        let database = Self {
            db_data_pool: connection::pool(&path, network, None)?,
            path: Arc::new(path),
        };

        if db_exists {
            info!("Applying latest database migrations");
        } else {
            info!("Creating empty database");
        }
        let handle = database.handle().await?;
        handle.with_raw_mut(|conn, _| {
            migrations::init_or_migrate(conn).map_err(Error::from)
        })?;

        Ok(database)
    }

    pub(crate) async fn handle(&self) -> Result<DbHandle, Error> {
        self.db_data_pool
            .get()
            .await
            .map_err(|e| ErrorKind::Database.context(e).into())
    }
}

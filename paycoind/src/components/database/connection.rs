use std::path::Path;
use std::sync::{Arc, RwLock};

use deadpool::managed::Manager;

use crate::{
    error::{Error, ErrorKind},
    network::Network,
};

pub(super) fn pool(
    path: impl AsRef<Path>,
    network: Network,
    max_size: Option<usize>,
) -> Result<DbPool, Error> {
    let config = deadpool_sqlite::Config::new(path.as_ref());
    let manager = DbManager::from_config(&config, network);
    let mut pool_config = deadpool::managed::PoolConfig::default();
    if let Some(max_size) = max_size {
        pool_config.max_size = max_size;
    }
    DbPool::builder(manager)
        .config(pool_config)
        .build()
        .map_err(|e| ErrorKind::Init.context(e).into())
}

pub(super) type DbPool = deadpool::managed::Pool<DbManager>;

pub(crate) struct DbManager {
    inner: deadpool_sqlite::Manager,
    /// Connection pools are thread-safe, but SQLite does not reliably follow the busy
    /// handler (configured by `rusqlite` to a timeout after 5s), so we explicitly guard
    /// against SQLite `DatabaseBusy` errors. The same lock serializes writers against
    /// readers, so a reader never observes a partially applied write.
    lock: Arc<RwLock<()>>,
    network: Network,
}

impl DbManager {
    /// Creates a new [`DbManager`] using the given [`deadpool_sqlite::Config`], backed
    /// by the Tokio runtime.
    #[must_use]
    fn from_config(config: &deadpool_sqlite::Config, network: Network) -> Self {
        Self {
            inner: deadpool_sqlite::Manager::from_config(config, deadpool_sqlite::Runtime::Tokio1),
            lock: Arc::new(RwLock::new(())),
            network,
        }
    }
}

impl Manager for DbManager {
    type Type = DbConnection;
    type Error = rusqlite::Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let inner = self.inner.create().await?;
        Ok(DbConnection {
            inner,
            lock: self.lock.clone(),
            network: self.network,
        })
    }

    async fn recycle(
        &self,
        obj: &mut Self::Type,
        metrics: &deadpool_sqlite::Metrics,
    ) -> deadpool::managed::RecycleResult<Self::Error> {
        self.inner.recycle(&mut obj.inner, metrics).await
    }
}

/// A pooled connection to the wallet database.
pub(crate) struct DbConnection {
    inner: deadpool_sync::SyncWrapper<rusqlite::Connection>,
    lock: Arc<RwLock<()>>,
    network: Network,
}

impl DbConnection {
    /// Runs `f` with shared access to the connection.
    pub(crate) fn with_raw<T>(&self, f: impl FnOnce(&rusqlite::Connection, &Network) -> T) -> T {
        tokio::task::block_in_place(|| {
            let _guard = self.lock.read().expect("lock is not poisoned");
            f(
                self.inner.lock().expect("lock is not poisoned").as_ref(),
                &self.network,
            )
        })
    }

    /// Runs `f` with exclusive access to the database.
    pub(crate) fn with_raw_mut<T>(
        &self,
        f: impl FnOnce(&mut rusqlite::Connection, &Network) -> T,
    ) -> T {
        tokio::task::block_in_place(|| {
            let _guard = self.lock.write().expect("lock is not poisoned");
            f(
                self.inner.lock().expect("lock is not poisoned").as_mut(),
                &self.network,
            )
        })
    }
}

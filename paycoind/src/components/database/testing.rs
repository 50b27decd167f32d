//! Test utilities for database operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Database, connection, migrations};
use crate::{
    error::Error,
    network::Network,
};

/// Creates an in-memory wallet database with all migrations applied.
///
/// Uses a shared in-memory database URI with a unique name per database, so that every
/// connection in the pool sees the same data while separate tests stay isolated.
pub(crate) async fn test_database(network: Network) -> Result<Database, Error> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let db_name = format!(
        "file:paycoind_test_{}?mode=memory&cache=shared",
        COUNTER.fetch_add(1, Ordering::SeqCst)
    );

    let database = Database {
        db_data_pool: connection::pool(&db_name, network, Some(2))?,
        path: Arc::new(db_name.into()),
    };

    let handle = database.handle().await?;
    handle.with_raw_mut(|conn, _| {
        migrations::init_or_migrate(conn).map_err(Error::from)
    })?;

    Ok(database)
}

//! `start` subcommand

use abscissa_core::Runnable;

use crate::{
    cli::StartCmd,
    commands::AsyncRunnable,
    components::{database::Database, json_rpc::JsonRpc, scrapes::ScrapeStore},
    error::Error,
    prelude::*,
};

impl AsyncRunnable for StartCmd {
    async fn run(&self) -> Result<(), Error> {
        let config = APP.config();
        let _lock = config.lock_datadir()?;

        let db = Database::open(&config).await?;
        let scrape_count = db
            .handle()
            .await?
            .with_raw(|conn, network| ScrapeStore::new(conn, *network).list())?
            .len();
        info!("Loaded {scrape_count} scrape addresses");

        // Launch RPC server.
        let rpc_task_handle = JsonRpc::spawn(&config.rpc, db).await?;

        info!("Spawned paycoind tasks");

        // The RPC server is the only ongoing task. Signals are handled by `run_on_runtime`.
        let rpc_server_result = rpc_task_handle
            .await
            .expect("unexpected panic in the RPC task");
        info!(?rpc_server_result, "RPC task exited");

        rpc_server_result
    }
}

impl Runnable for StartCmd {
    fn run(&self) {
        self.run_on_runtime();
    }
}

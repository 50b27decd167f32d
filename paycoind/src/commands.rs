//! paycoind Subcommands

use std::{
    fs,
    path::{Path, PathBuf},
};

use abscissa_core::{
    Application, Configurable, FrameworkError, FrameworkErrorKind, Runnable, Shutdown,
};
use home::home_dir;
use tracing::info;

use crate::{
    cli::EntryPoint,
    config::PaycoindConfig,
    error::{Error, ErrorKind},
    fl,
    prelude::APP,
};

mod add_rpc_user;
mod example_config;
mod start;

#[cfg(feature = "rpc-cli")]
pub(crate) mod rpc_cli;

/// paycoind Configuration Filename
pub const CONFIG_FILE: &str = "paycoind.toml";

/// Ensures only a single paycoind process is using the data directory.
pub(crate) fn lock_datadir(datadir: &Path) -> Result<fmutex::Guard<'static>, Error> {
    let lockfile_path = resolve_datadir_path(datadir, Path::new(".lock"));

    {
        // Ensure that the lockfile exists on disk.
        let _ = fs::File::create(&lockfile_path).map_err(|e| {
            ErrorKind::Init.context(fl!(
                "err-init-failed-to-create-lockfile",
                path = lockfile_path.display().to_string(),
                error = e.to_string(),
            ))
        })?;
    }

    let guard = fmutex::try_lock_exclusive_path(&lockfile_path)
        .map_err(|e| {
            ErrorKind::Init.context(fl!(
                "err-init-failed-to-read-lockfile",
                path = lockfile_path.display().to_string(),
                error = e.to_string(),
            ))
        })?
        .ok_or_else(|| {
            ErrorKind::Init.context(fl!(
                "err-init-already-running",
                datadir = datadir.display().to_string(),
            ))
        })?;

    Ok(guard)
}

/// Resolves the requested path relative to the data directory.
///
/// Absolute paths are returned unchanged.
pub(crate) fn resolve_datadir_path(datadir: &Path, path: &Path) -> PathBuf {
    datadir.join(path)
}

impl EntryPoint {
    /// Returns the data directory to use for this command.
    fn datadir(&self) -> Result<PathBuf, FrameworkError> {
        if let Some(datadir) = &self.datadir {
            Ok(datadir.clone())
        } else {
            home_dir()
                .ok_or_else(|| {
                    FrameworkErrorKind::ComponentError
                        .context(fl!("err-init-cannot-find-home-dir"))
                        .into()
                })
                .map(|base| base.join(".paycoin"))
        }
    }
}

impl Runnable for EntryPoint {
    fn run(&self) {
        self.cmd.run()
    }
}

impl Configurable<PaycoindConfig> for EntryPoint {
    fn config_path(&self) -> Option<PathBuf> {
        // A missing config file is not an error; defaults are used instead.
        let filename = resolve_datadir_path(
            &self.datadir().ok()?,
            self.config
                .as_deref()
                .unwrap_or_else(|| Path::new(CONFIG_FILE)),
        );

        if filename.exists() {
            Some(filename)
        } else {
            None
        }
    }

    fn process_config(&self, mut config: PaycoindConfig) -> Result<PaycoindConfig, FrameworkError> {
        // Components access top-level CLI settings solely through `PaycoindConfig`.
        config.datadir = Some(self.datadir()?);
        Ok(config)
    }
}

/// An async version of the [`Runnable`] trait.
pub(crate) trait AsyncRunnable {
    /// Runs this `AsyncRunnable`.
    async fn run(&self) -> Result<(), Error>;

    /// Runs this `AsyncRunnable` using the `abscissa_tokio` runtime.
    ///
    /// Signal detection is included for handling both interrupts (Ctrl-C on most
    /// platforms, corresponding to `SIGINT` on Unix), and programmatic termination
    /// (`SIGTERM` on Unix). Both of these will cause [`AsyncRunnable::run`] to be
    /// cancelled (ending execution at an `.await` boundary).
    ///
    /// This should be called from [`Runnable::run`].
    fn run_on_runtime(&self) {
        match abscissa_tokio::run(&APP, async move {
            tokio::select! {
                biased;
                _ = shutdown() => Ok(()),
                result = self.run() => result,
            }
        }) {
            Ok(Ok(())) => (),
            Ok(Err(e)) => {
                eprintln!("{e}");
                APP.shutdown_with_exitcode(Shutdown::Forced, 1);
            }
            Err(e) => {
                eprintln!("{e}");
                APP.shutdown_with_exitcode(Shutdown::Forced, 1);
            }
        }
    }
}

async fn shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register signal handler for SIGINT");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register signal handler for SIGTERM");

        let signal = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };

        info!("Received {signal}, starting shutdown");
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("listening for ctrl-c signal should never fail");

        info!("Received Ctrl-C, starting shutdown");
    }
}

//! paycoind Abscissa Application

use std::sync::atomic::{AtomicUsize, Ordering};

use abscissa_core::{
    Application, FrameworkError, StandardPaths,
    application::{self, AppCell},
    config::{self, CfgCell},
    trace,
};
use abscissa_tokio::TokioComponent;
use i18n_embed::unic_langid::LanguageIdentifier;

use crate::{cli::EntryPoint, config::PaycoindConfig, i18n};

/// Application state
pub static APP: AppCell<PaycoindApp> = AppCell::new();

/// paycoind Application
#[derive(Debug, Default)]
pub struct PaycoindApp {
    /// Application configuration.
    config: CfgCell<PaycoindConfig>,

    /// Application state.
    state: application::State<Self>,
}

impl Application for PaycoindApp {
    type Cmd = EntryPoint;
    type Cfg = PaycoindConfig;
    type Paths = StandardPaths;

    fn config(&self) -> config::Reader<PaycoindConfig> {
        self.config.read()
    }

    fn state(&self) -> &application::State<Self> {
        &self.state
    }

    fn register_components(&mut self, command: &Self::Cmd) -> Result<(), FrameworkError> {
        let mut components = self.framework_components(command)?;
        // RPC handlers touch SQLite through `block_in_place`, which needs the
        // multi-threaded scheduler.
        components.push(Box::new(TokioComponent::from(
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name_fn(|| {
                    static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
                    let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
                    format!("paycoind-worker-{id}")
                })
                .build()
                .expect("failed to build Tokio runtime"),
        )));
        self.state.components_mut().register(components)
    }

    fn after_config(&mut self, config: Self::Cfg) -> Result<(), FrameworkError> {
        let mut components = self.state.components_mut();
        components.after_config(&config)?;
        self.config.set_once(config);
        Ok(())
    }

    fn tracing_config(&self, command: &EntryPoint) -> trace::Config {
        if command.verbose {
            trace::Config::verbose()
        } else {
            trace::Config::default()
        }
    }
}

/// Boots the paycoind application, parsing subcommand and options from command-line
/// arguments, and terminating when complete.
pub fn boot(requested_languages: Vec<LanguageIdentifier>) {
    // Languages are loaded first so that the CLI usage text can be localized.
    i18n::load_languages(&requested_languages);

    abscissa_core::boot(&APP);
}

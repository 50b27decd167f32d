//! Routing of RPC calls to commands.
//!
//! The dispatcher looks commands up, refuses unsafe ones while safe mode is active,
//! and runs each handler against a pooled wallet database connection. Handlers that
//! change wallet state run with exclusive database access; all others share it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use jsonrpsee::{
    RpcModule,
    types::{ErrorCode, ErrorObjectOwned, Params},
};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    registry::{CallContext, CallError, CommandTable},
    server::LegacyCode,
};
use crate::{
    components::database::Database,
    config::RpcSection,
    error::{Error, ErrorKind},
    network::Network,
};

/// The warning raised by `rpc.test_safe_mode`.
const TEST_SAFE_MODE_WARNING: &str = "testsafemode enabled";

/// Stands in for the warning when safe mode is forced on by the caller.
const UNKNOWN_WARNING: &str = "network warning raised";

/// The node's safe-mode state.
///
/// Safe mode is active while a network warning is raised, unless the operator disabled
/// it with `rpc.disable_safe_mode`.
#[derive(Clone, Debug, Default)]
pub(crate) struct SafeMode {
    disabled: bool,
    warning: Arc<RwLock<Option<String>>>,
}

impl SafeMode {
    pub(crate) fn new(disabled: bool) -> Self {
        Self {
            disabled,
            warning: Arc::default(),
        }
    }

    /// Builds the safe-mode state for the RPC server, raising the test warning if
    /// `rpc.test_safe_mode` is set.
    pub(crate) fn from_config(config: &RpcSection) -> Self {
        let safe_mode = Self::new(config.disable_safe_mode());
        if config.test_safe_mode() {
            safe_mode.set_warning(Some(TEST_SAFE_MODE_WARNING.into()));
        }
        safe_mode
    }

    /// Raises (or with `None`, clears) the network warning.
    ///
    /// This is where a node's alert subsystem reports warnings.
    pub(crate) fn set_warning(&self, warning: Option<String>) {
        *self.warning.write().unwrap_or_else(|e| e.into_inner()) = warning;
    }

    /// Returns the warning that activates safe mode, if safe mode is active.
    pub(crate) fn active_warning(&self) -> Option<String> {
        if self.disabled {
            None
        } else {
            self.warning
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active_warning().is_some()
    }
}

/// Routes RPC calls to their commands.
#[derive(Clone, Debug)]
pub(crate) struct Dispatcher {
    commands: Arc<CommandTable>,
    db: Database,
    safe_mode: SafeMode,
}

impl Dispatcher {
    pub(crate) fn new(commands: CommandTable, db: Database, safe_mode: SafeMode) -> Self {
        Self {
            commands: Arc::new(commands),
            db,
            safe_mode,
        }
    }

    #[cfg(test)]
    pub(crate) fn safe_mode(&self) -> &SafeMode {
        &self.safe_mode
    }

    /// Calls `method`, applying the current safe-mode state.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, ErrorObjectOwned> {
        self.execute(method, params, self.safe_mode.is_active())
            .await
    }

    /// Looks up `method`, enforces safe mode, and runs the command.
    ///
    /// Every failure is returned as an RPC error object; panics inside the command are
    /// reported as [`LegacyCode::Misc`].
    pub(crate) async fn execute(
        &self,
        method: &str,
        params: Vec<Value>,
        safe_mode_active: bool,
    ) -> Result<Value, ErrorObjectOwned> {
        let command = self
            .commands
            .get(method)
            .ok_or_else(|| ErrorObjectOwned::from(ErrorCode::MethodNotFound))?;

        if safe_mode_active && !command.safe_mode_ok {
            let warning = self
                .safe_mode
                .active_warning()
                .unwrap_or_else(|| UNKNOWN_WARNING.into());
            warn!("Refusing {method} while in safe mode");
            return Err(LegacyCode::ForbiddenBySafeMode.with_message(format!(
                "Safe mode: {warning}. Method {method} is disabled."
            )));
        }

        debug!("Running RPC method {method}");
        let handle = self
            .db
            .handle()
            .await
            .map_err(|e| CallError::Fault(e.to_string().into()).into_rpc(method))?;

        let run = |conn: &rusqlite::Connection, network: &Network| {
            let ctx = CallContext {
                conn,
                network: *network,
                commands: &self.commands,
            };
            panic::catch_unwind(AssertUnwindSafe(|| (command.actor)(&ctx, &params, false)))
                .unwrap_or_else(|payload| {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".into());
                    Err(CallError::Fault(message.into()))
                })
                .map_err(|e| e.into_rpc(method))
        };

        if command.mutates {
            handle.with_raw_mut(|conn, network| run(&*conn, network))
        } else {
            handle.with_raw(run)
        }
    }

    /// Registers every command with a [`jsonrpsee`] module.
    pub(crate) fn into_rpc_module(self) -> Result<RpcModule<Dispatcher>, Error> {
        let names = self.commands.names().collect::<Vec<_>>();
        let mut module = RpcModule::new(self);

        for name in names {
            module
                .register_async_method(name, move |params: Params<'static>, dispatcher, _| {
                    async move {
                        let params = params
                            .parse::<Option<Vec<Value>>>()?
                            .unwrap_or_default();
                        dispatcher.call(name, params).await
                    }
                })
                .map_err(|e| ErrorKind::Init.context(e))?;
        }

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::{Value, json};

    use super::{Dispatcher, SafeMode};
    use crate::{
        config::RpcSection,
        components::{
            database::testing::test_database,
            json_rpc::{
                methods,
                registry::{CallContext, CallResult, Command, CommandTable},
            },
        },
        network::Network,
    };

    const STAKING: &str = "PBMJh8s5cFzYGH6SzKJsmgrf43NcLgH47v";
    const SCRAPE: &str = "PAjArWaTwv8P32b13iTn1bL7aN25Y9pMmJ";
    const WIF: &str = "U9nhhCCbFfY64wozUZ6ScrNNvBqhGtoi8cNHXmaLm3wi1VHtjhr8";

    fn explode(_: &CallContext<'_>, _: &[Value], _: bool) -> CallResult {
        panic!("kaboom")
    }

    fn slow(_: &CallContext<'_>, _: &[Value], _: bool) -> CallResult {
        std::thread::sleep(Duration::from_secs(2));
        Ok(Value::Null)
    }

    async fn dispatcher() -> Dispatcher {
        let mut commands = methods::all().to_vec();
        commands.push(Command {
            name: "explode",
            actor: explode,
            safe_mode_ok: true,
            mutates: false,
        });
        commands.push(Command {
            name: "slow",
            actor: slow,
            safe_mode_ok: true,
            mutates: false,
        });
        Dispatcher::new(
            CommandTable::build(commands).unwrap(),
            test_database(Network::Main).await.unwrap(),
            SafeMode::new(false),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_method() {
        let d = dispatcher().await;
        let err = d.execute("getinfo", vec![], false).await.unwrap_err();
        assert_eq!(err.code(), -32601);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panics_become_misc_errors() {
        let d = dispatcher().await;
        let err = d.execute("explode", vec![], false).await.unwrap_err();
        assert_eq!(err.code(), -1);
        assert_eq!(err.message(), "kaboom");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn safe_mode_blocks_unsafe_methods() {
        let d = dispatcher().await;
        d.safe_mode()
            .set_warning(Some("Warning: Displayed transactions may not be correct!".into()));
        assert!(d.safe_mode().is_active());

        let err = d
            .call("setscrapeaddress", vec![json!(STAKING), json!(SCRAPE)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), -2);
        assert!(err.message().starts_with("Safe mode: Warning"));
        assert!(err.message().contains("setscrapeaddress"));

        // Reads are still allowed.
        let err = d.call("getscrapeaddress", vec![json!(STAKING)]).await.unwrap_err();
        assert_eq!(err.code(), -4);

        d.safe_mode().set_warning(None);
        d.call("importprivkey", vec![json!(WIF)]).await.unwrap();
        d.call("setscrapeaddress", vec![json!(STAKING), json!(SCRAPE)])
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_safe_mode_is_never_active() {
        let safe_mode = SafeMode::new(true);
        safe_mode.set_warning(Some("alert".into()));
        assert!(!safe_mode.is_active());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn explicit_safe_mode_flag_wins() {
        let d = dispatcher().await;
        let err = d
            .execute("deletescrapeaddress", vec![json!(STAKING)], true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), -2);
        assert_eq!(
            err.message(),
            "Safe mode: network warning raised. Method deletescrapeaddress is disabled.",
        );
    }

    #[test]
    fn test_safe_mode_raises_a_warning() {
        let config = RpcSection {
            test_safe_mode: Some(true),
            ..RpcSection::default()
        };
        let safe_mode = SafeMode::from_config(&config);
        assert_eq!(
            safe_mode.active_warning().as_deref(),
            Some("testsafemode enabled"),
        );

        let config = RpcSection {
            test_safe_mode: Some(true),
            disable_safe_mode: Some(true),
            ..RpcSection::default()
        };
        assert!(!SafeMode::from_config(&config).is_active());
        assert!(!SafeMode::from_config(&RpcSection::default()).is_active());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_run_alongside_each_other() {
        let d = dispatcher().await;

        let slow = tokio::spawn({
            let d = d.clone();
            async move { d.call("slow", vec![]).await }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let start = Instant::now();
        assert_eq!(
            d.call("listscrapeaddresses", vec![]).await.unwrap(),
            json!([]),
        );
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "read waited {:?} behind another read",
            start.elapsed(),
        );

        slow.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scrape_scenario() {
        let d = dispatcher().await;

        // Not in the wallet yet.
        for (method, params) in [
            ("setscrapeaddress", vec![json!(STAKING), json!(SCRAPE)]),
            ("getscrapeaddress", vec![json!(STAKING)]),
            ("deletescrapeaddress", vec![json!(STAKING)]),
        ] {
            let err = d.call(method, params).await.unwrap_err();
            assert_eq!(err.code(), -4, "{method}");
        }

        assert_eq!(
            d.call("importprivkey", vec![json!(WIF), json!("test")])
                .await
                .unwrap(),
            Value::Null,
        );

        let err = d
            .call("setscrapeaddress", vec![json!("PBMJh8s5cFz"), json!("PAjArWaTwv8")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), -5);
        let err = d
            .call("setscrapeaddress", vec![json!(STAKING), json!("PAjArWaTwv8")])
            .await
            .unwrap_err();
        assert_eq!((err.code(), err.message()), (-5, "Invalid scrape address."));
        let err = d
            .call("setscrapeaddress", vec![json!(STAKING), json!(STAKING)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), -4);

        assert_eq!(
            d.call("setscrapeaddress", vec![json!(STAKING), json!(SCRAPE)])
                .await
                .unwrap(),
            json!(SCRAPE),
        );
        assert_eq!(
            d.call("getscrapeaddress", vec![json!(STAKING)]).await.unwrap(),
            json!(SCRAPE),
        );
        assert_eq!(
            d.call("listscrapeaddresses", vec![]).await.unwrap(),
            json!([{"stakingaddress": STAKING, "scrapeaddress": SCRAPE}]),
        );
        assert_eq!(
            d.call("deletescrapeaddress", vec![json!(STAKING)])
                .await
                .unwrap(),
            json!(true),
        );
        let err = d
            .call("getscrapeaddress", vec![json!(STAKING)])
            .await
            .unwrap_err();
        assert_eq!(
            (err.code(), err.message()),
            (-4, format!("No scrape address set for address {STAKING}").as_str()),
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wrong_arity_returns_usage() {
        let d = dispatcher().await;
        let err = d.call("getscrapeaddress", vec![]).await.unwrap_err();
        assert_eq!(err.code(), -32602);
        assert!(err.message().starts_with("getscrapeaddress <staking address>"));
    }
}

//! Components of paycoind.
//!
//! These are not [`abscissa_core::Component`]s because Abscissa's dependency injection is
//! [buggy](https://github.com/iqlusioninc/abscissa/issues/989).

use tokio::task::JoinHandle;

use crate::error::Error;

pub(crate) mod database;
pub(crate) mod json_rpc;
pub(crate) mod keystore;
pub(crate) mod scrapes;

/// A handle to a background task spawned by a component.
///
/// Background tasks are ongoing: paycoind shuts down if one finishes. The tasks are
/// monitored by `StartCmd::start`.
pub(crate) type TaskHandle = JoinHandle<Result<(), Error>>;

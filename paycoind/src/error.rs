use std::fmt;
use std::ops::Deref;

use abscissa_core::error::{BoxError, Context};

#[cfg(feature = "rpc-cli")]
use crate::commands::rpc_cli::RpcCliError;
use crate::components::{database::migrations::MigrationError, scrapes::ScrapeError};

macro_rules! wfl {
    ($f:ident, $message_id:literal) => {
        write!($f, "{}", $crate::fl!($message_id))
    };

    ($f:ident, $message_id:literal, $($args:expr),* $(,)?) => {
        write!($f, "{}", $crate::fl!($message_id, $($args), *))
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    Database,
    Generic,
    Init,
    #[cfg(feature = "rpc-cli")]
    RpcCli(RpcCliError),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Database => wfl!(f, "err-kind-database"),
            ErrorKind::Generic => wfl!(f, "err-kind-generic"),
            ErrorKind::Init => wfl!(f, "err-kind-init"),
            #[cfg(feature = "rpc-cli")]
            ErrorKind::RpcCli(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ErrorKind {}

impl ErrorKind {
    /// Creates an error context from this error.
    pub(crate) fn context(self, source: impl Into<BoxError>) -> Context<ErrorKind> {
        Context::new(self, Some(source.into()))
    }
}

/// Error type
#[derive(Debug)]
pub(crate) struct Error(Box<Context<ErrorKind>>);

impl Deref for Error {
    type Target = Context<ErrorKind>;

    fn deref(&self) -> &Context<ErrorKind> {
        &self.0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.0)?;
        writeln!(f)?;
        writeln!(f, "[ {} ]", crate::fl!("err-ux-A"))?;
        write!(
            f,
            "[ {}: https://github.com/PaycoinFoundation/paycoin/issues {} ]",
            crate::fl!("err-ux-B"),
            crate::fl!("err-ux-C")
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Context::new(kind, None).into()
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(context: Context<ErrorKind>) -> Self {
        Error(Box::new(context))
    }
}

#[cfg(feature = "rpc-cli")]
impl From<RpcCliError> for Error {
    fn from(e: RpcCliError) -> Self {
        ErrorKind::RpcCli(e).into()
    }
}

impl From<MigrationError> for Error {
    fn from(e: MigrationError) -> Self {
        ErrorKind::Database.context(e).into()
    }
}

impl From<ScrapeError> for Error {
    fn from(e: ScrapeError) -> Self {
        ErrorKind::Database.context(e).into()
    }
}

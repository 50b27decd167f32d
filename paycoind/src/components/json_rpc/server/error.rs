//! RPC error codes & their handling.

use jsonrpsee::types::{ErrorCode, ErrorObjectOwned};

/// Bitcoin RPC error codes, as used by `paycoind`.
///
/// Drawn from the `RPCErrorCode` enumeration shared by Bitcoin-derived nodes. The
/// standard JSON-RPC codes (`-32601` method not found, `-32602` invalid params) come
/// from [`ErrorCode`].
///
/// ## Notes
///
/// - All explicit discriminants fit within `i32`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub(crate) enum LegacyCode {
    // General application defined errors
    /// Unclassified failure while handling the command
    #[default]
    Misc = -1,
    /// Server is in safe mode, and command is not allowed in safe mode
    ForbiddenBySafeMode = -2,
    /// Unexpected type was passed as parameter
    Type = -3,
    /// Invalid address or key
    InvalidAddressOrKey = -5,

    // Wallet errors
    /// Unspecified problem with wallet (key not found etc.)
    Wallet = -4,
}

impl LegacyCode {
    /// Adds a message to this error.
    pub(crate) fn with_message(self, message: impl Into<String>) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(self.into(), message.into(), None::<()>)
    }

    /// Adds a message to this error that is a static string.
    pub(crate) fn with_static(self, message: &'static str) -> ErrorObjectOwned {
        ErrorObjectOwned::borrowed(self.into(), message, None)
    }
}

impl From<LegacyCode> for ErrorCode {
    fn from(code: LegacyCode) -> Self {
        Self::ServerError(code as i32)
    }
}

impl From<LegacyCode> for i32 {
    fn from(code: LegacyCode) -> Self {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::LegacyCode;

    #[test]
    fn wire_codes() {
        assert_eq!(i32::from(LegacyCode::Misc), -1);
        assert_eq!(i32::from(LegacyCode::ForbiddenBySafeMode), -2);
        assert_eq!(i32::from(LegacyCode::Type), -3);
        assert_eq!(i32::from(LegacyCode::Wallet), -4);
        assert_eq!(i32::from(LegacyCode::InvalidAddressOrKey), -5);

        let err = LegacyCode::Wallet.with_message("Staking address must be in wallet.");
        assert_eq!(err.code(), -4);
        assert_eq!(err.message(), "Staking address must be in wallet.");
    }
}

use thiserror::Error;

use crate::host::Selector;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The cross-boundary call itself failed (thread attach, missing method, ...).
    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    /// A handle was the null sentinel or no longer refers to a live host object.
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// The host answered with a platform-level failure.
    #[error("Host rejected request: {0}")]
    HostRejected(String),

    #[error("Host capability not available: {0}")]
    UnknownSelector(Selector),

    #[error("Host returned an unexpected value for {selector}: expected {expected}")]
    UnexpectedValue {
        selector: Selector,
        expected: &'static str,
    },

    #[error("Malformed host data: {0}")]
    ParseFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

use thiserror::Error;

pub use bridge_traits::BridgeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Host error: {0}")]
    Host(#[from] BridgeError),

    #[error("Bridge is already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, Error>;

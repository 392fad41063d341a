pub mod codec;
pub mod config;
pub mod relay;
pub mod session;
pub mod transport;

pub use codec::CodecError;
pub use config::ConfigError;
pub use relay::RelayError;
pub use session::SessionError;
pub use transport::TransportError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

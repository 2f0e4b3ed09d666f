use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Core(#[from] magpie_core::CoreError),

    #[error("store error: {0}")]
    Store(#[from] magpie_store::StoreError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("type not configured: {0}")]
    NotConfigured(&'static str),
}

pub type SdkResult<T> = Result<T, SdkError>;

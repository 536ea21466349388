#![forbid(unsafe_code)]

//! Errors at the fallible edges of the surface crate: launch extras and
//! configuration. Controller operations never fail.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Rejected start parameters.
#[derive(Debug, Error)]
pub enum StartParamsError {
    #[error("start params carry no uri")]
    MissingUri,

    #[error("invalid uri string: {uri}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("start params carry no contents")]
    MissingContents,
}

/// Rejected configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a number: {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("teardown grace period of {millis}ms exceeds the {max_millis}ms limit")]
    GracePeriodTooLong { millis: u64, max_millis: u64 },
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error(transparent)]
    StartParams(#[from] StartParamsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StartParamsError {
    #[must_use]
    pub fn invalid_uri(uri: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            source,
        }
    }
}

//! Error types for sapctl

use crate::protocol::FailureCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SapError {
    /// A configuration or list file could not be opened
    #[error("unable to open {path:?}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The temp file could not be renamed over the original
    #[error("unable to replace {path:?}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Key absent from the file and no default to fall back on
    #[error("configuration parameter missing: {0}")]
    ParamMissing(String),
    /// Value failed validation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Structurally malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Neither a get nor a set request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// A resource needed mid-operation is not available
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
    /// MAC access list already holds the maximum number of entries
    #[error("MAC list {path:?} is full ({count} entries)")]
    ListFull { path: PathBuf, count: usize },
    /// Driver ioctl failed
    #[error("Driver error: {0}")]
    Driver(String),
    /// Control socket exchange with hostapd failed
    #[error("Control socket error: {0}")]
    Control(String),
    /// Control socket peer did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Stored state is outside what the engine understands
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Operation needs a running SoftAP
    #[error("SoftAP not started")]
    SoftapNotStarted,
    /// Lifecycle command execution failed
    #[error("Command '{cmd}' failed: {stderr}")]
    CommandFailed { cmd: String, code: Option<i32>, stderr: String },
    /// Service error (hostapd, driver module)
    #[error("Service error: {0}")]
    ServiceError(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SapError {
    /// The wire failure code this error is reported as.
    pub fn failure_code(&self) -> FailureCode {
        match self {
            SapError::FileOpen { .. } | SapError::ResourceUnavailable(_) => {
                FailureCode::ResourceUnavailable
            }
            SapError::ParamMissing(_) => FailureCode::FeatureNotEnabled,
            SapError::InvalidParameter(_) => FailureCode::InvalidParam,
            SapError::InvalidArgument(_) => FailureCode::InvalidArg,
            SapError::InvalidRequest(_) => FailureCode::InvalidRequest,
            SapError::NotSupported(_) => FailureCode::NotSupported,
            SapError::SoftapNotStarted => FailureCode::SoftapNotStarted,
            SapError::Rename { .. }
            | SapError::Io(_)
            | SapError::ListFull { .. }
            | SapError::Driver(_)
            | SapError::Control(_)
            | SapError::Timeout(_)
            | SapError::CommandFailed { .. }
            | SapError::ServiceError(_)
            | SapError::ConfigError(_) => FailureCode::Unknown,
        }
    }
}

impl From<toml::de::Error> for SapError {
    fn from(error: toml::de::Error) -> Self {
        SapError::ConfigError(error.to_string())
    }
}

pub type SapResult<T> = Result<T, SapError>;

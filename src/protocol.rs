//! Wire format of the command protocol
//!
//! A request is a single line, `get <name>` or `set <name>=<value>`.
//! A response is a single line, `success`, `success <key>=<value>` or
//! `failure <code>`.

use std::fmt;

pub const SUCCESS: &str = "success";
pub const FAILURE: &str = "failure";

/// Request verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Set,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Set => "set",
        }
    }
}

/// Fixed failure vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    ResourceUnavailable,
    FileOpenError,
    FeatureNotEnabled,
    InvalidParam,
    InvalidArg,
    InvalidRequest,
    Unknown,
    NotSupported,
    SoftapNotStarted,
    CouldNotEnableSoftap,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::ResourceUnavailable => "resource-unavailable",
            FailureCode::FileOpenError => "file-open-error",
            FailureCode::FeatureNotEnabled => "feature-not-enabled",
            FailureCode::InvalidParam => "invalid-param",
            FailureCode::InvalidArg => "invalid-arg",
            FailureCode::InvalidRequest => "invalid-request",
            FailureCode::Unknown => "unknown",
            FailureCode::NotSupported => "not-supported",
            FailureCode::SoftapNotStarted => "softap-not-started",
            FailureCode::CouldNotEnableSoftap => "could-not-enable-softap",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Bare `success`
    Done,
    /// `success <key>=<value>`
    Value { key: String, value: String },
    /// `failure <code>`
    Failure(FailureCode),
}

impl Response {
    pub fn value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Response::Value {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Failure(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Done => f.write_str(SUCCESS),
            Response::Value { key, value } => {
                let line = format!("{} {}={}", SUCCESS, key, value);
                f.write_str(line.trim_end_matches([' ', '\t']))
            }
            Response::Failure(code) => write!(f, "{} {}", FAILURE, code),
        }
    }
}

/// Skip leading spaces and tabs
pub fn skip_blanks(s: &str) -> &str {
    s.trim_start_matches([' ', '\t'])
}

/// Split a request line into its verb and the remaining argument text.
///
/// The verb must be followed by at least one blank. Returns `None` for
/// anything that is not a get or set request.
pub fn split_request(line: &str) -> Option<(Verb, &str)> {
    let line = skip_blanks(line);
    for verb in [Verb::Get, Verb::Set] {
        if let Some(rest) = line.strip_prefix(verb.as_str()) {
            if rest.starts_with([' ', '\t']) {
                return Some((verb, skip_blanks(rest)));
            }
        }
    }
    None
}

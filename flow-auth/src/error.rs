//! Error types for the `flow-auth` crate.
//!
//! Follows the same pattern as the rest of the workspace: a root `Error` struct holding an
//! error kind tree and an optional source for error chaining. Callers branch on `error_kind`,
//! never on message text.

use std::error::Error as StdError;
use std::fmt;

/// Message shown to end users for any state validation failure.
pub const STATE_REJECTED_MESSAGE: &str = "authorization request expired or invalid, please retry";

/// Top-level error type for flow-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in flow-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Configuration(ConfigurationErrorKind),
    State(StateErrorKind),
    Exchange(ExchangeErrorKind),
    Http(HttpErrorKind),
}

/// Bad constructor arguments. Never retryable.
#[derive(Debug, PartialEq)]
pub enum ConfigurationErrorKind {
    /// A required field was empty; carries the field name.
    MissingField(&'static str),
    /// The scope at this index was an empty string.
    EmptyScope(usize),
    /// The encryption key had this many bytes instead of 16, 24 or 32.
    InvalidKeyLength(usize),
    /// The named field did not parse as a URL.
    InvalidUrl(&'static str),
    UnknownProvider,
}

/// Errors from sealing, opening and tracking OAuth state.
#[derive(Debug, PartialEq)]
pub enum StateErrorKind {
    Serialization,
    Deserialization,
    Encryption,
    Decryption,
    /// Missing, expired, replayed or malformed state.
    NotFound,
    /// The ledger refused to record a freshly issued state.
    Storage,
}

/// Errors from the authorization code exchange.
#[derive(Debug, PartialEq)]
pub enum ExchangeErrorKind {
    Rejected,
    Timeout,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    Network,
    Timeout,
    Status(u16),
    Decode,
}

impl Error {
    /// True for failures a caller may retry (with backoff) without changing its input.
    pub fn is_retryable(&self) -> bool {
        match &self.error_kind {
            ErrorKind::Configuration(_) => false,
            ErrorKind::State(kind) => *kind == StateErrorKind::Storage,
            ErrorKind::Exchange(_) => true,
            ErrorKind::Http(kind) => *kind != HttpErrorKind::BuilderFailed,
        }
    }

    /// Message that is safe to show to the end user.
    ///
    /// Every state failure collapses into one message so a caller cannot probe
    /// whether a forged state was "not found" or "wrong key".
    pub fn user_message(&self) -> String {
        match &self.error_kind {
            ErrorKind::State(_) => STATE_REJECTED_MESSAGE.to_string(),
            ErrorKind::Exchange(_) | ErrorKind::Http(_) => {
                "the identity provider could not be reached, please retry".to_string()
            }
            ErrorKind::Configuration(_) => "the sign-in service is misconfigured".to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::State(kind) => write!(f, "State error: {:?}", kind),
            ErrorKind::Exchange(kind) => write!(f, "Code exchange error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_timeout() {
            ErrorKind::Http(HttpErrorKind::Timeout)
        } else if err.is_decode() {
            ErrorKind::Http(HttpErrorKind::Decode)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: ErrorKind::Http(HttpErrorKind::Network),
            },
        }
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(kind: ConfigurationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration(kind),
    }
}

/// Helper function to create state errors.
///
/// Decryption failures should be created with `state_error_opaque` instead so no
/// detail about the failure travels with the error.
pub fn state_error(kind: StateErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::State(kind),
    }
}

/// Helper function to create a state error carrying no source at all.
pub fn state_error_opaque(kind: StateErrorKind) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::State(kind),
    }
}

/// Helper function to create exchange errors.
pub fn exchange_error(kind: ExchangeErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Exchange(kind),
    }
}

/// Helper function to create HTTP errors.
pub fn http_error(kind: HttpErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Http(kind),
    }
}

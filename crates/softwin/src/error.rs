//! Error codes and the error reporter
//!
//! Every public operation reports failures through a single caller-registered
//! callback and returns a status value. Internally each fallible step returns
//! [`Result`] and is propagated with `?` up to the public boundary, where it is
//! handed to the [`ErrorReporter`].

use std::fmt;
use thiserror::Error;

/// Stable error codes delivered to the error callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// An operation other than init/terminate was called before `init`
    NotInitialized = 0x0001_0001,
    /// An argument was out of its valid range
    InvalidValue = 0x0001_0002,
    /// An allocation failed
    OutOfMemory = 0x0001_0003,
    /// The host display service refused a request
    PlatformError = 0x0001_0004,
}

impl ErrorCode {
    /// Integer value of the code
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code from its integer value
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0x0001_0001 => Some(Self::NotInitialized),
            0x0001_0002 => Some(Self::InvalidValue),
            0x0001_0003 => Some(Self::OutOfMemory),
            0x0001_0004 => Some(Self::PlatformError),
            _ => None,
        }
    }

    /// Default human-readable description
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotInitialized => "softwin is not initialized",
            Self::InvalidValue => "invalid parameter value",
            Self::OutOfMemory => "out of memory",
            Self::PlatformError => "platform error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// An error with its code and the message handed to the error callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    /// Create an error carrying the default description of `code`
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.description().to_string(),
        }
    }

    /// Create an error with a more specific message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Library used before `init`
    pub fn not_initialized() -> Self {
        Self::new(ErrorCode::NotInitialized)
    }

    /// Argument out of range
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidValue, message)
    }

    /// Host display service failure
    pub fn platform(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PlatformError, message)
    }

    /// The error code
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The message delivered to the error callback
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Callback receiving every reported error
pub type ErrorCallback = Box<dyn FnMut(ErrorCode, &str)>;

/// Sink that forwards reported errors to the registered callback
///
/// Reports are always logged, so silencing the callback does not hide them
/// from `RUST_LOG` output.
#[derive(Default)]
pub struct ErrorReporter {
    callback: Option<ErrorCallback>,
}

impl ErrorReporter {
    /// Create a reporter with no callback
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the callback, returning the previous one
    pub fn set_callback(&mut self, callback: Option<ErrorCallback>) -> Option<ErrorCallback> {
        std::mem::replace(&mut self.callback, callback)
    }

    /// Whether a callback is registered
    pub const fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Log the error and hand it to the callback
    pub fn report(&mut self, error: &Error) {
        match error.code() {
            ErrorCode::PlatformError | ErrorCode::OutOfMemory => {
                log::error!("{} (0x{:08X})", error.message(), error.code().code());
            }
            ErrorCode::NotInitialized | ErrorCode::InvalidValue => {
                log::warn!("{} (0x{:08X})", error.message(), error.code().code());
            }
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(error.code(), error.message());
        }
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

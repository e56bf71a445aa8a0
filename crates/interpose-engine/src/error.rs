//! Error types for the interception engine.
//!
//! Interceptor chains never wrap or translate errors: whatever an interceptor
//! or the terminal operation returns as `Err` travels unchanged to the caller.
//! The variants below only describe where a fault originated.

use crate::value::Value;

/// Result type used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by user code, the object model, or class setup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value raised by user code (method body, interceptor, accessor)
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// Object model fault (calling a non-callable, member access on a primitive)
    #[error("Type error: {0}")]
    TypeError(String),

    /// Arbitrary host error raised by user code
    #[error("{0}")]
    Custom(#[source] Box<dyn std::error::Error + 'static>),

    /// Class configuration error detected while building a class
    #[error("Configuration error: {0}")]
    Config(String),

    /// Options file could not be read
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Options document could not be parsed
    #[error("Options error: {0}")]
    Options(#[from] toml::de::Error),
}

impl Error {
    /// Raise a value, the way a `throw` statement would.
    pub fn thrown(value: impl Into<Value>) -> Self {
        Error::Thrown(value.into())
    }

    /// Wrap any host error.
    pub fn custom(err: impl std::error::Error + 'static) -> Self {
        Error::Custom(Box::new(err))
    }

    /// The thrown value, if this error carries one.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Error::Thrown(v) => Some(v),
            _ => None,
        }
    }
}

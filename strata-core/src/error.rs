//! Error Types
//!
//! Errors fall into two groups:
//!
//! - Fatal errors abort the call that triggered them: a bad registration
//!   ([`ConfigurationError`]), a nested dispatch, or an unknown action.
//!   These are returned as [`StoreError`].
//!
//! - Recoverable errors come from user code running inside a dispatch
//!   (middleware handlers, setters, update hooks). They are wrapped in
//!   [`HandlerError`], caught at the dispatch boundary and routed to the
//!   store's error hook. They never reach the caller of `dispatch`.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Convenience alias for results returned by the store.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned from the public store API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A reducer registration was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// `dispatch` was called while another dispatch was still running.
    #[error("dispatch of \"{action}\" attempted while another dispatch is in progress")]
    Reentrancy { action: String },

    /// No reducer is registered under the dispatched action name.
    #[error("action \"{action}\" is not registered")]
    UnknownAction { action: String },
}

impl StoreError {
    /// Whether this is a [`StoreError::Reentrancy`] error.
    pub fn is_reentrancy(&self) -> bool {
        matches!(self, StoreError::Reentrancy { .. })
    }

    /// Whether this is a [`StoreError::UnknownAction`] error.
    pub fn is_unknown_action(&self) -> bool {
        matches!(self, StoreError::UnknownAction { .. })
    }
}

/// Reasons a reducer registration is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("action name must not be empty")]
    EmptyAction,

    #[error("action \"{action}\" is already registered")]
    DuplicateAction { action: String },

    #[error("key \"{key}\" contributed by \"{action}\" already exists in the state tree")]
    DuplicateKey { action: String, key: String },

    /// The initial state contribution is not a key/value mapping.
    #[error("partial state of \"{action}\" must be an object, found {found}")]
    MalformedPartialState { action: String, found: &'static str },
}

/// A failure raised by user code during a dispatch.
///
/// Wraps any error type. Build one with [`HandlerError::new`] or through the
/// `From` conversions, so `?` works inside handlers and setters.
#[derive(Debug)]
pub struct HandlerError(Box<dyn StdError + Send + Sync>);

impl HandlerError {
    /// Wrap an error or a message.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self(error.into())
    }

    /// Borrow the wrapped error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    /// Try to view the wrapped error as a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Convert a panic payload caught from user code.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast_ref::<&'static str>() {
                Some(message) => (*message).to_owned(),
                None => "unknown panic payload".to_owned(),
            },
        };
        Self::new(format!("panicked: {message}"))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for HandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}

impl From<StoreError> for HandlerError {
    fn from(error: StoreError) -> Self {
        Self(Box::new(error))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        Self(Box::new(error))
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_from_message() {
        let err = HandlerError::new("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn handler_error_keeps_store_error() {
        let err: HandlerError = StoreError::Reentrancy {
            action: "rename".into(),
        }
        .into();

        let inner = err.downcast_ref::<StoreError>().unwrap();
        assert!(inner.is_reentrancy());
    }

    #[test]
    fn source_is_the_wrapped_error() {
        let err: HandlerError = StoreError::UnknownAction {
            action: "missing".into(),
        }
        .into();

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "action \"missing\" is not registered");
        assert!(source.downcast_ref::<StoreError>().is_some());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let from_str = HandlerError::from_panic(Box::new("hook blew up"));
        assert_eq!(from_str.to_string(), "panicked: hook blew up");

        let from_string = HandlerError::from_panic(Box::new(String::from("bad index")));
        assert_eq!(from_string.to_string(), "panicked: bad index");

        let other = HandlerError::from_panic(Box::new(7_u8));
        assert_eq!(other.to_string(), "panicked: unknown panic payload");
    }

    #[test]
    fn configuration_error_converts_into_store_error() {
        let err: StoreError = ConfigurationError::DuplicateKey {
            action: "b".into(),
            key: "name".into(),
        }
        .into();

        assert!(matches!(
            err,
            StoreError::Configuration(ConfigurationError::DuplicateKey { .. })
        ));
        assert!(err.to_string().contains("\"name\""));
    }
}

//! Payload validators.
//!
//! Callers that know the expected shape of a response or render-data payload
//! hand a `Validator` to the client; the payload is parsed before the caller
//! ever sees it.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse an untrusted value into a typed value or fail with a message.
pub trait Validator: Send + Sync + 'static {
    type Output: Send + 'static;

    fn validate(&self, value: Value) -> std::result::Result<Self::Output, String>;
}

/// Accepts anything and yields the raw JSON value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unvalidated;

impl Validator for Unvalidated {
    type Output = Value;

    fn validate(&self, value: Value) -> std::result::Result<Value, String> {
        Ok(value)
    }
}

/// Serde-backed schema: the value must deserialize into `T`.
pub struct Schema<T>(PhantomData<fn() -> T>);

impl<T> Schema<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Validator for Schema<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn validate(&self, value: Value) -> std::result::Result<T, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }
}

/// Closure-based validator for ad hoc checks.
pub struct Check<F>(pub F);

impl<F, T> Validator for Check<F>
where
    F: Fn(Value) -> std::result::Result<T, String> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn validate(&self, value: Value) -> std::result::Result<T, String> {
        (self.0)(value)
    }
}

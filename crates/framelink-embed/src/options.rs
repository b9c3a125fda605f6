//! Per-request options.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use framelink_core::validate::{Schema, Unvalidated, Validator};

/// Options for one `request_action` call.
pub struct RequestOptions<V = Unvalidated> {
    /// Response shape; the result is parsed before the caller sees it.
    pub validator: V,
    /// Already-cancelled tokens suppress the send entirely.
    pub cancel: Option<CancellationToken>,
    /// Local deadline; behaves like cancellation when it elapses.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions<Unvalidated> {
    fn default() -> Self {
        Self {
            validator: Unvalidated,
            cancel: None,
            timeout: None,
        }
    }
}

impl RequestOptions<Unvalidated> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: Validator> RequestOptions<V> {
    pub fn with_validator<W: Validator>(self, validator: W) -> RequestOptions<W> {
        RequestOptions {
            validator,
            cancel: self.cancel,
            timeout: self.timeout,
        }
    }

    /// Shorthand for `with_validator(Schema::<T>::new())`.
    pub fn with_schema<T>(self) -> RequestOptions<Schema<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.with_validator(Schema::new())
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

//! Standard body transformers.

use pollen_core::{BoxError, Transform};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Parses the body as JSON into `T`.
///
/// This is the default transformer of the registration combinator.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    /// Create a new JSON transformer.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Json<T> {}

impl<T: DeserializeOwned + 'static> Transform<T> for Json<T> {
    fn transform(&self, body: &str) -> Result<T, BoxError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Passes the body through as an owned `String`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8;

impl Transform<String> for Utf8 {
    fn transform(&self, body: &str) -> Result<String, BoxError> {
        Ok(body.to_owned())
    }
}

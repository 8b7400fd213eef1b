//! Body transformation contract.

use crate::error::BoxError;

/// Converts a raw message body into a typed value.
///
/// A failing transform drops only the message it was applied to.
///
/// Closures of the form `Fn(&str) -> Result<T, BoxError>` are transformers
/// out of the box.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot transform a message body into `{T}`",
    label = "missing `Transform<{T}>` implementation",
    note = "Closures must have the signature `Fn(&str) -> Result<{T}, BoxError>`."
)]
pub trait Transform<T>: Send + Sync + 'static {
    /// Convert `body`.
    fn transform(&self, body: &str) -> Result<T, BoxError>;
}

impl<T, F> Transform<T> for F
where
    F: Fn(&str) -> Result<T, BoxError> + Send + Sync + 'static,
{
    fn transform(&self, body: &str) -> Result<T, BoxError> {
        (self)(body)
    }
}

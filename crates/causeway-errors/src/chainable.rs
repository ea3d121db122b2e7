//! The capability an error implements to cross an RPC boundary intact.
//!
//! Any error type may implement [`Chainable`]. Packing records the type
//! identifier and self-serialized payload for every level of a cause chain;
//! unpacking looks the identifier up in the [`Registry`](crate::Registry) and
//! re-links the rebuilt levels with [`Chainable::wrap`].
//!
//! Errors without the capability still travel: they become a node of type
//! [`BARE_ERROR_TYPE`] carrying only their rendered text, and come back as a
//! [`BareError`].

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::error::ChainError;

/// Shared, thread-safe error handle used throughout a chain.
pub type DynError = Arc<dyn StdError + Send + Sync + 'static>;

/// Type identifier reserved for [`StructuredError`](crate::StructuredError).
pub const STRUCTURED_ERROR_TYPE: &str = "causeway.structured_error";

/// Type identifier reserved for errors that are not [`Chainable`].
pub const BARE_ERROR_TYPE: &str = "causeway.bare_error";

/// An error that can serialize itself into a chain node and be re-linked to a
/// cause after reconstruction.
pub trait Chainable: StdError + Send + Sync + 'static {
    /// Globally unique identifier of this representation.
    ///
    /// Must match the identifier the type is registered under.
    fn chain_type(&self) -> &str;

    /// Serialize this error's own fields, excluding its cause.
    fn marshal(&self) -> Result<Vec<u8>, ChainError>;

    /// Return a new error of the same representation with `cause` installed.
    ///
    /// Must not mutate `self`: other holders may still observe it.
    fn wrap(&self, cause: DynError) -> DynError;
}

/// Unstructured error that renders exactly its message.
///
/// Stands in for foreign errors on the receiving side of a chain, and for any
/// node whose type identifier is unknown or whose payload cannot be decoded.
#[derive(Debug, Clone)]
pub struct BareError {
    message: String,
    source: Option<DynError>,
}

impl BareError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Same message, with `cause` reachable through `source()`.
    pub fn with_source(&self, cause: DynError) -> Self {
        Self {
            message: self.message.clone(),
            source: Some(cause),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for BareError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

/// Links an error that has no [`Chainable`] implementation to a cause.
///
/// Renders as the outer error alone; the cause stays reachable through
/// `source()` rather than being folded into the text.
#[derive(Debug, Clone)]
pub struct Wrapped {
    error: DynError,
    cause: DynError,
}

impl Wrapped {
    pub fn new(error: DynError, cause: DynError) -> Self {
        Self { error, cause }
    }

    /// The outer error.
    pub fn error(&self) -> &DynError {
        &self.error
    }
}

impl fmt::Display for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl StdError for Wrapped {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause as &(dyn StdError + 'static))
    }
}

/// Attach `cause` to an error that is not [`Chainable`].
pub(crate) fn wrap_generic(error: DynError, cause: DynError) -> DynError {
    match error.downcast_ref::<BareError>() {
        Some(bare) if bare.source.is_none() => Arc::new(bare.with_source(cause)),
        _ => Arc::new(Wrapped::new(error, cause)),
    }
}

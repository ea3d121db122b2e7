//! Type registry for chain node reconstruction.
//!
//! Maps a type identifier to the function that rebuilds an error from a
//! node's `(message, data)`. Entries registered through
//! [`Registry::register`] also carry a probe that recognises the concrete
//! type behind a `&dyn Error`, which is how the packer finds the
//! [`Chainable`] implementation of each level in a cause chain.
//!
//! The registry is read by every pack and unpack call and written only while
//! a process sets up its error types, so entries sit behind a `RwLock`.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::debug;

use crate::chainable::{BareError, Chainable, DynError, BARE_ERROR_TYPE, STRUCTURED_ERROR_TYPE};
use crate::config::ChainConfig;
use crate::error::{ChainError, RegistryError, Result};
use crate::structured::{unmarshal_structured, StructuredError};

/// Rebuilds an error from a node's rendered message and payload.
pub type ReconstructFn =
    Arc<dyn Fn(&str, &[u8]) -> std::result::Result<DynError, ChainError> + Send + Sync>;

/// Recognises one concrete error type behind a trait object.
type ProbeFn = for<'a> fn(&'a (dyn StdError + 'static)) -> Option<&'a dyn Chainable>;

fn probe<'a, T: Chainable>(err: &'a (dyn StdError + 'static)) -> Option<&'a dyn Chainable> {
    err.downcast_ref::<T>().map(|e| e as &dyn Chainable)
}

#[derive(Clone, Default)]
struct Entry {
    reconstruct: Option<ReconstructFn>,
    probe: Option<ProbeFn>,
}

lazy_static! {
    static ref GLOBAL: Registry = Registry::new();
}

/// Mapping from type identifier to reconstruction function
pub struct Registry {
    entries: RwLock<HashMap<String, Entry>>,
    config: ChainConfig,
}

impl Registry {
    /// Create a registry holding the two built-in entries
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    /// Create a registry with custom limits
    pub fn with_config(config: ChainConfig) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            STRUCTURED_ERROR_TYPE.to_string(),
            Entry {
                reconstruct: Some(Arc::new(unmarshal_structured)),
                probe: Some(probe::<StructuredError>),
            },
        );
        // Bare nodes always rebuild through the message-only fallback.
        entries.insert(BARE_ERROR_TYPE.to_string(), Entry::default());

        Self {
            entries: RwLock::new(entries),
            config,
        }
    }

    /// Process-wide registry used by the free [`pack`](fn@crate::pack) and
    /// [`unpack`](fn@crate::unpack) functions.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Register a [`Chainable`] type under `ty`.
    ///
    /// Fails with [`RegistryError::AlreadyRegistered`] if `ty` is taken,
    /// including by a built-in; the registry is left unchanged in that case.
    pub fn register<T, F>(&self, ty: impl Into<String>, reconstruct: F) -> Result<()>
    where
        T: Chainable,
        F: Fn(&str, &[u8]) -> std::result::Result<DynError, ChainError> + Send + Sync + 'static,
    {
        self.insert(
            ty.into(),
            Entry {
                reconstruct: Some(Arc::new(reconstruct)),
                probe: Some(probe::<T>),
            },
        )
    }

    /// Register a reconstruction function without a packing-side type.
    ///
    /// Useful on a receiver that rebuilds nodes produced by another process's
    /// error type.
    pub fn register_decoder<F>(&self, ty: impl Into<String>, reconstruct: F) -> Result<()>
    where
        F: Fn(&str, &[u8]) -> std::result::Result<DynError, ChainError> + Send + Sync + 'static,
    {
        self.insert(
            ty.into(),
            Entry {
                reconstruct: Some(Arc::new(reconstruct)),
                probe: None,
            },
        )
    }

    fn insert(&self, ty: String, entry: Entry) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&ty) {
            return Err(RegistryError::AlreadyRegistered(ty));
        }
        debug!(error_type = %ty, "registered chainable error type");
        entries.insert(ty, entry);
        Ok(())
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.entries.read().contains_key(ty)
    }

    /// All registered type identifiers, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// View `err` through its [`Chainable`] implementation, if its concrete
    /// type is registered.
    pub fn as_chainable<'a>(&self, err: &'a (dyn StdError + 'static)) -> Option<&'a dyn Chainable> {
        let entries = self.entries.read();
        let found = entries
            .values()
            .filter_map(|entry| entry.probe)
            .find_map(|probe| probe(err));
        found
    }

    /// Rebuild one node's error. Never fails: unknown types, entries without
    /// a function, and failing functions all yield a [`BareError`] carrying
    /// `message`.
    pub fn reconstruct(&self, ty: &str, message: &str, data: &[u8]) -> DynError {
        let reconstruct = self
            .entries
            .read()
            .get(ty)
            .and_then(|entry| entry.reconstruct.clone());

        match reconstruct {
            Some(f) => match f(message, data) {
                Ok(err) => err,
                Err(e) => {
                    debug!(error_type = %ty, error = %e, "reconstruction failed, using bare error");
                    Arc::new(BareError::new(message))
                }
            },
            None => {
                if ty != BARE_ERROR_TYPE {
                    debug!(error_type = %ty, "no reconstruction function, using bare error");
                }
                Arc::new(BareError::new(message))
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types())
            .field("config", &self.config)
            .finish()
    }
}

//! Distributed error chains for gRPC services.
//!
//! A [`StructuredError`] carries a transport status, business code, reason,
//! message, metadata and cause. [`pack`] serializes an error together with
//! its whole `source()` chain into the details of a [`tonic::Status`], and
//! [`unpack`] rebuilds an equivalent chain on the receiving side, including
//! levels whose concrete type the receiver has never seen.
//!
//! Error types join the protocol by implementing [`Chainable`] and
//! registering a reconstruction function with a [`Registry`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use causeway_errors::{pack, unpack_status, BareError, StructuredError};
//! use tonic::Code;
//!
//! let err = StructuredError::new(Some(Code::InvalidArgument), 40001, "INVALID_PARAMS", "bad id")
//!     .with_cause(Arc::new(BareError::new("db closed")));
//!
//! let status = pack(Code::InvalidArgument, &err);
//! let rebuilt = unpack_status(&status);
//!
//! let outer = rebuilt.downcast_ref::<StructuredError>().unwrap();
//! assert_eq!(outer.reason(), "INVALID_PARAMS");
//! assert_eq!(outer.cause().unwrap().to_string(), "db closed");
//! ```

use std::error::Error as StdError;

use tonic::{Code, Status};

pub mod chainable;
pub mod config;
pub mod detail;
pub mod error;
pub mod pack;
pub mod registry;
pub mod structured;
pub mod unpack;

pub use chainable::{BareError, Chainable, DynError, Wrapped, BARE_ERROR_TYPE, STRUCTURED_ERROR_TYPE};
pub use config::ChainConfig;
pub use error::{ChainError, RegistryError};
pub use registry::{ReconstructFn, Registry};
pub use structured::{code_of, reason_of, status_from_i32, StructuredError};
pub use unpack::extract_chain;

/// Pack `err` and its causes with the process-wide registry.
pub fn pack(code: Code, err: &(dyn StdError + 'static)) -> Status {
    Registry::global().pack(code, err)
}

/// Pack the error side of `result` with the process-wide registry.
pub fn pack_result<T, E>(code: Code, result: Result<T, E>) -> Result<T, Status>
where
    E: StdError + 'static,
{
    Registry::global().pack_result(code, result)
}

/// Rebuild `err` with the process-wide registry; non-status errors pass through.
pub fn unpack(err: DynError) -> DynError {
    Registry::global().unpack(err)
}

/// Rebuild the chain embedded in `status` with the process-wide registry.
pub fn unpack_status(status: &Status) -> DynError {
    Registry::global().unpack_status(status)
}

/// Rebuild the error side of `result` with the process-wide registry.
pub fn unpack_result<T>(result: Result<T, Status>) -> Result<T, DynError> {
    Registry::global().unpack_result(result)
}

//! HTTP rendering for causeway errors.
//!
//! Fixed translation tables between gRPC codes and HTTP status codes, plus
//! the JSON envelope HTTP handlers return. Only the `(status, code, message)`
//! accessors of [`StructuredError`](causeway_errors::StructuredError) and
//! [`tonic::Status`] are consumed here.

pub mod envelope;
pub mod mapping;

pub use envelope::ResponseEnvelope;
pub use mapping::{grpc_code_from_http_status, http_status_from_error, http_status_from_grpc_code};

//! Protocol Buffer type definitions for causeway.
//!
//! Types are generated at build time from the `.proto` files under the
//! workspace `proto/` directory. The error chain types carry serde support so
//! they can be dumped as JSON when debugging a wire payload.
//!
//! Uses protoc-bin-vendored to avoid requiring protoc installation.

/// Error chain envelope embedded in RPC status details.
pub mod errors {
    include!(concat!(env!("OUT_DIR"), "/causeway.errors.v1.rs"));
}

/// The subset of `google.rpc` used to carry typed status details.
pub mod rpc {
    include!(concat!(env!("OUT_DIR"), "/google.rpc.rs"));
}

mod node;

pub use errors::{ErrorChain, ErrorChainNode};
pub use node::Nodes;

// Re-exported so downstream crates pack details without naming prost-types.
pub use prost_types::Any;

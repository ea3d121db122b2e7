//! Typed details carried in the `grpc-status-details-bin` payload of a status.
//!
//! tonic keeps the raw detail bytes on [`Status`]; by convention they hold an
//! encoded `google.rpc.Status` whose `details` are `Any`-packed messages.

use bytes::Bytes;
use causeway_proto::rpc;
use causeway_proto::Any;
use prost::{Message, Name};
use tonic::{Code, Status};

/// Decode the `google.rpc.Status` body attached to `status`, if any.
pub fn rpc_status(status: &Status) -> Option<rpc::Status> {
    let raw = status.details();
    if raw.is_empty() {
        return None;
    }
    rpc::Status::decode(raw).ok()
}

/// First detail entry of `status` that decodes as `M`.
pub fn find_detail<M>(status: &Status) -> Option<M>
where
    M: Message + Name + Default,
{
    rpc_status(status)?
        .details
        .iter()
        .find_map(|any| any.to_msg::<M>().ok())
}

/// Build a status whose detail bytes carry `details` in a `google.rpc.Status`.
pub fn status_with_details(code: Code, message: impl Into<String>, details: Vec<Any>) -> Status {
    let message = message.into();
    let body = rpc::Status {
        code: code as i32,
        message: message.clone(),
        details,
    };
    Status::with_details(code, message, Bytes::from(body.encode_to_vec()))
}

//! Bidirectional gRPC code <-> HTTP status tables

use std::error::Error as StdError;

use causeway_errors::StructuredError;
use http::StatusCode;
use tonic::{Code, Status};

/// Non-standard "Client Closed Request", used for cancelled calls.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// gRPC code for an HTTP status.
///
/// 409 maps to `AlreadyExists` even though `Aborted` also renders as 409.
pub fn grpc_code_from_http_status(status: u16) -> Code {
    match status {
        200 => Code::Ok,
        CLIENT_CLOSED_REQUEST => Code::Cancelled,
        400 | 411 | 413 | 414 | 415 | 406 | 431 | 422 => Code::InvalidArgument,
        408 | 504 => Code::DeadlineExceeded,
        404 | 410 => Code::NotFound,
        409 => Code::AlreadyExists,
        403 | 451 => Code::PermissionDenied,
        401 | 407 => Code::Unauthenticated,
        429 | 425 => Code::ResourceExhausted,
        412 | 428 | 426 => Code::FailedPrecondition,
        501 => Code::Unimplemented,
        503 => Code::Unavailable,
        500 => Code::Internal,
        _ => Code::Unknown,
    }
}

/// HTTP status for a gRPC code.
pub fn http_status_from_grpc_code(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => {
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
        }
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTTP status for the outcome of a handler.
///
/// No error renders as 200. A [`StructuredError`] with an unset status is
/// treated as `Unknown`. Errors that are neither structured nor a gRPC status
/// also render as 200; the envelope's business code carries the failure.
pub fn http_status_from_error(err: Option<&(dyn StdError + 'static)>) -> StatusCode {
    let Some(err) = err else {
        return StatusCode::OK;
    };

    if let Some(se) = err.downcast_ref::<StructuredError>() {
        return http_status_from_grpc_code(se.status().unwrap_or(Code::Unknown));
    }

    if let Some(status) = err.downcast_ref::<Status>() {
        return http_status_from_grpc_code(status.code());
    }

    StatusCode::OK
}

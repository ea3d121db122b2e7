//! JSON body returned by HTTP handlers

use std::error::Error as StdError;

use causeway_errors::structured::FOREIGN_CODE;
use causeway_errors::StructuredError;
use serde::{Deserialize, Serialize};
use tonic::Status;

/// Response body: payload plus a business status and message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub data: T,
    pub status: i32,
    pub message: String,
}

impl<T> ResponseEnvelope<T> {
    /// Successful response.
    pub fn ok(data: T) -> Self {
        Self {
            data,
            status: 0,
            message: String::new(),
        }
    }

    /// Build an envelope, letting `err` override `status` and `message`.
    ///
    /// A [`StructuredError`] contributes its business code and message, a
    /// gRPC [`Status`] its numeric code and message, and any other error
    /// `-1` and its rendered text.
    pub fn wrap(
        status: i32,
        message: impl Into<String>,
        data: T,
        err: Option<&(dyn StdError + 'static)>,
    ) -> Self {
        let (status, message) = match err {
            None => (status, message.into()),
            Some(err) => {
                if let Some(se) = err.downcast_ref::<StructuredError>() {
                    (se.code(), se.message().to_string())
                } else if let Some(st) = err.downcast_ref::<Status>() {
                    (st.code() as i32, st.message().to_string())
                } else {
                    (FOREIGN_CODE, err.to_string())
                }
            }
        };

        Self {
            data,
            status,
            message,
        }
    }
}

impl<T: Serialize> ResponseEnvelope<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

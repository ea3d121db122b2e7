//! The framework's canonical error value.
//!
//! A [`StructuredError`] carries a transport status, a business code, a
//! machine-readable reason, a human message, string metadata and an optional
//! cause. Two families of modifiers exist:
//!
//! - [`with_cause`](StructuredError::with_cause) and
//!   [`with_metadata`](StructuredError::with_metadata) borrow the receiver and
//!   return a modified clone. A shared template can derive many errors at once
//!   without any derivation seeing another's cause or metadata.
//! - [`with_status`](StructuredError::with_status),
//!   [`with_code`](StructuredError::with_code),
//!   [`with_reason`](StructuredError::with_reason) and
//!   [`with_message`](StructuredError::with_message) mutate the receiver in
//!   place and return it for chaining.
//!
//! Equivalence ([`StructuredError::is`] and `PartialEq`) compares only
//! `(code, reason)`.

use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use causeway_proto::rpc::ErrorInfo;
use causeway_proto::Any;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tonic::{Code, Status};

use crate::chainable::{Chainable, DynError, STRUCTURED_ERROR_TYPE};
use crate::detail;
use crate::error::ChainError;

/// Business code for errors converted from a foreign source.
pub const FOREIGN_CODE: i32 = -1;

/// Reason assigned when converting a gRPC status without an `ErrorInfo`.
pub const REASON_FROM_GRPC_STATUS: &str = "CONVERT_FROM_GRPC_STATUS";

/// Reason assigned when converting any other foreign error.
pub const REASON_FROM_ERROR: &str = "CONVERT_FROM_ERROR";

/// `ErrorInfo.domain` written when a [`StructuredError`] becomes a [`Status`].
pub const ERROR_INFO_DOMAIN: &str = "causeway";

/// Map a raw status number onto a gRPC code; out-of-range values become
/// [`Code::Unknown`].
pub fn status_from_i32(value: i32) -> Code {
    Code::from_i32(value)
}

/// Structured, chainable error value.
#[derive(Debug, Clone, Default)]
pub struct StructuredError {
    status: Option<Code>,
    code: i32,
    reason: String,
    message: String,
    metadata: HashMap<String, String>,
    cause: Option<DynError>,
}

impl StructuredError {
    /// Create an error with empty metadata and no cause.
    pub fn new(
        status: Option<Code>,
        code: i32,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            reason: reason.into(),
            message: message.into(),
            metadata: HashMap::new(),
            cause: None,
        }
    }

    /// Convert any error into a `StructuredError`.
    ///
    /// A `StructuredError` is cloned as is. A gRPC [`Status`] keeps its code
    /// and message and lifts reason and metadata from an attached
    /// `ErrorInfo`; anything else keeps only its rendered text.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        if let Some(se) = err.downcast_ref::<StructuredError>() {
            return se.clone();
        }

        if let Some(status) = err.downcast_ref::<Status>() {
            return Self::from_status(status);
        }

        Self::new(Some(Code::Unknown), FOREIGN_CODE, REASON_FROM_ERROR, err.to_string())
    }

    fn from_status(status: &Status) -> Self {
        let mut se = Self::new(
            Some(status.code()),
            FOREIGN_CODE,
            REASON_FROM_GRPC_STATUS,
            status.message(),
        );
        match detail::find_detail::<ErrorInfo>(status) {
            Some(info) => {
                se.with_reason(info.reason);
                se.with_metadata(info.metadata)
            }
            None => se,
        }
    }

    pub fn status(&self) -> Option<Code> {
        self.status
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// The direct cause, if any.
    pub fn cause(&self) -> Option<&DynError> {
        self.cause.as_ref()
    }

    /// Clone with `cause` installed. The receiver is left untouched.
    pub fn with_cause(&self, cause: DynError) -> Self {
        let mut derived = self.clone();
        derived.cause = Some(cause);
        derived
    }

    /// Clone with the metadata replaced. The receiver is left untouched.
    pub fn with_metadata(&self, metadata: HashMap<String, String>) -> Self {
        let mut derived = self.clone();
        derived.metadata = metadata;
        derived
    }

    pub fn with_status(&mut self, status: Code) -> &mut Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(&mut self, code: i32) -> &mut Self {
        self.code = code;
        self
    }

    pub fn with_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = reason.into();
        self
    }

    pub fn with_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = message.into();
        self
    }

    /// Equivalence by `(code, reason)`; message, metadata and cause are ignored.
    pub fn is(&self, other: &(dyn StdError + 'static)) -> bool {
        other
            .downcast_ref::<StructuredError>()
            .is_some_and(|o| o.code == self.code && o.reason == self.reason)
    }

    /// Whether `err` or any error in its cause chain is equivalent to `self`.
    pub fn is_in(&self, err: &(dyn StdError + 'static)) -> bool {
        let mut current = Some(err);
        while let Some(e) = current {
            if self.is(e) {
                return true;
            }
            current = e.source();
        }
        false
    }

    /// Structured JSON rendering used by `Display`.
    fn render(&self) -> Result<String, serde_json::Error> {
        let mut info = Map::new();
        if let Some(status) = self.status {
            info.insert("status".into(), Value::String(format!("{status:?}")));
        }
        info.insert("code".into(), Value::from(self.code));
        info.insert("reason".into(), Value::String(self.reason.clone()));
        if !self.message.is_empty() {
            info.insert("message".into(), Value::String(self.message.clone()));
        }
        if !self.metadata.is_empty() {
            let sorted: BTreeMap<&String, &String> = self.metadata.iter().collect();
            info.insert("metadata".into(), serde_json::to_value(sorted)?);
        }
        if let Some(cause) = &self.cause {
            info.insert("cause".into(), Value::String(cause.to_string()));
        }
        serde_json::to_string(&info)
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => write!(f, "[{}][{}]{}", self.code, self.reason, self.message),
        }
    }
}

impl StdError for StructuredError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl PartialEq for StructuredError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.reason == other.reason
    }
}

impl Eq for StructuredError {}

/// Wire payload: every field except the cause.
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<i32>,
    code: i32,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl Chainable for StructuredError {
    fn chain_type(&self) -> &str {
        STRUCTURED_ERROR_TYPE
    }

    fn marshal(&self) -> Result<Vec<u8>, ChainError> {
        let payload = Payload {
            status: self.status.map(|s| s as i32),
            code: self.code,
            reason: self.reason.clone(),
            message: self.message.clone(),
            metadata: self.metadata.clone(),
        };
        Ok(serde_json::to_vec(&payload)?)
    }

    fn wrap(&self, cause: DynError) -> DynError {
        Arc::new(self.with_cause(cause))
    }
}

/// Rebuild a [`StructuredError`] from its chain node payload.
pub(crate) fn unmarshal_structured(_message: &str, data: &[u8]) -> Result<DynError, ChainError> {
    let payload: Payload = serde_json::from_slice(data)?;
    let mut se = StructuredError::new(
        payload.status.map(status_from_i32),
        payload.code,
        payload.reason,
        payload.message,
    );
    se.metadata = payload.metadata;
    Ok(Arc::new(se))
}

impl From<StructuredError> for DynError {
    fn from(err: StructuredError) -> Self {
        Arc::new(err)
    }
}

impl From<Status> for StructuredError {
    fn from(status: Status) -> Self {
        Self::from_status(&status)
    }
}

/// Plain status with an `ErrorInfo` detail; no cause chain.
///
/// Use [`pack`](fn@crate::pack) to send the cause chain along as well.
impl From<StructuredError> for Status {
    fn from(err: StructuredError) -> Self {
        let info = ErrorInfo {
            reason: err.reason.clone(),
            domain: ERROR_INFO_DOMAIN.to_string(),
            metadata: err.metadata.clone(),
        };
        let code = err.status.unwrap_or(Code::Unknown);
        match Any::from_msg(&info) {
            Ok(any) => detail::status_with_details(code, err.message, vec![any]),
            Err(_) => Status::new(code, err.message),
        }
    }
}

/// Business code of `err` after conversion.
pub fn code_of(err: &(dyn StdError + 'static)) -> i32 {
    StructuredError::from_error(err).code
}

/// Reason of `err` after conversion.
pub fn reason_of(err: &(dyn StdError + 'static)) -> String {
    StructuredError::from_error(err).reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainable::BareError;
    use pretty_assertions::assert_eq;

    fn invalid_params() -> StructuredError {
        StructuredError::new(Some(Code::InvalidArgument), 40001, "INVALID_PARAMS", "invalid params")
    }

    #[test]
    fn test_new_defaults() {
        let err = StructuredError::new(None, 7, "R", "m");
        assert_eq!(err.status(), None);
        assert!(err.metadata().is_empty());
        assert!(err.cause().is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_equivalence_by_code_and_reason() {
        let a = invalid_params();
        let b = invalid_params()
            .with_metadata(HashMap::from([("k".to_string(), "v".to_string())]))
            .with_message("different text")
            .clone();
        assert!(a.is(&b));
        assert_eq!(a, b);

        let mut c = invalid_params();
        c.with_reason("OTHER");
        assert!(!a.is(&c));
        assert_ne!(a, c);

        let bare = BareError::new("invalid params");
        assert!(!a.is(&bare));
    }

    #[test]
    fn test_is_in_walks_chain() {
        let target = invalid_params();
        let outer = StructuredError::new(Some(Code::Internal), 500, "WRAPPER", "")
            .with_cause(invalid_params().with_cause(Arc::new(BareError::new("db"))).into());
        assert!(target.is_in(&outer));
        assert!(!target.is_in(&BareError::new("db")));
    }

    #[test]
    fn test_clone_family_leaves_receiver() {
        let base = invalid_params();
        let a = base.with_cause(Arc::new(BareError::new("x")));
        let b = base.with_metadata(HashMap::from([("id".to_string(), "1".to_string())]));

        assert_eq!(a.cause().unwrap().to_string(), "x");
        assert!(b.cause().is_none());
        assert!(base.cause().is_none());
        assert!(base.metadata().is_empty());
        assert_eq!(b.metadata().get("id").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_cosmetic_setters_mutate_in_place() {
        let mut err = invalid_params();
        err.with_status(Code::NotFound)
            .with_code(404)
            .with_reason("NOT_FOUND")
            .with_message("gone");
        assert_eq!(err.status(), Some(Code::NotFound));
        assert_eq!(err.code(), 404);
        assert_eq!(err.reason(), "NOT_FOUND");
        assert_eq!(err.message(), "gone");
    }

    #[test]
    fn test_display_is_deterministic_json() {
        let err = invalid_params()
            .with_metadata(HashMap::from([
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string()),
            ]))
            .with_cause(Arc::new(BareError::new("db closed")));

        let rendered = err.to_string();
        assert_eq!(
            rendered,
            r#"{"cause":"db closed","code":40001,"message":"invalid params","metadata":{"a":"1","b":"2"},"reason":"INVALID_PARAMS","status":"InvalidArgument"}"#
        );
        assert_eq!(rendered, err.clone().to_string());
    }

    #[test]
    fn test_display_omits_empty_fields() {
        let err = StructuredError::new(None, 1, "", "");
        assert_eq!(err.to_string(), r#"{"code":1,"reason":""}"#);
    }

    #[test]
    fn test_status_range_normalized() {
        assert_eq!(status_from_i32(5), Code::NotFound);
        assert_eq!(status_from_i32(99), Code::Unknown);
        assert_eq!(status_from_i32(-3), Code::Unknown);
    }

    #[test]
    fn test_marshal_roundtrip_keeps_unset_status() {
        let err = StructuredError::new(None, 3, "R", "m")
            .with_metadata(HashMap::from([("k".to_string(), "v".to_string())]));
        let data = err.marshal().unwrap();
        assert!(!String::from_utf8_lossy(&data).contains("status"));

        let back = unmarshal_structured("", &data).unwrap();
        let back = back.downcast_ref::<StructuredError>().unwrap();
        assert_eq!(back.status(), None);
        assert_eq!(back.code(), 3);
        assert_eq!(back.message(), "m");
        assert_eq!(back.metadata(), err.metadata());
    }

    #[test]
    fn test_unmarshal_out_of_range_status() {
        let back = unmarshal_structured("", br#"{"status":42,"code":1}"#).unwrap();
        let back = back.downcast_ref::<StructuredError>().unwrap();
        assert_eq!(back.status(), Some(Code::Unknown));
    }

    #[test]
    fn test_unmarshal_garbage_fails() {
        assert!(unmarshal_structured("m", b"not json").is_err());
        assert!(unmarshal_structured("m", b"").is_err());
    }

    #[test]
    fn test_from_foreign_error() {
        let io = std::io::Error::other("connection reset");
        let se = StructuredError::from_error(&io);
        assert_eq!(se.status(), Some(Code::Unknown));
        assert_eq!(se.code(), FOREIGN_CODE);
        assert_eq!(se.reason(), REASON_FROM_ERROR);
        assert_eq!(se.message(), "connection reset");
    }

    #[test]
    fn test_from_plain_status() {
        let status = Status::cancelled("context canceled");
        let se = StructuredError::from_error(&status);
        assert_eq!(se.status(), Some(Code::Cancelled));
        assert_eq!(se.code(), FOREIGN_CODE);
        assert_eq!(se.reason(), REASON_FROM_GRPC_STATUS);
        assert_eq!(se.message(), "context canceled");
    }

    #[test]
    fn test_status_with_error_info_roundtrip() {
        let err = invalid_params()
            .with_metadata(HashMap::from([("field".to_string(), "id".to_string())]));
        let status: Status = err.clone().into();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "invalid params");

        let se = StructuredError::from(status);
        assert_eq!(se.status(), Some(Code::InvalidArgument));
        assert_eq!(se.code(), FOREIGN_CODE);
        assert_eq!(se.reason(), "INVALID_PARAMS");
        assert_eq!(se.metadata(), err.metadata());
    }

    #[test]
    fn test_from_structured_is_clone() {
        let err = invalid_params();
        let se = StructuredError::from_error(&err);
        assert_eq!(se.code(), 40001);
        assert_eq!(se.message(), "invalid params");
        assert_eq!(code_of(&err), 40001);
        assert_eq!(reason_of(&err), "INVALID_PARAMS");
    }
}

//! Chain unpacker: rebuilds an error chain from an RPC status.
//!
//! Nodes are rebuilt innermost first through the [`Registry`], then linked
//! outward: a level whose error is [`Chainable`](crate::Chainable) wraps the
//! inner error itself, anything else is linked generically so the inner error
//! stays reachable through `source()`.
//!
//! Unpacking never fails. A status without a decodable chain comes back as
//! the status itself, and nodes of unknown type come back as
//! [`BareError`](crate::BareError)s carrying their rendered text.

use std::sync::Arc;

use causeway_proto::{ErrorChain, ErrorChainNode};
use tonic::Status;
use tracing::warn;

use crate::chainable::{wrap_generic, DynError};
use crate::detail;
use crate::registry::Registry;

/// The first status detail that decodes as an [`ErrorChain`].
pub fn extract_chain(status: &Status) -> Option<ErrorChain> {
    detail::find_detail::<ErrorChain>(status)
}

impl Registry {
    /// Rebuild the error chain embedded in `status`.
    pub fn unpack_status(&self, status: &Status) -> DynError {
        match extract_chain(status).and_then(|chain| chain.root) {
            Some(root) => self.rebuild(&root),
            None => Arc::new(status.clone()),
        }
    }

    /// Rebuild `err` if it is a gRPC status; other errors pass through.
    pub fn unpack(&self, err: DynError) -> DynError {
        if let Some(status) = err.downcast_ref::<Status>() {
            return self.unpack_status(status);
        }
        err
    }

    /// Rebuild the error side of `result`; `Ok` passes through untouched.
    pub fn unpack_result<T>(&self, result: Result<T, Status>) -> Result<T, DynError> {
        result.map_err(|status| self.unpack_status(&status))
    }

    /// Rebuild the chain starting at `root`.
    ///
    /// Reads at most `max_depth` levels plus the truncation marker a packer
    /// with the same limit may have appended.
    pub fn rebuild(&self, root: &ErrorChainNode) -> DynError {
        let max_depth = self.config().max_depth.max(1);
        let limit = max_depth + 1;
        let nodes: Vec<&ErrorChainNode> = root.iter().take(limit).collect();
        if nodes.len() == limit && nodes[limit - 1].wrapped.is_some() {
            warn!(max_depth, "received error chain truncated");
        }

        let mut inner: Option<DynError> = None;
        for node in nodes.into_iter().rev() {
            let err = self.reconstruct(&node.r#type, &node.message, &node.data);
            inner = Some(match inner {
                Some(cause) => self.link(err, cause),
                None => err,
            });
        }

        inner.unwrap_or_else(|| self.reconstruct(&root.r#type, &root.message, &root.data))
    }

    fn link(&self, err: DynError, cause: DynError) -> DynError {
        if let Some(chainable) = self.as_chainable(&*err) {
            return chainable.wrap(cause);
        }
        wrap_generic(err, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainable::{BareError, Wrapped, BARE_ERROR_TYPE, STRUCTURED_ERROR_TYPE};
    use crate::config::ChainConfig;
    use crate::structured::StructuredError;
    use causeway_proto::Any;
    use std::error::Error as StdError;
    use tonic::Code;

    fn status_with_chain(chain: &ErrorChain) -> Status {
        detail::status_with_details(Code::Unknown, "wire", vec![Any::from_msg(chain).unwrap()])
    }

    #[test]
    fn test_unknown_type_fallback() {
        let registry = Registry::new();
        let node = ErrorChainNode::new("nonexistent", "boom");
        let err = registry.unpack_status(&status_with_chain(&ErrorChain::with_root(node)));
        assert_eq!(err.to_string(), "boom");
        assert!(err.downcast_ref::<BareError>().is_some());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_unknown_type_keeps_cause() {
        let registry = Registry::new();
        let mut outer = ErrorChainNode::new("nonexistent", "outer");
        outer.wrapped = Some(Box::new(ErrorChainNode::new(BARE_ERROR_TYPE, "inner")));

        let err = registry.rebuild(&outer);
        assert_eq!(err.to_string(), "outer");
        assert_eq!(err.source().unwrap().to_string(), "inner");
    }

    #[test]
    fn test_status_without_chain_passes_through() {
        let registry = Registry::new();
        let status = Status::permission_denied("no");
        let err = registry.unpack_status(&status);
        let back = err.downcast_ref::<Status>().unwrap();
        assert_eq!(back.code(), Code::PermissionDenied);
        assert_eq!(back.message(), "no");
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let registry = Registry::new();
        let status = status_with_chain(&ErrorChain::default());
        let err = registry.unpack_status(&status);
        assert!(err.downcast_ref::<Status>().is_some());
    }

    #[test]
    fn test_non_status_passes_through() {
        let registry = Registry::new();
        let original: DynError = Arc::new(BareError::new("local"));
        let err = registry.unpack(original.clone());
        assert!(Arc::ptr_eq(&err, &original));
    }

    #[test]
    fn test_unpack_result() {
        let registry = Registry::new();
        let ok: Result<&str, Status> = Ok("fine");
        assert_eq!(registry.unpack_result(ok).unwrap(), "fine");

        let node = ErrorChainNode::new("nonexistent", "boom");
        let err: Result<(), Status> = Err(status_with_chain(&ErrorChain::with_root(node)));
        assert_eq!(registry.unpack_result(err).unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_corrupt_structured_payload_degrades() {
        let registry = Registry::new();
        let mut outer = ErrorChainNode::new(STRUCTURED_ERROR_TYPE, "outer text");
        outer.data = b"{not json".to_vec();
        let mut inner = ErrorChainNode::new(STRUCTURED_ERROR_TYPE, "inner text");
        inner.data = br#"{"status":5,"code":404,"reason":"NOT_FOUND","message":"gone"}"#.to_vec();
        outer.wrapped = Some(Box::new(inner));

        let err = registry.rebuild(&outer);
        assert_eq!(err.to_string(), "outer text");
        let cause = err.source().unwrap();
        let se = cause.downcast_ref::<StructuredError>().unwrap();
        assert_eq!(se.status(), Some(Code::NotFound));
        assert_eq!(se.reason(), "NOT_FOUND");
    }

    #[test]
    fn test_decoder_only_type_linked_generically() {
        let registry = Registry::new();
        registry
            .register_decoder("test.io", |message, _| {
                Ok(Arc::new(std::io::Error::other(message.to_string())) as DynError)
            })
            .unwrap();

        let mut outer = ErrorChainNode::new("test.io", "disk gone");
        outer.wrapped = Some(Box::new(ErrorChainNode::new(BARE_ERROR_TYPE, "inner")));

        let err = registry.rebuild(&outer);
        let wrapped = err.downcast_ref::<Wrapped>().unwrap();
        assert!(wrapped.error().downcast_ref::<std::io::Error>().is_some());
        assert_eq!(err.to_string(), "disk gone");
        assert_eq!(err.source().unwrap().to_string(), "inner");
    }

    #[test]
    fn test_rebuild_respects_max_depth() {
        let registry = Registry::with_config(ChainConfig::new().max_depth(1));
        let mut node = ErrorChainNode::new(BARE_ERROR_TYPE, "level 3");
        for level in (0..3).rev() {
            let mut outer = ErrorChainNode::new(BARE_ERROR_TYPE, format!("level {level}"));
            outer.wrapped = Some(Box::new(node));
            node = outer;
        }

        let err = registry.rebuild(&node);
        assert_eq!(err.to_string(), "level 0");
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "level 1");
        assert!(cause.source().is_none());
    }
}

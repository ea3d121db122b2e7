//! Chain packer: turns an error and its causes into an RPC status.
//!
//! Each level of the `source()` chain becomes one [`ErrorChainNode`], from the
//! outermost error down to the innermost cause. The resulting [`ErrorChain`]
//! is embedded as an `Any` detail of the outgoing status, so receivers that
//! know nothing about chains still see a normal code and message.

use std::error::Error as StdError;

use causeway_proto::{Any, ErrorChain, ErrorChainNode};
use tonic::{Code, Status};
use tracing::{debug, warn};

use crate::chainable::{DynError, BARE_ERROR_TYPE};
use crate::detail;
use crate::registry::Registry;
use crate::unpack::extract_chain;

/// Message prefix of the internal status returned when the envelope itself
/// cannot be embedded.
pub const PACK_FAILURE_PREFIX: &str = "failed to chain error:";

/// Message prefix of a node whose error failed to serialize itself.
pub const MARSHAL_FAILURE_PREFIX: &str = "failed to marshal chainable error:";

/// Message of the bare node appended below the last packed level when a
/// chain is cut at the configured depth.
pub const TRUNCATED_MESSAGE: &str = "error chain truncated";

/// Look through shared handles to the error they hold.
///
/// A [`DynError`] is itself an `Error`, so `&arc` would hide the concrete
/// type of the error inside from `downcast_ref` and the registry probes.
fn peel<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut err = err;
    while let Some(shared) = err.downcast_ref::<DynError>() {
        err = &**shared;
    }
    err
}

/// Text of a single level; a status contributes only its message.
fn level_text(err: &(dyn StdError + 'static)) -> String {
    match err.downcast_ref::<Status>() {
        Some(status) => status.message().to_string(),
        None => err.to_string(),
    }
}

impl Registry {
    /// Pack `err` and its causes into a status with code `code`.
    ///
    /// A status that already carries a chain is returned unchanged, so
    /// packing twice never nests envelopes. Errors held in a [`DynError`]
    /// are packed by their contents.
    pub fn pack(&self, code: Code, err: &(dyn StdError + 'static)) -> Status {
        let err = peel(err);
        if let Some(status) = err.downcast_ref::<Status>() {
            if extract_chain(status).is_some() {
                debug!(code = ?status.code(), "status already carries an error chain");
                return status.clone();
            }
        }

        let text = level_text(err);
        let chain = self.build_chain(err);

        match Any::from_msg(&chain) {
            Ok(any) => detail::status_with_details(code, text, vec![any]),
            Err(e) => {
                warn!(error = %e, "failed to embed error chain");
                Status::internal(format!("{PACK_FAILURE_PREFIX} {e}, raw error: {text}"))
            }
        }
    }

    /// Pack the error side of `result`; `Ok` passes through untouched.
    pub fn pack_result<T, E>(&self, code: Code, result: Result<T, E>) -> Result<T, Status>
    where
        E: StdError + 'static,
    {
        result.map_err(|e| self.pack(code, &e))
    }

    /// Build the wire chain for `err` without embedding it.
    ///
    /// At most `max_depth` levels are packed; a deeper chain gets one extra
    /// bare node carrying [`TRUNCATED_MESSAGE`].
    pub fn build_chain(&self, err: &(dyn StdError + 'static)) -> ErrorChain {
        let max_depth = self.config().max_depth.max(1);

        let mut nodes: Vec<ErrorChainNode> = Vec::new();
        let mut current = Some(err);
        while let Some(e) = current {
            if nodes.len() == max_depth {
                warn!(max_depth, "error chain truncated");
                nodes.push(ErrorChainNode::new(BARE_ERROR_TYPE, TRUNCATED_MESSAGE));
                break;
            }
            let e = peel(e);
            nodes.push(self.node_for(e));
            current = e.source();
        }

        let mut wrapped: Option<ErrorChainNode> = None;
        for mut node in nodes.into_iter().rev() {
            node.wrapped = wrapped.map(Box::new);
            wrapped = Some(node);
        }

        ErrorChain { root: wrapped }
    }

    /// One node for a single level, ignoring its cause.
    fn node_for(&self, err: &(dyn StdError + 'static)) -> ErrorChainNode {
        let message = level_text(err);

        let Some(chainable) = self.as_chainable(err) else {
            return ErrorChainNode::new(BARE_ERROR_TYPE, message);
        };

        let ty = chainable.chain_type().to_string();
        match chainable.marshal() {
            Ok(data) => {
                let mut node = ErrorChainNode::new(ty, message);
                node.data = data;
                node
            }
            Err(e) => {
                warn!(error_type = %ty, error = %e, "chainable error failed to marshal");
                ErrorChainNode::new(
                    ty,
                    format!("{MARSHAL_FAILURE_PREFIX} {e}, raw error: {message}"),
                )
            }
        }
    }
}

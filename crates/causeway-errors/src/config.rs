//! Limits applied while packing and unpacking chains

use serde::Deserialize;

/// Default cap on the number of nodes in one chain.
///
/// Kept well under prost's nested message limit of 100, which would otherwise
/// make a deep chain undecodable on the receiving side.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for a [`Registry`](crate::Registry)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Maximum number of nodes packed or rebuilt for a single chain
    pub max_depth: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }
}

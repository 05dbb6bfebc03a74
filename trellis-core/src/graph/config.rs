//! Graph Configuration

use serde::{Deserialize, Serialize};

use super::error::{GraphError, Result};

/// What `extend_publishers` does to the staleness of the extended node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendPolicy {
    /// Leave the node's state untouched. Callers that attach publishers whose
    /// values differ from what the node last saw must invalidate it through
    /// an input of their own.
    #[default]
    Preserve,

    /// Mark the extended node (and its downstream closure) stale.
    Invalidate,
}

/// Tunables for a [`Graph`](crate::reactive::Graph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Staleness handling for late-bound publishers.
    pub extend_policy: ExtendPolicy,

    /// Warn when a recompute reads a node it did not declare as a publisher.
    pub warn_undeclared_reads: bool,

    /// Number of arena slots to reserve up front.
    pub initial_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            extend_policy: ExtendPolicy::Preserve,
            warn_undeclared_reads: true,
            initial_capacity: 0,
        }
    }
}

impl GraphConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| GraphError::Config(e.to_string()))
    }

    pub fn with_extend_policy(mut self, policy: ExtendPolicy) -> Self {
        self.extend_policy = policy;
        self
    }

    pub fn with_undeclared_read_warnings(mut self, enabled: bool) -> Self {
        self.warn_undeclared_reads = enabled;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

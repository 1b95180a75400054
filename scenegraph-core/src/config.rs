//! Graph Configuration
//!
//! Tunables for a single editing session's graph. Every field has a default,
//! so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a [`Scene`](crate::Scene) and its graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Refuse `create_dependency` calls that would close a cycle.
    ///
    /// The evaluation pass terminates on cyclic graphs (it is guarded by the
    /// visited epoch), but the resulting order is meaningless.
    pub reject_cycles: bool,

    /// Emit a `warn!` when an evaluation pass takes longer than this many
    /// milliseconds.
    pub slow_pass_warning_ms: Option<u64>,

    /// Fire `GraphEvent::Evaluated` even when a pass recomputed nothing.
    pub notify_empty_passes: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            reject_cycles: true,
            slow_pass_warning_ms: None,
            notify_empty_passes: false,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

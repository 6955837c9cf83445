use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Structured error payload returned by the pool manager.
///
/// All fields are optional so deserialization stays best-effort: a body
/// that parses but carries no `message` is treated as unstructured by the
/// client layer.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PoolApiErrorBody {
    /// Human-readable error message, forwarded to callers verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// HTTP-style status code as reported by the originating system.
    /// Usually, but not always, equal to the transport status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Name of the system that produced the error (e.g. `pool-manager`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Opaque structured payload; preserved for the caller, never
    /// interpreted here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    /// Catch-all for unknown fields, kept for diagnostics.
    #[serde(default, flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

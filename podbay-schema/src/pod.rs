use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Live pod instance as reported by the pool manager.
///
/// The pod's lifecycle is owned by the control plane; this service only
/// reads the descriptor and asks the control plane to act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDescriptor {
    pub id: String,

    /// Shared secret authenticating calls to the pod's own control port.
    #[serde(default)]
    pub password: String,

    /// Container port (as a string) -> publicly reachable URL.
    #[serde(default)]
    pub port_mappings: BTreeMap<String, String>,

    #[serde(default)]
    pub repositories: Vec<PodRepository>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRepository {
    pub url: String,
}

/// `PUT {controlUrl}/repositories` payload resetting the pod's checkout set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRepositoriesRequest {
    pub password: String,
    pub repositories: Vec<PodRepository>,
}

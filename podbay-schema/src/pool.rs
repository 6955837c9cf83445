use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single name/value pair injected into the pod environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Payload for the pool-manager create call.
///
/// Field naming follows the control plane's JSON convention (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub name: String,

    /// Number of pre-warmed VMs the pool keeps ready.
    pub min_vm_count: u32,

    /// Primary repository checked out into new pods. Empty when the
    /// workspace has no repositories yet.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,

    pub github_username: String,
    pub github_token: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<EnvVar>,

    /// Devcontainer definition files (path -> content) baked into the
    /// pod image.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub container_files: BTreeMap<String, String>,
}

/// Pool descriptor returned by the control plane on create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_count: Option<u32>,

    /// Catch-all for control-plane fields this service does not interpret.
    #[serde(default, flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Response to the api-key minting call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedApiKey {
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_omits_empty_optionals() {
        let req = CreatePoolRequest {
            name: "acme-pool".to_string(),
            min_vm_count: 1,
            repository_url: String::new(),
            branch: String::new(),
            github_username: "octocat".to_string(),
            github_token: "ghp_x".to_string(),
            environment_variables: Vec::new(),
            container_files: BTreeMap::new(),
        };

        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            value,
            json!({
                "name": "acme-pool",
                "minVmCount": 1,
                "githubUsername": "octocat",
                "githubToken": "ghp_x",
            })
        );
    }

    #[test]
    fn pool_descriptor_preserves_unknown_fields() {
        let raw = r#"{"name":"acme-pool","state":"ready","vmCount":2,"region":"us-east"}"#;
        let parsed: PoolDescriptor = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.name, "acme-pool");
        assert_eq!(parsed.state.as_deref(), Some("ready"));
        assert_eq!(parsed.vm_count, Some(2));
        assert_eq!(parsed.extra.get("region"), Some(&json!("us-east")));
    }
}

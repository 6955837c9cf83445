use serde::{Deserialize, Serialize};
use url::Url;

/// Pool-manager and pod orchestration settings (see `orchestration` table
/// in config.toml). Injected into the workflows as a plain struct so tests
/// can override any field without touching process state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestrationConfig {
    /// Base URL of the pool-manager control plane.
    /// TOML: `orchestration.pool_manager_url`.
    #[serde(default = "default_pool_manager_url")]
    pub pool_manager_url: Url,

    /// Service-level bearer token, used only to mint pool API keys.
    /// TOML: `orchestration.service_token`.
    #[serde(default)]
    pub service_token: String,

    /// Minimum number of pre-warmed VMs requested per pool.
    /// TOML: `orchestration.min_vm_count`. Default: `1`.
    #[serde(default = "default_min_vm_count")]
    pub min_vm_count: u32,

    /// Container port exposing the pod's management endpoint. Pods that do
    /// not map this port cannot have their repository set reset.
    /// TOML: `orchestration.control_port`. Default: `"3030"`.
    #[serde(default = "default_control_port")]
    pub control_port: String,

    /// TCP connect timeout for control-plane calls, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// End-to-end timeout for a single control-plane call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Transport-level retry budget for the idempotent pod-inspect call.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Harness-only escape hatch: report pod drops as successful without
    /// touching credentials or the control plane. Never enable in
    /// production.
    /// TOML: `orchestration.mock_browser`. Default: `false`.
    #[serde(default)]
    pub mock_browser: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            pool_manager_url: default_pool_manager_url(),
            service_token: String::new(),
            min_vm_count: default_min_vm_count(),
            control_port: default_control_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_max_times: default_retry_max_times(),
            mock_browser: false,
        }
    }
}

fn default_pool_manager_url() -> Url {
    Url::parse("http://127.0.0.1:9480").expect("default pool manager url is valid")
}

fn default_min_vm_count() -> u32 {
    1
}

fn default_control_port() -> String {
    "3030".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_retry_max_times() -> usize {
    2
}

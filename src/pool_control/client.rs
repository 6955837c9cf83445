use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use podbay_schema::{
    CreatePoolRequest, PodDescriptor, PodRepository, PoolDescriptor, PoolApiErrorBody,
    ProvisionedApiKey, UpdateRepositoriesRequest,
};
use reqwest::Response;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::config::OrchestrationConfig;
use crate::pool_control::error::preview;
use crate::pool_control::{PoolControl, PoolControlError};

/// Pool-manager HTTP client. One instance per process; the underlying
/// `reqwest::Client` pools connections and applies the configured
/// connect/request timeouts to every call.
pub struct HttpPoolControl {
    client: reqwest::Client,
    base_url: Url,
    service_token: String,
    retry_policy: ExponentialBuilder,
}

impl HttpPoolControl {
    pub fn new(cfg: &OrchestrationConfig) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .expect("failed to build reqwest client");

        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_max_times(cfg.retry_max_times)
            .with_jitter();

        Self {
            client,
            base_url: cfg.pool_manager_url.clone(),
            service_token: cfg.service_token.clone(),
            retry_policy,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .expect("pool manager url cannot be a base");
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    /// Turn a non-success response into a structured or fallback error.
    async fn classify(resp: Response) -> PoolControlError {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        match serde_json::from_str::<PoolApiErrorBody>(&text) {
            Ok(body) if body.message.is_some() => PoolControlError::Api { status, body },
            _ => PoolControlError::Fallback {
                status,
                body: preview(&text),
            },
        }
    }
}

#[async_trait]
impl PoolControl for HttpPoolControl {
    async fn create_pool(
        &self,
        request: &CreatePoolRequest,
        api_key: &str,
    ) -> Result<PoolDescriptor, PoolControlError> {
        let url = self.endpoint(&["pools"]);
        let resp = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::classify(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn provision_api_key(&self, pool_name: &str) -> Result<String, PoolControlError> {
        let url = self.endpoint(&["pools", pool_name, "api-keys"]);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.service_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::classify(resp).await);
        }

        let minted: ProvisionedApiKey = resp.json().await?;
        Ok(minted.api_key)
    }

    async fn get_workspace_from_pool(
        &self,
        pool_name: &str,
        api_key: &str,
    ) -> Result<PodDescriptor, PoolControlError> {
        let url = self.endpoint(&["pools", pool_name, "workspace"]);

        // Inspect is idempotent, so transport hiccups are worth retrying.
        let resp = (|| {
            let client = self.client.clone();
            let url = url.clone();
            let api_key = api_key.to_string();
            async move { client.get(url).bearer_auth(&api_key).send().await }
        })
        .retry(&self.retry_policy)
        .notify(|err: &reqwest::Error, dur: Duration| {
            warn!(pool = pool_name, error = %err, "pod inspect failed, retry in {dur:?}");
        })
        .await?;

        if !resp.status().is_success() {
            return Err(Self::classify(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn drop_pod(
        &self,
        pool_name: &str,
        pod_id: &str,
        api_key: &str,
    ) -> Result<(), PoolControlError> {
        let url = self.endpoint(&["pools", pool_name, "workspaces", pod_id]);
        let resp = self.client.delete(url).bearer_auth(api_key).send().await?;

        if !resp.status().is_success() {
            return Err(Self::classify(resp).await);
        }

        Ok(())
    }

    async fn update_pod_repositories(
        &self,
        control_url: &str,
        password: &str,
        repositories: &[PodRepository],
    ) -> Result<(), PoolControlError> {
        let url = format!("{}/repositories", control_url.trim_end_matches('/'));
        let body = UpdateRepositoriesRequest {
            password: password.to_string(),
            repositories: repositories.to_vec(),
        };

        let resp = self.client.put(url).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(Self::classify(resp).await);
        }

        Ok(())
    }
}

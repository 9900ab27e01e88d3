//! Functions for driving the SparkPilot control plane over HTTP.

use ::sparkpilot_common::entity::{
    hex_suffix, CreateEnvironmentRequest, CreateJobRequest, CreateRunRequest, CreateTenantRequest,
    Environment, Job, LogsResponse, ProvisioningOperation, Run, Tenant, UsageResponse,
};
use ::sparkpilot_common::serde::de::DeserializeOwned;

type Result<T> = std::result::Result<T, reqwest::Error>;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
const ACTOR_HEADER: &str = "X-Actor";

/// Client for the SparkPilot REST surface. Every mutation carries an
/// idempotency key (caller supplied or generated) and the actor header.
pub struct ControlClient<'a> {
    /// Base URL of the SparkPilot server.
    base_url: &'a str,
    /// Actor recorded in the audit trail.
    actor: &'a str,
    /// HTTP client for making requests to the server.
    client: reqwest::Client,
}

impl<'a> ControlClient<'a> {
    /// Create a new `ControlClient`.
    pub fn new(base_url: &'a str, actor: &'a str) -> Self {
        Self {
            base_url,
            actor,
            client: reqwest::Client::new(),
        }
    }

    pub async fn create_tenant(
        &self,
        request: &CreateTenantRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Tenant> {
        let builder = self.client.post(self.build_url("/v1/tenants")).json(request);
        self.send_mutation(builder, idempotency_key).await
    }

    pub async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
        idempotency_key: Option<&str>,
    ) -> Result<ProvisioningOperation> {
        let builder = self
            .client
            .post(self.build_url("/v1/environments"))
            .json(request);
        self.send_mutation(builder, idempotency_key).await
    }

    pub async fn get_environment(&self, environment_id: &str) -> Result<Environment> {
        let url = self.build_url(&format!("/v1/environments/{}", environment_id));
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn list_environments(&self, tenant_id: Option<&str>) -> Result<Vec<Environment>> {
        let mut builder = self.client.get(self.build_url("/v1/environments"));
        if let Some(tenant_id) = tenant_id {
            builder = builder.query(&[("tenant_id", tenant_id)]);
        }
        builder.send().await?.error_for_status()?.json().await
    }

    pub async fn get_provisioning_operation(
        &self,
        operation_id: &str,
    ) -> Result<ProvisioningOperation> {
        let url = self.build_url(&format!("/v1/provisioning-operations/{}", operation_id));
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn create_job(
        &self,
        request: &CreateJobRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Job> {
        let builder = self.client.post(self.build_url("/v1/jobs")).json(request);
        self.send_mutation(builder, idempotency_key).await
    }

    pub async fn submit_run(
        &self,
        job_id: &str,
        request: &CreateRunRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Run> {
        let url = self.build_url(&format!("/v1/jobs/{}/runs", job_id));
        let builder = self.client.post(url).json(request);
        self.send_mutation(builder, idempotency_key).await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Run> {
        let url = self.build_url(&format!("/v1/runs/{}", run_id));
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn list_runs(
        &self,
        tenant_id: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<Run>> {
        let mut builder = self.client.get(self.build_url("/v1/runs"));
        if let Some(tenant_id) = tenant_id {
            builder = builder.query(&[("tenant_id", tenant_id)]);
        }
        if let Some(state) = state {
            builder = builder.query(&[("state", state)]);
        }
        builder.send().await?.error_for_status()?.json().await
    }

    pub async fn cancel_run(&self, run_id: &str, idempotency_key: Option<&str>) -> Result<Run> {
        let url = self.build_url(&format!("/v1/runs/{}/cancel", run_id));
        let builder = self.client.post(url);
        self.send_mutation(builder, idempotency_key).await
    }

    pub async fn run_logs(&self, run_id: &str, limit: usize) -> Result<LogsResponse> {
        let url = self.build_url(&format!("/v1/runs/{}/logs", run_id));
        self.client
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn usage(
        &self,
        tenant_id: &str,
        from_ts: Option<&str>,
        to_ts: Option<&str>,
    ) -> Result<UsageResponse> {
        let mut builder = self
            .client
            .get(self.build_url("/v1/usage"))
            .query(&[("tenant_id", tenant_id)]);
        if let Some(from_ts) = from_ts {
            builder = builder.query(&[("from_ts", from_ts)]);
        }
        if let Some(to_ts) = to_ts {
            builder = builder.query(&[("to_ts", to_ts)]);
        }
        builder.send().await?.error_for_status()?.json().await
    }

    /// Build a full URL from a path.
    fn build_url(&self, path: &str) -> String {
        self.base_url.trim_end_matches('/').to_owned() + path
    }

    /// Attach the mutation headers and decode the response.
    async fn send_mutation<T>(
        &self,
        builder: reqwest::RequestBuilder,
        idempotency_key: Option<&str>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let key = idempotency_key
            .map(str::to_owned)
            .unwrap_or_else(|| hex_suffix(32));
        builder
            .header(IDEMPOTENCY_KEY_HEADER, key)
            .header(ACTOR_HEADER, self.actor)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

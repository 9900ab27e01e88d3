use ::anyhow::anyhow;
use ::serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;

use crate::error::{Result, SparkPilotError};

use super::{new_id, utc_now, SparkConf};

/// Artifact plus default configuration, scoped to one environment.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub environment_id: String,
    pub name: String,
    pub artifact_uri: String,
    pub artifact_digest: String,
    pub entrypoint: String,
    pub args: Vec<String>,
    pub spark_conf: SparkConf,
    pub retry_max_attempts: u32,
    pub timeout_seconds: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Request body to register a job.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateJobRequest {
    pub environment_id: String,
    pub name: String,
    pub artifact_uri: String,
    pub artifact_digest: String,
    pub entrypoint: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub spark_conf: SparkConf,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_retry_max_attempts() -> u32 {
    1
}

fn default_timeout_seconds() -> u64 {
    7200
}

impl CreateJobRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > 255 {
            return Err(SparkPilotError::validation(anyhow!(
                "Job name must be between 1 and 255 characters."
            )));
        }
        if self.artifact_uri.len() < 3 || self.artifact_uri.len() > 2048 {
            return Err(SparkPilotError::validation(anyhow!(
                "artifact_uri must be between 3 and 2048 characters."
            )));
        }
        if self.artifact_digest.len() < 6 || self.artifact_digest.len() > 255 {
            return Err(SparkPilotError::validation(anyhow!(
                "artifact_digest must be between 6 and 255 characters."
            )));
        }
        if self.entrypoint.is_empty() || self.entrypoint.len() > 1024 {
            return Err(SparkPilotError::validation(anyhow!(
                "entrypoint must be between 1 and 1024 characters."
            )));
        }
        if self.retry_max_attempts < 1 || self.retry_max_attempts > 10 {
            return Err(SparkPilotError::validation(anyhow!(
                "retry_max_attempts must be between 1 and 10."
            )));
        }
        if self.timeout_seconds < 60 || self.timeout_seconds > 172_800 {
            return Err(SparkPilotError::validation(anyhow!(
                "timeout_seconds must be between 60 and 172800."
            )));
        }
        Ok(())
    }
}

impl From<CreateJobRequest> for Job {
    fn from(value: CreateJobRequest) -> Self {
        let now = utc_now();
        Job {
            id: new_id(),
            environment_id: value.environment_id,
            name: value.name,
            artifact_uri: value.artifact_uri,
            artifact_digest: value.artifact_digest,
            entrypoint: value.entrypoint,
            args: value.args,
            spark_conf: value.spark_conf,
            retry_max_attempts: value.retry_max_attempts,
            timeout_seconds: value.timeout_seconds,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use ::serde_json::{from_value, json};

    use super::*;

    fn request() -> CreateJobRequest {
        from_value(json!({
            "environment_id": "env-1",
            "name": "daily-aggregation",
            "artifact_uri": "s3://acme-artifacts/jobs/daily.jar",
            "artifact_digest": "sha256:abc123",
            "entrypoint": "com.acme.jobs.Daily"
        }))
        .unwrap()
    }

    #[test]
    fn defaults_apply() {
        let request = request();
        assert_eq!(request.retry_max_attempts, 1);
        assert_eq!(request.timeout_seconds, 7200);
        assert!(request.args.is_empty());
        assert!(request.spark_conf.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn retry_max_attempts_bounds() {
        let mut request = request();
        request.retry_max_attempts = 11;
        assert!(request.validate().is_err());
        request.retry_max_attempts = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn timeout_bounds() {
        let mut request = request();
        request.timeout_seconds = 59;
        assert!(request.validate().is_err());
        request.timeout_seconds = 172_801;
        assert!(request.validate().is_err());
    }
}

//! Configuration for the SparkPilot server and workers.
//!
//! All knobs are read from `SPARKPILOT_*` environment variables (or the
//! matching command-line flags) into an explicit [Settings] struct that is
//! built once in `main` and passed by reference into the API state, the
//! engine adapters and the background loops.

use clap::{ArgAction, Args, Parser};
use serde::Deserialize;

/// Credentials for the datastore.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Endpoint and optional credentials of the datastore.
///
/// The endpoint follows the SurrealDB `any` engine scheme:
/// `mem://` for an in-process store, `ws://host:port` for a shared one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub uri: String,
    pub credentials: Option<Credentials>,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Datastore endpoint.
    #[arg(long, env = "SPARKPILOT_DATABASE_URL", default_value = "mem://")]
    pub database_url: String,

    #[arg(long, env = "SPARKPILOT_DATABASE_USERNAME")]
    pub database_username: Option<String>,

    #[arg(long, env = "SPARKPILOT_DATABASE_PASSWORD")]
    pub database_password: Option<String>,

    /// When true the engine adapter synthesises identifiers and simulates
    /// run progression instead of calling the cloud provider.
    #[arg(
        long,
        env = "SPARKPILOT_DRY_RUN_MODE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub dry_run_mode: bool,

    #[arg(long, env = "SPARKPILOT_AWS_REGION", default_value = "us-east-1")]
    pub aws_region: String,

    #[arg(
        long,
        env = "SPARKPILOT_LOG_GROUP_PREFIX",
        default_value = "/sparkpilot/runs"
    )]
    pub log_group_prefix: String,

    #[arg(
        long,
        env = "SPARKPILOT_EMR_RELEASE_LABEL",
        default_value = "emr-7.10.0-latest"
    )]
    pub emr_release_label: String,

    #[arg(
        long,
        env = "SPARKPILOT_EMR_EXECUTION_ROLE_ARN",
        default_value = "arn:aws:iam::111111111111:role/SparkPilotEmrExecutionRole"
    )]
    pub emr_execution_role_arn: String,

    /// Maximum number of items a background loop processes per pass.
    #[arg(long, env = "SPARKPILOT_QUEUE_BATCH_SIZE", default_value_t = 20)]
    pub queue_batch_size: usize,

    #[arg(long, env = "SPARKPILOT_POLL_INTERVAL_SECONDS", default_value_t = 15)]
    pub poll_interval_seconds: u64,

    /// Comma-separated list of allowed CORS origins.
    #[arg(
        long,
        env = "SPARKPILOT_CORS_ORIGINS",
        default_value = "http://localhost:3000,http://127.0.0.1:3000"
    )]
    pub cors_origins: String,

    #[arg(long, env = "SPARKPILOT_BIND_ADDR", default_value = "127.0.0.1:8000")]
    pub bind_addr: String,
}

/// The same defaults the command line and environment fall back to.
impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "mem://".to_owned(),
            database_username: None,
            database_password: None,
            dry_run_mode: true,
            aws_region: "us-east-1".to_owned(),
            log_group_prefix: "/sparkpilot/runs".to_owned(),
            emr_release_label: "emr-7.10.0-latest".to_owned(),
            emr_execution_role_arn: "arn:aws:iam::111111111111:role/SparkPilotEmrExecutionRole"
                .to_owned(),
            queue_batch_size: 20,
            poll_interval_seconds: 15,
            cors_origins: "http://localhost:3000,http://127.0.0.1:3000".to_owned(),
            bind_addr: "127.0.0.1:8000".to_owned(),
        }
    }
}

impl Settings {
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn database(&self) -> DatabaseConfig {
        let credentials = match (&self.database_username, &self.database_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        DatabaseConfig {
            uri: self.database_url.clone(),
            credentials,
        }
    }
}

/// Command line arguments for the SparkPilot server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ServerArgs {
    #[command(flatten)]
    pub settings: Settings,
}

impl ServerArgs {
    /// helper function for exporting the `clap::Parser::parse` function
    pub fn parse_args() -> Self {
        ServerArgs::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        ServerArgs::try_parse_from(args).unwrap().settings
    }

    #[test]
    fn default_settings() {
        let settings = parse(&["sparkpilot-server"]);
        assert_eq!(settings.database_url, "mem://");
        assert!(settings.dry_run_mode);
        assert_eq!(settings.aws_region, "us-east-1");
        assert_eq!(settings.log_group_prefix, "/sparkpilot/runs");
        assert_eq!(settings.queue_batch_size, 20);
        assert_eq!(settings.poll_interval_seconds, 15);
    }

    #[test]
    fn dry_run_mode_takes_an_explicit_value() {
        let settings = parse(&["sparkpilot-server", "--dry-run-mode", "false"]);
        assert!(!settings.dry_run_mode);
    }

    #[test]
    fn cors_origin_list_trims_and_drops_empty_entries() {
        let settings = parse(&[
            "sparkpilot-server",
            "--cors-origins",
            " http://localhost:3000 ,, http://ui.sparkpilot.dev ",
        ]);
        assert_eq!(
            settings.cors_origin_list(),
            vec![
                "http://localhost:3000".to_owned(),
                "http://ui.sparkpilot.dev".to_owned()
            ]
        );
    }

    #[test]
    fn credentials_require_both_username_and_password() {
        let settings = parse(&["sparkpilot-server", "--database-username", "root"]);
        assert_eq!(settings.database().credentials, None);

        let settings = parse(&[
            "sparkpilot-server",
            "--database-username",
            "root",
            "--database-password",
            "root",
        ]);
        assert_eq!(
            settings.database().credentials,
            Some(Credentials {
                username: "root".to_owned(),
                password: "root".to_owned()
            })
        );
    }
}

//! Runtime configuration
//!
//! Every option can be given as a flag or through the environment.

use clap::{Parser, ValueEnum};

/// Which document store backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Remote Elasticsearch cluster
    Elasticsearch,
    /// In-process full-text index, not persisted
    Embedded,
}

/// What `PUT /jobs/{job_id}` answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UpdateResponse {
    /// Submitted fields plus the path id
    #[default]
    Echo,
    /// The merged document, re-read after the update
    Stored,
}

/// Gateway configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "job-offers-server")]
#[command(about = "HTTP gateway for job offers stored in a full-text document store")]
#[command(version)]
pub struct Config {
    /// Document store host
    #[arg(long, env = "ELASTIC_HOST", default_value = "elasticsearch")]
    pub host: String,

    /// Document store port
    #[arg(long, env = "ELASTIC_PORT", default_value_t = 9200)]
    pub port: u16,

    /// Document store username (empty disables basic auth)
    #[arg(long, env = "ELASTIC_USERNAME", default_value = "elastic")]
    pub username: String,

    /// Document store password
    #[arg(long, env = "ELASTIC_PASSWORD", default_value = "")]
    pub password: String,

    /// Index holding the job offers
    #[arg(long, env = "JOBS_INDEX", default_value = "offres_emploi4")]
    pub index: String,

    /// Store backend
    #[arg(long, env = "JOBS_BACKEND", value_enum, default_value_t = Backend::Elasticsearch)]
    pub backend: Backend,

    /// Shape of the update response
    #[arg(long, env = "JOBS_UPDATE_RESPONSE", value_enum, default_value_t = UpdateResponse::Echo)]
    pub update_response: UpdateResponse,

    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Log filter directive (e.g. "info", "job_offers_server=debug")
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Base URL of the Elasticsearch REST API
    pub fn elastic_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Basic auth credentials, if a username is configured
    pub fn credentials(&self) -> Option<(String, String)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.clone(), self.password.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "job-offers-server",
            "--host",
            "localhost",
            "--port",
            "9201",
            "--username",
            "",
            "--backend",
            "embedded",
            "--update-response",
            "stored",
        ])
        .unwrap();

        assert_eq!(config.elastic_url(), "http://localhost:9201");
        assert_eq!(config.credentials(), None);
        assert_eq!(config.backend, Backend::Embedded);
        assert_eq!(config.update_response, UpdateResponse::Stored);
    }

    #[test]
    fn test_credentials() {
        let config = Config::try_parse_from([
            "job-offers-server",
            "--username",
            "elastic",
            "--password",
            "secret",
        ])
        .unwrap();

        assert_eq!(
            config.credentials(),
            Some(("elastic".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Config::try_parse_from(["job-offers-server", "--backend", "solr"]).is_err());
    }
}

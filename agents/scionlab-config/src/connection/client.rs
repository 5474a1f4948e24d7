//! Coordinator Client
//!
//! HTTP client for the coordinator's host API: the conditional
//! configuration fetch and the deployed-version acknowledgement.

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::cli::config::CoordinatorConfig;
use crate::cli::config_info::ConfigInfo;
use crate::connection::protocol::{
    config_path, deployed_version_path, endpoint, ConfigBundle, FetchOutcome,
};
use crate::error::AgentError;

pub struct CoordinatorClient {
    client: reqwest::Client,
}

impl CoordinatorClient {
    pub fn new(config: &CoordinatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("scionlab-config/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch the configuration for this host.
    ///
    /// The installed version is sent along when known so the coordinator
    /// can answer 304. Transport failures are not retried.
    pub async fn fetch(&self, info: &ConfigInfo) -> Result<FetchOutcome> {
        let url = endpoint(&info.url, &config_path(&info.host_id));
        debug!(url = %url, version = ?info.version, "Fetching configuration");

        let mut request = self
            .client
            .get(&url)
            .basic_auth(&info.host_id, Some(&info.host_secret));
        if info.version.is_some() {
            request = request.query(&info.version_query());
        }

        let response = request
            .send()
            .await
            .map_err(|source| AgentError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::Unchanged);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(FetchOutcome::Empty);
        }
        if !status.is_success() {
            return Err(AgentError::UnexpectedStatus {
                status: status.as_u16(),
                url: info.url.clone(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| AgentError::Transport { url, source })?;
        info!(bytes = body.len(), "Received configuration bundle");

        Ok(FetchOutcome::Bundle(ConfigBundle::from_bytes(body)))
    }

    /// Tell the coordinator which configuration version is now active
    pub async fn report_deployed_version(&self, info: &ConfigInfo) -> Result<()> {
        let Some(version) = info.version else {
            bail!("Config info has no version to report");
        };

        let url = endpoint(&info.url, &deployed_version_path(&info.host_id));
        let response = self
            .client
            .post(&url)
            .basic_auth(&info.host_id, Some(&info.host_secret))
            .form(&[("version", version.to_string())])
            .send()
            .await
            .map_err(|source| AgentError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::UnexpectedStatus {
                status: status.as_u16(),
                url: info.url.clone(),
            }
            .into());
        }

        debug!(version, "Deployed version acknowledged");
        Ok(())
    }
}

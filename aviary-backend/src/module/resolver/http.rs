///! Thin JSON GET helper shared by every upstream client
use super::error::ResolveError;
use anyhow::Context;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub fn build_client(timeout_secs: u64, user_agent: &str) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url` with `query` and decode the body as `T`.
///
/// Transport errors and non-success statuses map to `Network`, undecodable
/// bodies to `Parse`.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    step: &'static str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ResolveError> {
    tracing::trace!("{}: GET {} {:?}", step, url, query);

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ResolveError::Network {
            step,
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::Network {
            step,
            message: format!("HTTP {}", status),
        });
    }

    let body = response.text().await.map_err(|e| ResolveError::Network {
        step,
        message: format!("failed to read body: {}", e),
    })?;

    serde_json::from_str(&body).map_err(|e| ResolveError::Parse {
        step,
        message: e.to_string(),
    })
}

use anyhow::{Context, Result};
use reqwest::{redirect, Client};
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Subscription client; redirects follow reqwest defaults.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Liveness client: same timeout and User-Agent, but 3xx is returned as-is
/// so a redirecting endpoint is judged by its own status.
pub fn build_probe_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// GET `url` and return the body decoded with the charset the server declares.
/// Transport errors and non-2xx statuses are errors.
pub async fn fetch_subscription(client: &Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()?;
    let text = resp.text().await.context("reading response body")?;
    Ok(text)
}

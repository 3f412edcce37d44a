use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use super::parse::{entry_api, entry_name};

/// Verdict for a single entry. Both variants are terminal for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    Alive(StatusCode),
    Dead(String),
}

/// HEAD the endpoint; any 2xx status is alive.
pub async fn probe(client: &Client, api: &str) -> Result<StatusCode> {
    let url = Url::parse(api).with_context(|| format!("invalid api url {:?}", api))?;
    let resp = client.head(url).send().await?;
    let status = resp.status();
    if !status.is_success() { bail!("status {}", status); }
    Ok(status)
}

pub async fn check_entry(client: &Client, entry: &Value) -> Liveness {
    let Some(api) = entry_api(entry) else {
        return Liveness::Dead("missing api field".to_string());
    };
    match probe(client, api).await {
        Ok(status) => Liveness::Alive(status),
        Err(e) => Liveness::Dead(format!("{:#}", e)),
    }
}

#[derive(Debug, Clone)]
pub struct Removed {
    pub key: String,
    pub name: String,
    pub reason: String,
}

/// Check every entry once and drop the dead ones. The key set is copied
/// before the loop so removals never disturb the walk.
pub async fn prune_dead<F>(client: &Client, sites: &mut Map<String, Value>, mut on_checked: F) -> Vec<Removed>
where
    F: FnMut(&str, &Value, &Liveness),
{
    let keys: Vec<String> = sites.keys().cloned().collect();
    let mut removed = Vec::new();
    for key in keys {
        let Some(entry) = sites.get(&key) else { continue };
        let verdict = check_entry(client, entry).await;
        on_checked(&key, entry, &verdict);
        if let Liveness::Dead(reason) = verdict {
            if let Some(entry) = sites.shift_remove(&key) {
                removed.push(Removed { name: entry_name(&entry).to_string(), key, reason });
            }
        }
    }
    removed
}

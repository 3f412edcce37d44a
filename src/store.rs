use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const SITES_FIELD: &str = "api_site";

/// The on-disk configuration. Root fields other than `api_site` are kept verbatim
/// and `api_site` is written back at the position it was read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigDocument {
    sites: Map<String, Value>,
    rest: Map<String, Value>,
    sites_at: usize,
}

impl ConfigDocument {
    pub fn from_root(root: Map<String, Value>) -> Self {
        let mut doc = ConfigDocument::default();
        let mut seen = false;
        for (k, v) in root {
            if k == SITES_FIELD {
                doc.sites_at = doc.rest.len();
                seen = true;
                if let Value::Object(m) = v { doc.sites = m; }
            } else {
                doc.rest.insert(k, v);
            }
        }
        if !seen { doc.sites_at = doc.rest.len(); }
        doc
    }

    pub fn parse(text: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(root) => Ok(Self::from_root(root)),
            other => bail!("expected a JSON object at the root, found {}", json_kind(&other)),
        }
    }

    pub fn sites(&self) -> &Map<String, Value> { &self.sites }

    pub fn sites_mut(&mut self) -> &mut Map<String, Value> { &mut self.sites }

    pub fn to_root(&self) -> Map<String, Value> {
        let mut root = Map::new();
        for (i, (k, v)) in self.rest.iter().enumerate() {
            if i == self.sites_at { root.insert(SITES_FIELD.to_string(), Value::Object(self.sites.clone())); }
            root.insert(k.clone(), v.clone());
        }
        if self.sites_at >= self.rest.len() {
            root.insert(SITES_FIELD.to_string(), Value::Object(self.sites.clone()));
        }
        root
    }

    /// Two-space indent, non-ASCII left literal.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut s = serde_json::to_string_pretty(&self.to_root())?;
        s.push('\n');
        Ok(s)
    }
}

/// Where `load` found the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin { Existing, Missing }

pub async fn load(path: &Path) -> Result<(ConfigDocument, LoadOrigin)> {
    let text = match fs::read_to_string(path).await {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((ConfigDocument::default(), LoadOrigin::Missing)),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let doc = ConfigDocument::parse(&text)
        .with_context(|| format!("{} is not a valid configuration file", path.display()))?;
    Ok((doc, LoadOrigin::Existing))
}

/// Writes a sibling temp file then renames it over `path`.
pub async fn save(path: &Path, doc: &ConfigDocument) -> Result<()> {
    let body = doc.to_pretty_string()?;
    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, body.as_bytes()).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("writing {}", tmp.display()));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("replacing {}", path.display()));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

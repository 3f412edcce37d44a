use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::store::{self, ConfigDocument};
use crate::sync::{entry_api, entry_name, resolve_config_path};
use crate::telemetry::{self};
use crate::telemetry::ops::ls::Phase as LsPhase;

/// subsync ls: show configured sources
#[derive(Args)]
pub struct LsCmd {
    /// Configuration file (falls back to SUBSYNC_CONFIG, then ./config.json)
    #[arg(long)] pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub key: String,
    pub name: String,
    pub api: Option<String>,
}

#[derive(Serialize)]
pub struct SourceList {
    pub sources: Vec<SourceRow>,
}

pub fn rows(doc: &ConfigDocument) -> Vec<SourceRow> {
    doc.sites()
        .iter()
        .map(|(key, entry)| SourceRow {
            key: key.clone(),
            name: entry_name(entry).to_string(),
            api: entry_api(entry).map(str::to_string),
        })
        .collect()
}

pub async fn run(args: LsCmd) -> Result<()> {
    let log = telemetry::ls();
    let path = resolve_config_path(args.config);
    let _g = log.root_span_kv([("config", path.display().to_string())]).entered();

    let (doc, _) = { let _s = log.span(&LsPhase::Load).entered(); store::load(&path).await? };

    let _s = log.span(&LsPhase::List).entered();
    let sources = rows(&doc);
    log.info(format!("📡 Sources ({}):", sources.len()));
    for r in &sources {
        log.info(format!("[{}] {} {}", r.key, r.name, r.api.as_deref().unwrap_or("<no api>")));
    }
    if telemetry::config::json_mode() {
        log.result(&SourceList { sources })?;
    }
    Ok(())
}

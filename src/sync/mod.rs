use anyhow::{bail, Result};
use clap::Args;
use reqwest::Client;
use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

use crate::output::types::Meta;
use crate::store::{self, ConfigDocument, LoadOrigin};
use crate::telemetry::{self};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::sync::{Phase as SyncPhase, SyncRun};

mod fetch;
mod decode;
mod parse;
mod merge;
mod validate;
pub mod types;

pub use parse::{entry_api, entry_name};
use types::{RemovedEntry, SourceStatus, SourceSummary, SyncReport, SyncTotals};
use validate::Liveness;

/// Subscription lists, highest priority first.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://gist.githubusercontent.com/senshinya/5a5cb900dfa888fd61d767530f00fc48/raw/gistfile1.txt",
    "https://raw.githubusercontent.com/hafrey1/LunaTV-config/main/LunaTV-config.txt",
];

/// subsync sync: fetch, merge, validate, save
#[derive(Args)]
pub struct SyncCmd {
    /// Configuration file (falls back to SUBSYNC_CONFIG, then ./config.json)
    #[arg(long)] pub config: Option<PathBuf>,
    /// Subscription URL; repeat to override the built-in list (first wins on key collisions)
    #[arg(long = "url")] pub urls: Vec<String>,
    #[arg(long, default_value_t = fetch::DEFAULT_TIMEOUT_SECS)] pub timeout_secs: u64,
    /// Keep every entry without probing its api endpoint
    #[arg(long, default_value_t = false)] pub no_validate: bool,
    /// Do everything except writing the configuration file
    #[arg(long, default_value_t = false)] pub dry_run: bool,
}

impl Default for SyncCmd {
    fn default() -> Self {
        SyncCmd { config: None, urls: Vec::new(), timeout_secs: fetch::DEFAULT_TIMEOUT_SECS, no_validate: false, dry_run: false }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub config: PathBuf,
    pub sources: Vec<String>,
    pub timeout: Duration,
    pub validate: bool,
    pub write: bool,
}

pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var("SUBSYNC_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(store::DEFAULT_CONFIG_PATH))
}

impl SyncCmd {
    pub fn into_options(self) -> Result<SyncOptions> {
        let sources = if self.urls.is_empty() {
            DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
        } else {
            for u in &self.urls {
                if Url::parse(u).is_err() { bail!("Invalid URL: {}", u); }
            }
            self.urls
        };
        Ok(SyncOptions {
            config: resolve_config_path(self.config),
            sources,
            timeout: Duration::from_secs(self.timeout_secs),
            validate: !self.no_validate,
            write: !self.dry_run,
        })
    }
}

pub async fn run(args: SyncCmd) -> Result<()> {
    let t0 = Instant::now();
    let opts = args.into_options()?;
    let log = telemetry::sync();
    let _g = log.root_span_kv([
        ("config", opts.config.display().to_string()),
        ("sources", opts.sources.len().to_string()),
        ("timeout_secs", opts.timeout.as_secs().to_string()),
        ("validate", opts.validate.to_string()),
        ("write", opts.write.to_string()),
    ]).entered();

    let client = fetch::build_client(opts.timeout)?;
    let report = sync(&log, &client, &opts).await?;

    if telemetry::config::json_mode() {
        let meta = Meta { duration_ms: Some(t0.elapsed().as_millis()) };
        if opts.write {
            crate::telemetry::emit::print_result("sync", &report, Some(meta))?;
        } else {
            crate::telemetry::emit::print_plan("sync", &report, Some(meta))?;
        }
    }
    Ok(())
}

/// Load, merge each source in order, prune, save. Only load and save errors escape.
pub async fn sync(log: &LogCtx<SyncRun>, client: &Client, opts: &SyncOptions) -> Result<SyncReport> {
    let (mut doc, origin) = {
        let _s = log.span(&SyncPhase::Load).entered();
        match store::load(&opts.config).await {
            Ok(loaded) => loaded,
            Err(e) => {
                log.error(format!("❌ cannot parse {}: {:#}", opts.config.display(), e));
                return Err(e);
            }
        }
    };
    if origin == LoadOrigin::Missing {
        log.info(format!("🆕 {} not found, a new file will be created", opts.config.display()));
    }

    let mut sources = Vec::with_capacity(opts.sources.len());
    for url in &opts.sources {
        let _src = log.span_kv(&SyncPhase::Source, [("url", url.clone())]).entered();
        let summary = merge_source(log, client, url, &mut doc).await;
        log.source_summary(url, summary.offered, summary.added.len());
        sources.push(summary);
    }

    let removed = if opts.validate {
        let _s = log.span(&SyncPhase::Validate).entered();
        let probe_client = fetch::build_probe_client(opts.timeout)?;
        let dead = validate::prune_dead(&probe_client, doc.sites_mut(), |key, entry, verdict| match verdict {
            Liveness::Alive(status) => log.info_kv("✔️ alive", [("key", key.to_string()), ("name", entry_name(entry).to_string()), ("status", status.as_u16().to_string())]),
            Liveness::Dead(reason) => log.warn_kv("🗑️ remove", [("key", key.to_string()), ("name", entry_name(entry).to_string()), ("reason", reason.clone())]),
        }).await;
        dead.into_iter().map(|r| RemovedEntry { key: r.key, name: r.name, reason: r.reason }).collect()
    } else {
        log.info("⏭️ Validation skipped");
        Vec::new()
    };

    let added: usize = sources.iter().map(|s| s.added.len()).sum();
    let totals = SyncTotals { added, removed: removed.len(), kept: doc.sites().len() };
    log.totals(totals.added, totals.removed, totals.kept);

    if opts.write {
        let _s = log.span(&SyncPhase::Save).entered();
        if let Err(e) = store::save(&opts.config, &doc).await {
            log.error(format!("❌ failed to write {}: {:#}", opts.config.display(), e));
            return Err(e);
        }
        log.info(format!("💾 {} updated", opts.config.display()));
    } else {
        log.info(format!("📝 Dry run — {} left untouched", opts.config.display()));
    }

    Ok(SyncReport {
        config: opts.config.display().to_string(),
        created: origin == LoadOrigin::Missing,
        validated: opts.validate,
        totals,
        sources,
        removed,
    })
}

/// Fetch, decode, parse and merge one subscription. Never fails: problems are
/// logged and the source contributes nothing.
async fn merge_source(log: &LogCtx<SyncRun>, client: &Client, url: &str, doc: &mut ConfigDocument) -> SourceSummary {
    let mut summary = SourceSummary { url: url.to_string(), status: SourceStatus::FetchFailed, base58: false, offered: 0, added: Vec::new() };

    let raw = {
        let _s = log.span(&SyncPhase::Fetch).entered();
        match fetch::fetch_subscription(client, url).await {
            Ok(raw) => raw,
            Err(e) => {
                log.warn_kv("⚠️ fetch failed", [("url", url.to_string()), ("error", format!("{:#}", e))]);
                return summary;
            }
        }
    };

    let decoded = {
        let _s = log.span(&SyncPhase::Decode).entered();
        let d = decode::decode_payload(&raw);
        match &d.outcome {
            decode::DecodeOutcome::Base58 => log.info("🔓 Base58 payload decoded"),
            decode::DecodeOutcome::NotBase58(why) => log.warn_kv("⚠️ not Base58, using raw text", [("reason", why.clone())]),
            decode::DecodeOutcome::NotUtf8 => log.warn("⚠️ Base58 decoded to non-UTF-8 bytes, using raw text"),
        }
        d
    };
    summary.base58 = decoded.was_base58();

    let payload = {
        let _s = log.span(&SyncPhase::Parse).entered();
        match parse::parse_payload(&decoded.text) {
            Ok(v) => v,
            Err(e) => {
                log.warn_kv("⚠️ parse failed", [("url", url.to_string()), ("error", format!("{:#}", e))]);
                summary.status = SourceStatus::ParseFailed;
                return summary;
            }
        }
    };

    let Some(incoming) = parse::extract_sites(&payload) else {
        log.warn_kv("⚠️ payload has no api_site", [("url", url.to_string())]);
        summary.status = SourceStatus::NoSites;
        return summary;
    };

    let _s = log.span(&SyncPhase::Merge).entered();
    summary.offered = incoming.len();
    summary.added = merge::merge_new(doc.sites_mut(), incoming);
    for key in &summary.added {
        let entry = &doc.sites()[key.as_str()];
        log.info_kv("➕ added", [("key", key.clone()), ("name", entry_name(entry).to_string()), ("api", entry_api(entry).unwrap_or("").to_string())]);
    }
    summary.status = SourceStatus::Merged;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn opts(config: PathBuf, sources: Vec<String>) -> SyncOptions {
        SyncOptions { config, sources, timeout: Duration::from_secs(5), validate: true, write: true }
    }

    fn read_json(p: &std::path::Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(p).unwrap()).unwrap()
    }

    async fn serve(server: &MockServer, verb: &str, route: &str, resp: ResponseTemplate) {
        Mock::given(method(verb)).and(path(route)).respond_with(resp).mount(server).await;
    }

    #[tokio::test]
    async fn missing_config_and_unreachable_sources_writes_empty_sites() {
        let server = MockServer::start().await;
        serve(&server, "GET", "/sub", ResponseTemplate::new(500)).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("config.json");
        let client = fetch::build_client(Duration::from_secs(5)).unwrap();

        let report = sync(&telemetry::sync(), &client, &opts(cfg.clone(), vec![format!("{}/sub", server.uri())])).await.unwrap();

        assert!(report.created);
        assert_eq!(report.sources[0].status, SourceStatus::FetchFailed);
        assert_eq!(read_json(&cfg), json!({"api_site": {}}));
    }

    #[tokio::test]
    async fn malformed_config_aborts_without_touching_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("config.json");
        std::fs::write(&cfg, "not json").unwrap();
        let client = fetch::build_client(Duration::from_secs(5)).unwrap();

        let res = sync(&telemetry::sync(), &client, &opts(cfg.clone(), vec![])).await;

        assert!(res.is_err());
        assert_eq!(std::fs::read_to_string(&cfg).unwrap(), "not json");
    }

    #[tokio::test]
    async fn merges_in_priority_order_and_prunes_dead_entries() {
        let server = MockServer::start().await;
        let base = server.uri();
        serve(&server, "HEAD", "/live", ResponseTemplate::new(200)).await;
        serve(&server, "HEAD", "/dead", ResponseTemplate::new(404)).await;

        let first = json!({"api_site": {
            "dup": {"name": "First", "api": format!("{base}/live")},
            "gone": {"name": "Gone", "api": format!("{base}/dead")},
        }});
        let second = json!({"api_site": {
            "dup": {"name": "Second", "api": format!("{base}/live")},
            "mine": {"name": "Theirs", "api": format!("{base}/live")},
            "extra": {"name": "额外", "api": format!("{base}/live"), "detail": "kept"},
        }});
        serve(&server, "GET", "/one", ResponseTemplate::new(200).set_body_string(first.to_string())).await;
        let encoded = bs58::encode(second.to_string().as_bytes()).into_string();
        serve(&server, "GET", "/two", ResponseTemplate::new(200).set_body_string(format!("{encoded}\n"))).await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("config.json");
        std::fs::write(&cfg, json!({"cache_time": 7200, "api_site": {
            "mine": {"name": "Mine", "api": format!("{base}/live")},
        }}).to_string()).unwrap();
        let client = fetch::build_client(Duration::from_secs(5)).unwrap();

        let report = sync(&telemetry::sync(), &client, &opts(cfg.clone(), vec![format!("{base}/one"), format!("{base}/two")])).await.unwrap();

        assert!(!report.sources[0].base58);
        assert!(report.sources[1].base58);
        assert_eq!(report.sources[1].added, vec!["extra".to_string()]);
        assert_eq!(report.totals.removed, 1);
        assert_eq!(report.removed[0].key, "gone");

        let saved = read_json(&cfg);
        assert_eq!(saved["cache_time"], 7200);
        let sites = saved["api_site"].as_object().unwrap();
        let keys: Vec<&String> = sites.keys().collect();
        assert_eq!(keys, ["mine", "dup", "extra"]);
        assert_eq!(sites["mine"]["name"], "Mine");
        assert_eq!(sites["dup"]["name"], "First");
        assert_eq!(sites["extra"]["detail"], "kept");
        assert!(std::fs::read_to_string(&cfg).unwrap().contains("额外"));
    }

    #[tokio::test]
    async fn bad_payload_is_skipped_and_next_source_still_merges() {
        let server = MockServer::start().await;
        serve(&server, "GET", "/broken", ResponseTemplate::new(200).set_body_string("{\"api_site\": ")).await;
        serve(&server, "GET", "/nosites", ResponseTemplate::new(200).set_body_string("{\"lives\": []}")).await;
        serve(&server, "GET", "/good", ResponseTemplate::new(200).set_body_string(
            json!({"api_site": {"k": {"name": "K", "api": "https://k.example"}}}).to_string(),
        )).await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("config.json");
        let client = fetch::build_client(Duration::from_secs(5)).unwrap();
        let mut o = opts(cfg.clone(), ["/broken", "/nosites", "/good"].iter().map(|p| format!("{}{}", server.uri(), p)).collect());
        o.validate = false;

        let report = sync(&telemetry::sync(), &client, &o).await.unwrap();

        let statuses: Vec<SourceStatus> = report.sources.iter().map(|s| s.status).collect();
        assert_eq!(statuses, [SourceStatus::ParseFailed, SourceStatus::NoSites, SourceStatus::Merged]);
        assert_eq!(read_json(&cfg)["api_site"]["k"]["name"], "K");
    }

    #[tokio::test]
    async fn dry_run_leaves_disk_untouched() {
        let server = MockServer::start().await;
        serve(&server, "GET", "/good", ResponseTemplate::new(200).set_body_string(
            json!({"api_site": {"k": {"name": "K", "api": "https://k.example"}}}).to_string(),
        )).await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("config.json");
        let client = fetch::build_client(Duration::from_secs(5)).unwrap();
        let mut o = opts(cfg.clone(), vec![format!("{}/good", server.uri())]);
        o.validate = false;
        o.write = false;

        let report = sync(&telemetry::sync(), &client, &o).await.unwrap();

        assert_eq!(report.totals.added, 1);
        assert!(!cfg.exists());
    }

    #[test]
    fn options_default_to_builtin_sources() {
        let o = SyncCmd { config: Some(PathBuf::from("x.json")), ..SyncCmd::default() }.into_options().unwrap();
        assert_eq!(o.sources.len(), DEFAULT_SOURCES.len());
        assert_eq!(o.config, PathBuf::from("x.json"));
        assert_eq!(o.timeout, Duration::from_secs(15));
        assert!(o.validate && o.write);
    }

    #[test]
    fn options_reject_unparseable_urls() {
        let cmd = SyncCmd { urls: vec!["not a url".into()], ..SyncCmd::default() };
        assert!(cmd.into_options().is_err());
    }
}

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus { FetchFailed, ParseFailed, NoSites, Merged }

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub url: String,
    pub status: SourceStatus,
    pub base58: bool,
    pub offered: usize,
    pub added: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedEntry { pub key: String, pub name: String, pub reason: String }

#[derive(Debug, Clone, Serialize)]
pub struct SyncTotals { pub added: usize, pub removed: usize, pub kept: usize }

/// Emitted as the plan (dry run) or result body.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub config: String,
    pub created: bool,
    pub validated: bool,
    pub totals: SyncTotals,
    pub sources: Vec<SourceSummary>,
    pub removed: Vec<RemovedEntry>,
}

use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct SyncRun;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Load, Source, Fetch, Decode, Parse, Merge, Validate, Save }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Load => "load",
        Phase::Source => "source",
        Phase::Fetch => "fetch",
        Phase::Decode => "decode",
        Phase::Parse => "parse",
        Phase::Merge => "merge",
        Phase::Validate => "validate",
        Phase::Save => "save",
    }}
    fn span(&self) -> Span { match self {
        Phase::Load => info_span!("load"),
        Phase::Source => info_span!("source"),
        Phase::Fetch => info_span!("fetch"),
        Phase::Decode => info_span!("decode"),
        Phase::Parse => info_span!("parse"),
        Phase::Merge => info_span!("merge"),
        Phase::Validate => info_span!("validate"),
        Phase::Save => info_span!("save"),
    }}
}

impl OpMarker for SyncRun {
    const NAME: &'static str = "sync";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("sync") }
}

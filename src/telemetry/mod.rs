pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn sync() -> LogCtx<ops::sync::SyncRun> { LogCtx::new(config::logs_are_json()) }
pub fn ls() -> LogCtx<ops::ls::Ls> { LogCtx::new(config::logs_are_json()) }

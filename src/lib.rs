// Kestrel: account watching and alert dispatch.
//
// This is the library root. Each module corresponds to a stage of the
// ingestion-and-dispatch pipeline.

pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod fetch;
pub mod filter;
pub mod notify;
pub mod scheduler;
pub mod status;

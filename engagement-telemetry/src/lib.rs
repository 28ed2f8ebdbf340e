//! One-call structured logging bootstrap shared by every `engagement-*`
//! binary (spec's ambient logging requirement): a console `fmt` layer
//! plus `EnvFilter`, initialized at most once per process.

mod init;

pub use init::{init_telemetry, init_with_config, TelemetryConfig};

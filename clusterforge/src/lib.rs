//! clusterforge - profile-driven cluster provisioning
//!
//! Reads a desired-state profile, derives the prerequisite resource stages it
//! implies, drives each stage through an external declarative-infrastructure
//! engine, and submits the final cluster request. Failures unwind completed
//! stages in reverse dependency order.

pub mod artifacts;
pub mod backend;
pub mod engine;
pub mod orchestrator;
pub mod profile;
pub mod readiness;
pub mod runtime;
pub mod services;
pub mod teardown;
pub mod util;
pub mod versions;

pub use clusterforge_shared::errors::{ForgeError, ForgeResult, TeardownFailure};
pub use orchestrator::{Orchestrator, ProvisionOutcome, StageGraph, StageKind};
pub use profile::{ClusterType, Profile, ProfileCatalog};
pub use readiness::{PollMode, PollState, ReadinessPoller};
pub use runtime::Provisioner;
pub use runtime::options::ProvisionerOptions;

use runtime::layout::FilesystemLayout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize file logging under `{home}/logs`.
///
/// `to_stderr` mirrors the log to stderr and lowers the default level to
/// `debug`; `RUST_LOG` still wins when set.
///
/// Returns the appender guard; dropping it flushes and stops the writer.
/// Safe to call more than once: only the first subscriber registration wins.
pub fn init_logging_for(layout: &FilesystemLayout, to_stderr: bool) -> ForgeResult<WorkerGuard> {
    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| {
        ForgeError::Storage(format!(
            "failed to create logs dir {}: {e}",
            logs_dir.display()
        ))
    })?;

    let file_appender =
        tracing_appender::rolling::daily(logs_dir, runtime::constants::filenames::LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if to_stderr { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    util::register_to_tracing(non_blocking, env_filter, to_stderr);

    Ok(guard)
}

//! clusterforge shared - error taxonomy and constants
//!
//! Used by the orchestrator library, the CLI and the test utilities.

pub mod constants;
pub mod errors;

pub use errors::{ForgeError, ForgeResult, TeardownFailure};

//! Shared fixtures for clusterforge integration tests.
//!
//! - [`FakeEngine`]: in-memory engine that records every call and serves
//!   scripted outputs and failures per manifest.
//! - [`FakeClusterManager`]: in-memory backend with versions and clusters.
//! - [`profiles`]: a catalog covering every stage combination.
//! - [`TestEnv`]: a temp home wired to both fakes.

pub mod backend;
pub mod engine;
pub mod env;
pub mod profiles;

pub use backend::FakeClusterManager;
pub use engine::{EngineCall, EngineOp, FakeEngine};
pub use env::TestEnv;

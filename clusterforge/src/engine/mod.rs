//! Declarative-infrastructure engine abstraction.
//!
//! Every resource stage is realized by an external engine working on a
//! per-resource directory. The engine is a black box: it turns a variables
//! file into cloud resources, reports their attributes, and removes them.

mod terraform;

pub use terraform::TerraformEngine;

use crate::runtime::layout::ResourceDir;
use async_trait::async_trait;
use clusterforge_shared::errors::ForgeResult;
use std::path::{Path, PathBuf};

/// Flattened engine outputs: output name to its `value`.
pub type OutputMap = serde_json::Map<String, serde_json::Value>;

/// Where the engine runs and which module it materializes there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineWorkspace {
    dir: ResourceDir,
    module: PathBuf,
}

impl EngineWorkspace {
    pub fn new(dir: ResourceDir, module: impl Into<PathBuf>) -> Self {
        Self {
            dir,
            module: module.into(),
        }
    }

    /// Working directory; holds the engine state and the variables files.
    pub fn dir(&self) -> &ResourceDir {
        &self.dir
    }

    pub fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Source manifest copied into the working directory on first init.
    pub fn module(&self) -> &Path {
        &self.module
    }
}

/// Engine contract used by every resource service.
///
/// Failures carry the engine's diagnostic text as [`ForgeError::Engine`];
/// services decide which stage error they become.
///
/// [`ForgeError::Engine`]: clusterforge_shared::errors::ForgeError::Engine
#[async_trait]
pub trait InfraEngine: Send + Sync {
    /// One-time setup of the working directory. Safe to repeat.
    async fn init(&self, workspace: &EngineWorkspace) -> ForgeResult<()>;

    /// Converge the resources to the variables in `vars_file`.
    async fn apply(&self, workspace: &EngineWorkspace, vars_file: &Path) -> ForgeResult<String>;

    /// Read the realized outputs.
    async fn output(&self, workspace: &EngineWorkspace) -> ForgeResult<OutputMap>;

    /// Remove everything created from `vars_file`.
    async fn destroy(&self, workspace: &EngineWorkspace, vars_file: &Path)
    -> ForgeResult<String>;
}

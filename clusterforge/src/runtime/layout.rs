use crate::runtime::constants::filenames;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use std::path::{Path, PathBuf};

/// Directory structure constants
pub mod dirs {
    /// Base directory name for clusterforge data
    pub const CLUSTERFORGE_DIR: &str = ".clusterforge";

    /// Subdirectory for per-scope engine working directories
    pub const WORKSPACES_DIR: &str = "workspaces";

    /// Subdirectory for log files
    pub const LOGS_DIR: &str = "logs";

    /// Default subdirectory for persisted artifacts
    pub const OUTPUT_DIR: &str = "output";
}

// ============================================================================
// FILESYSTEM LAYOUT (home directory)
// ============================================================================

/// Layout of the clusterforge home directory.
///
/// ```text
/// ~/.clusterforge/
/// ├── logs/
/// │   └── clusterforge.log.YYYY-MM-DD
/// ├── output/                  # default artifact dir
/// └── workspaces/
///     └── {scope}/             # WorkspaceLayout
///         └── {resource}/      # ResourceDir, one engine state per resource
/// ```
#[derive(Clone, Debug)]
pub struct FilesystemLayout {
    home_dir: PathBuf,
}

impl FilesystemLayout {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join(dirs::LOGS_DIR)
    }

    /// Root of all scoped engine working directories: ~/.clusterforge/workspaces
    pub fn workspaces_dir(&self) -> PathBuf {
        self.home_dir.join(dirs::WORKSPACES_DIR)
    }

    /// Artifact directory used when none is configured: ~/.clusterforge/output
    pub fn default_output_dir(&self) -> PathBuf {
        self.home_dir.join(dirs::OUTPUT_DIR)
    }

    /// Initialize the filesystem structure.
    pub fn prepare(&self) -> ForgeResult<()> {
        std::fs::create_dir_all(&self.home_dir)
            .map_err(|e| ForgeError::Storage(format!("failed to create home: {e}")))?;

        std::fs::create_dir_all(self.workspaces_dir())
            .map_err(|e| ForgeError::Storage(format!("failed to create workspaces dir: {e}")))?;

        std::fs::create_dir_all(self.logs_dir())
            .map_err(|e| ForgeError::Storage(format!("failed to create logs dir: {e}")))?;

        Ok(())
    }

    /// Layout for one state scope (a profile run or its duplicate).
    pub fn workspace(&self, scope: &str) -> WorkspaceLayout {
        WorkspaceLayout::new(self.workspaces_dir().join(scope), scope)
    }
}

// ============================================================================
// WORKSPACE LAYOUT (per-scope directory)
// ============================================================================

/// All resource working directories of a single scope.
///
/// Two orchestrator runs never share a scope, so every resource directory has
/// exactly one writer.
#[derive(Clone, Debug)]
pub struct WorkspaceLayout {
    root: PathBuf,
    scope: String,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>, scope: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            scope: scope.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Working directory for one resource: {root}/{resource}
    pub fn resource_dir(&self, resource: &str) -> ResourceDir {
        ResourceDir::new(self.root.join(resource))
    }

    /// Sibling layout with `suffix` appended to the scope name.
    pub fn with_suffix(&self, suffix: &str) -> WorkspaceLayout {
        let scope = format!("{}{}", self.scope, suffix);
        let root = match self.root.parent() {
            Some(parent) => parent.join(&scope),
            None => PathBuf::from(&scope),
        };
        WorkspaceLayout::new(root, scope)
    }
}

// ============================================================================
// RESOURCE DIR (engine working directory)
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDir {
    path: PathBuf,
}

impl ResourceDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variables file written before each apply.
    pub fn vars_file(&self) -> PathBuf {
        self.path.join(filenames::VARS_FILE)
    }

    /// Recorded variables of the last successful apply.
    pub fn applied_vars_file(&self) -> PathBuf {
        self.path.join(filenames::APPLIED_VARS_FILE)
    }

    pub fn prepare(&self) -> ForgeResult<()> {
        std::fs::create_dir_all(&self.path).map_err(|e| {
            ForgeError::Storage(format!(
                "failed to create working dir {}: {e}",
                self.path.display()
            ))
        })
    }

    /// True when the engine module has already been materialized here.
    pub fn has_module(&self) -> bool {
        std::fs::read_dir(&self.path)
            .map(|entries| {
                entries.flatten().any(|entry| {
                    entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext == "tf")
                })
            })
            .unwrap_or(false)
    }
}

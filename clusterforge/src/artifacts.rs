//! Files persisted to the output directory for later runs and humans.

use crate::runtime::constants::filenames;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use std::path::{Path, PathBuf};

/// Output directory holding `cluster-name`, `cluster-admin-user` and the
/// proxy trust bundle.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prepare(&self) -> ForgeResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ForgeError::Storage(format!(
                "failed to create output dir {}: {e}",
                self.dir.display()
            ))
        })
    }

    pub fn cluster_name_path(&self) -> PathBuf {
        self.dir.join(filenames::CLUSTER_NAME)
    }

    pub fn admin_password_path(&self) -> PathBuf {
        self.dir.join(filenames::CLUSTER_ADMIN_USER)
    }

    /// Path handed to the proxy stage, which writes the CA bundle there.
    pub fn trust_bundle_path(&self) -> PathBuf {
        self.dir.join(filenames::TRUST_BUNDLE)
    }

    pub fn write_cluster_name(&self, name: &str) -> ForgeResult<()> {
        self.write(&self.cluster_name_path(), name)
    }

    /// Persisted cluster name, `None` when no run recorded one.
    pub fn read_cluster_name(&self) -> ForgeResult<Option<String>> {
        let path = self.cluster_name_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let name = raw.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ForgeError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn write_admin_password(&self, password: &str) -> ForgeResult<()> {
        self.write(&self.admin_password_path(), password)
    }

    fn write(&self, path: &Path, contents: &str) -> ForgeResult<()> {
        self.prepare()?;
        std::fs::write(path, contents)
            .map_err(|e| ForgeError::Storage(format!("failed to write {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "wrote artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cluster_name_survives_a_round_trip_through_disk() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("out"));
        assert_eq!(store.read_cluster_name().unwrap(), None);

        store.write_cluster_name("rhcs-sts-ad-x7k").unwrap();
        assert_eq!(
            store.read_cluster_name().unwrap().as_deref(),
            Some("rhcs-sts-ad-x7k")
        );
        assert!(store.cluster_name_path().ends_with("out/cluster-name"));
    }

    #[test]
    fn blank_name_file_counts_as_missing() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        store.write_cluster_name("\n").unwrap();
        assert_eq!(store.read_cluster_name().unwrap(), None);
    }

    #[test]
    fn trust_bundle_lives_in_output_dir() {
        let store = ArtifactStore::new("/tmp/out");
        assert_eq!(store.trust_bundle_path(), PathBuf::from("/tmp/out/ca.cert"));
    }
}

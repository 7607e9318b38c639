use super::{ClusterType, Profile};
use crate::runtime::options::ProfileOverrides;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// On-disk catalog document: `profiles: [{as: <name>, cluster: {...}}]`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    profiles: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "as")]
    name: String,
    #[serde(default)]
    cluster: serde_yaml::Value,
    #[serde(default)]
    need_specific_config: bool,
}

/// All profiles found in a catalog directory, keyed by name.
///
/// Entries are stored as parsed; overrides and validation happen in
/// [`ProfileCatalog::get`], so every returned [`Profile`] is a fresh copy.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileCatalog {
    /// Load every `*.yaml`/`*.yml` file in `path`, or `path` itself when it is a file.
    pub fn load(path: &Path) -> ForgeResult<Self> {
        let files = catalog_files(path)?;
        let mut catalog = Self::default();
        for file in files {
            let raw = std::fs::read_to_string(&file).map_err(|e| {
                ForgeError::Storage(format!("failed to read catalog {}: {e}", file.display()))
            })?;
            catalog.extend_from_str(&raw, &file)?;
        }
        tracing::debug!(
            path = %path.display(),
            count = catalog.profiles.len(),
            "loaded profile catalog"
        );
        Ok(catalog)
    }

    /// Parse a single catalog document.
    pub fn from_yaml(raw: &str) -> ForgeResult<Self> {
        let mut catalog = Self::default();
        catalog.extend_from_str(raw, Path::new("<inline>"))?;
        Ok(catalog)
    }

    fn extend_from_str(&mut self, raw: &str, origin: &Path) -> ForgeResult<()> {
        let doc: CatalogFile = serde_yaml::from_str(raw).map_err(|e| {
            ForgeError::Profile(format!("invalid catalog {}: {e}", origin.display()))
        })?;

        for entry in doc.profiles {
            let mut profile: Profile = match entry.cluster {
                serde_yaml::Value::Null => Profile::default(),
                value => serde_yaml::from_value(value).map_err(|e| {
                    ForgeError::Profile(format!(
                        "invalid profile {} in {}: {e}",
                        entry.name,
                        origin.display()
                    ))
                })?,
            };
            profile.name = entry.name.clone();
            profile.need_specific_config |= entry.need_specific_config;

            if self.profiles.insert(entry.name.clone(), profile).is_some() {
                return Err(ForgeError::Profile(format!(
                    "duplicate profile {} in {}",
                    entry.name,
                    origin.display()
                )));
            }
        }
        Ok(())
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Raw catalog entry, before overrides and defaults.
    pub fn entry(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Load a profile by name: apply overrides, fill defaults, validate.
    pub fn get(&self, name: &str, overrides: &ProfileOverrides) -> ForgeResult<Profile> {
        let mut profile = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("profile {name}")))?;

        profile.apply_overrides(overrides);
        profile.validate()?;

        tracing::info!(profile = %name, cluster_type = %profile.cluster_type, "loaded profile");
        Ok(profile)
    }

    /// Pick a random profile, optionally restricted to some cluster types.
    ///
    /// Entries flagged `need_specific_config` are never picked.
    pub fn random(
        &self,
        cluster_types: &[ClusterType],
        overrides: &ProfileOverrides,
    ) -> ForgeResult<Profile> {
        let candidates: Vec<&str> = self
            .profiles
            .iter()
            .filter(|(_, p)| !p.need_specific_config)
            .filter(|(_, p)| cluster_types.is_empty() || cluster_types.contains(&p.cluster_type))
            .map(|(name, _)| name.as_str())
            .collect();

        let name = candidates.choose(&mut rand::rng()).ok_or_else(|| {
            ForgeError::NotFound("no profile matches the requested cluster types".to_string())
        })?;

        self.get(name, overrides)
    }
}

fn catalog_files(path: &Path) -> ForgeResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|e| {
        ForgeError::Config(format!(
            "cannot read profiles dir {}: {e}",
            path.display()
        ))
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    files.sort();
    Ok(files)
}

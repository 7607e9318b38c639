//! Cluster version resolution.
//!
//! A profile names its version either literally (`4.14.3`) or by pattern:
//!
//! | pattern          | picks                                                       |
//! |------------------|-------------------------------------------------------------|
//! | `""` / `latest`  | highest enabled version of the channel and major version    |
//! | `y-1`            | highest version with an upgrade to the next minor           |
//! | `z-1`            | highest version with a patch upgrade on the same minor      |
//! | `eol`            | nothing; the backend default applies                        |
//!
//! Candidates are narrowed by the backend search string and again locally,
//! then ordered by semver. Releases past their end of life never qualify.

use crate::backend::{ClusterManager, VersionInfo};
use crate::profile::Profile;
use crate::runtime::constants::defaults;
use chrono::{DateTime, SecondsFormat, Utc};
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

static EXACT_VERSION: OnceLock<Regex> = OnceLock::new();

/// True for a literal release such as `4.14.3` or `4.15.0-rc.1`.
pub fn is_exact_version(raw: &str) -> bool {
    EXACT_VERSION
        .get_or_init(|| {
            Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+-*[\s\S]*$").expect("exact version regex is valid")
        })
        .is_match(raw)
}

/// What a profile asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Exact(String),
    Latest,
    /// `y-1`: one minor behind an available upgrade.
    PreviousMinor,
    /// `z-1`: one patch behind an available upgrade.
    PreviousPatch,
    EndOfLife,
}

impl VersionRequest {
    pub fn parse(raw: &str) -> ForgeResult<Self> {
        let raw = raw.trim();
        if is_exact_version(raw) {
            return Ok(Self::Exact(raw.to_string()));
        }
        match raw.to_ascii_lowercase().as_str() {
            "" | "latest" => Ok(Self::Latest),
            "y-1" => Ok(Self::PreviousMinor),
            "z-1" => Ok(Self::PreviousPatch),
            "eol" => Ok(Self::EndOfLife),
            other => Err(ForgeError::InvalidArgument(format!(
                "unsupported version pattern '{other}' (expected a version, latest, y-1, z-1 or eol)"
            ))),
        }
    }

    /// Request expressed by a profile.
    ///
    /// `version` wins over `version_pattern`, except for the `latest` default,
    /// which yields to an explicit pattern.
    pub fn from_profile(profile: &Profile) -> ForgeResult<Self> {
        let version = profile.version.trim();
        let pattern = profile.version_pattern.trim();

        let defers_to_pattern = version == defaults::VERSION && !pattern.is_empty();
        let chosen = if version.is_empty() || defers_to_pattern {
            pattern
        } else {
            version
        };
        Self::parse(chosen)
    }
}

/// Local candidate filter, mirrored into the backend search string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionFilter {
    pub channel_group: String,
    /// Substring of the version id, e.g. `4.14`. Only used by `latest`.
    pub major_version: String,
    pub hcp: bool,
}

impl VersionFilter {
    pub fn for_profile(profile: &Profile) -> Self {
        Self {
            channel_group: profile.channel_group.clone(),
            major_version: profile.major_version.clone(),
            hcp: profile.is_hcp(),
        }
    }

    /// Backend search expression for `request`.
    pub fn search(&self, request: &VersionRequest) -> String {
        self.search_at(request, Utc::now())
    }

    /// Search expression with end-of-life evaluated at `now`.
    pub fn search_at(&self, request: &VersionRequest, now: DateTime<Utc>) -> String {
        let mut terms = vec!["enabled='t'".to_string(), "rosa_enabled='t'".to_string()];
        if !self.channel_group.is_empty() {
            terms.push(format!("channel_group='{}'", self.channel_group));
        }
        if self.hcp {
            terms.push("hosted_control_plane_enabled='t'".to_string());
        }
        match request {
            VersionRequest::Latest if !self.major_version.is_empty() => {
                terms.push(format!("id like '%{}%'", self.major_version));
            }
            VersionRequest::PreviousMinor | VersionRequest::PreviousPatch => {
                terms.push("available_upgrades != ''".to_string());
                terms.push(format!(
                    "(end_of_life_timestamp > '{}' or end_of_life_timestamp is null)",
                    now.to_rfc3339_opts(SecondsFormat::Secs, true)
                ));
            }
            _ => {}
        }
        terms.join(" and ")
    }

    fn admits(&self, version: &VersionInfo, now: DateTime<Utc>) -> bool {
        version.enabled
            && version.rosa_enabled
            && version.end_of_life_timestamp.is_none_or(|eol| eol > now)
            && (self.channel_group.is_empty() || version.channel_group == self.channel_group)
            && (!self.hcp || version.hosted_control_plane_enabled)
    }
}

fn parse_semver(raw: &str) -> Option<Version> {
    Version::parse(raw.trim_start_matches('v')).ok()
}

/// Whether `version` has an upgrade one step ahead in the requested stream.
fn has_upgrade(version: &Version, upgrades: &[String], request: &VersionRequest) -> bool {
    upgrades.iter().filter_map(|u| parse_semver(u)).any(|target| {
        target.major == version.major
            && match request {
                VersionRequest::PreviousMinor => target.minor == version.minor + 1,
                VersionRequest::PreviousPatch => {
                    target.minor == version.minor && target.patch > version.patch
                }
                _ => false,
            }
    })
}

/// Pick the semver-highest candidate that satisfies `request` and `filter`.
///
/// Entries whose `raw_id` is not semver are ignored. Ties on the version
/// fall to the lexically smaller id so the result does not depend on order.
pub fn select<'a>(
    request: &VersionRequest,
    filter: &VersionFilter,
    candidates: &'a [VersionInfo],
) -> Option<&'a VersionInfo> {
    select_at(request, filter, candidates, Utc::now())
}

/// [`select`] with end-of-life evaluated at `now`.
pub fn select_at<'a>(
    request: &VersionRequest,
    filter: &VersionFilter,
    candidates: &'a [VersionInfo],
    now: DateTime<Utc>,
) -> Option<&'a VersionInfo> {
    candidates
        .iter()
        .filter(|v| filter.admits(v, now))
        .filter_map(|v| parse_semver(&v.raw_id).map(|semver| (semver, v)))
        .filter(|(semver, v)| match request {
            VersionRequest::Latest => {
                filter.major_version.is_empty() || v.raw_id.contains(&filter.major_version)
            }
            VersionRequest::PreviousMinor | VersionRequest::PreviousPatch => {
                has_upgrade(semver, &v.available_upgrades, request)
            }
            VersionRequest::Exact(_) | VersionRequest::EndOfLife => false,
        })
        .max_by(|(a, va), (b, vb)| a.cmp(b).then_with(|| vb.id.cmp(&va.id)))
        .map(|(_, v)| v)
}

/// Resolve the version to install for `profile`.
///
/// `Ok(None)` means no version is pinned and the backend default applies.
pub async fn resolve_version(
    manager: &dyn ClusterManager,
    profile: &Profile,
) -> ForgeResult<Option<String>> {
    let request = VersionRequest::from_profile(profile)?;
    match &request {
        VersionRequest::Exact(version) => {
            tracing::info!(
                profile = %profile.name,
                version = %version,
                "using exact cluster version"
            );
            return Ok(Some(version.clone()));
        }
        VersionRequest::EndOfLife => {
            tracing::info!(profile = %profile.name, "no cluster version pinned");
            return Ok(None);
        }
        _ => {}
    }

    let filter = VersionFilter::for_profile(profile);
    let now = Utc::now();
    let search = filter.search_at(&request, now);
    tracing::debug!(search = %search, "listing candidate versions");
    let candidates = manager.list_versions(&search).await?;

    let chosen = select_at(&request, &filter, &candidates, now).ok_or_else(|| {
        ForgeError::NotFound(format!(
            "no version matches {request:?} in channel '{}'",
            filter.channel_group
        ))
    })?;

    tracing::info!(
        profile = %profile.name,
        version = %chosen.raw_id,
        candidates = candidates.len(),
        "resolved cluster version"
    );
    Ok(Some(chosen.raw_id.clone()))
}

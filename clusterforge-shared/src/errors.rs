//! Error types shared by the orchestrator library and the CLI.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result alias used across clusterforge crates.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// One failed destroy call recorded during a teardown sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Stage (or `cluster`) whose destroy failed.
    pub stage: String,
    /// Diagnostic text from the failed call.
    pub message: String,
}

impl TeardownFailure {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n  ")
}

#[derive(Debug, Error)]
pub enum ForgeError {
    /// Invalid or missing process configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Profile could not be loaded or failed validation.
    #[error("profile error: {0}")]
    Profile(String),

    /// Local filesystem failure (working dirs, artifacts, logs).
    #[error("storage error: {0}")]
    Storage(String),

    /// The declarative-infrastructure engine failed outside of a stage apply.
    #[error("engine error: {0}")]
    Engine(String),

    /// The cloud-management backend returned an error.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A stage could not be realized.
    #[error("stage {stage} apply failed: {message}")]
    StageApply { stage: String, message: String },

    /// A stage exists but its attributes could not be read back.
    #[error("stage {stage} output failed: {message}")]
    StageOutput { stage: String, message: String },

    /// The awaited object never reached its terminal state.
    #[error("{resource} did not become ready within {timeout:?}")]
    ReadinessTimeout { resource: String, timeout: Duration },

    /// One or more destroy calls failed during a sweep.
    #[error("teardown failed for {} stage(s):\n  {}", .0.len(), join_failures(.0))]
    Teardown(Vec<TeardownFailure>),

    /// A run failed and its cleanup sweep failed too.
    #[error("{cause}\ncleanup after failure also failed: {teardown}")]
    Compensated {
        cause: Box<ForgeError>,
        teardown: Box<ForgeError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    pub fn stage_apply(stage: impl fmt::Display, message: impl Into<String>) -> Self {
        ForgeError::StageApply {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    pub fn stage_output(stage: impl fmt::Display, message: impl Into<String>) -> Self {
        ForgeError::StageOutput {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }

    /// True for the "did not become ready" condition, which callers may retry later.
    pub fn is_readiness_timeout(&self) -> bool {
        matches!(self, ForgeError::ReadinessTimeout { .. })
    }

    /// Failures recorded by a teardown sweep, if this error carries any.
    pub fn teardown_failures(&self) -> &[TeardownFailure] {
        match self {
            ForgeError::Teardown(failures) => failures,
            ForgeError::Compensated { teardown, .. } => teardown.teardown_failures(),
            _ => &[],
        }
    }
}

impl From<std::io::Error> for ForgeError {
    fn from(err: std::io::Error) -> Self {
        ForgeError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        ForgeError::Internal(format!("json: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_message_lists_every_stage() {
        let err = ForgeError::Teardown(vec![
            TeardownFailure::new("network", "dependency violation"),
            TeardownFailure::new("identity-role", "timeout"),
        ]);
        let text = err.to_string();
        assert!(text.contains("2 stage(s)"));
        assert!(text.contains("network: dependency violation"));
        assert!(text.contains("identity-role: timeout"));
    }

    #[test]
    fn compensated_exposes_inner_failures() {
        let err = ForgeError::Compensated {
            cause: Box::new(ForgeError::stage_apply("egress-proxy", "quota")),
            teardown: Box::new(ForgeError::Teardown(vec![TeardownFailure::new(
                "network", "boom",
            )])),
        };
        assert_eq!(err.teardown_failures().len(), 1);
        assert!(err.to_string().starts_with("stage egress-proxy apply failed: quota"));
    }

    #[test]
    fn readiness_timeout_is_distinguishable() {
        let err = ForgeError::ReadinessTimeout {
            resource: "cluster abc".into(),
            timeout: Duration::from_secs(5),
        };
        assert!(err.is_readiness_timeout());
        assert!(!ForgeError::NotFound("x".into()).is_readiness_timeout());
    }
}

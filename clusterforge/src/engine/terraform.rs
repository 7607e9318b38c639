//! Terraform CLI driver.

use super::{EngineWorkspace, InfraEngine, OutputMap};
use async_trait::async_trait;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Runs the `terraform` binary as a subprocess in each working directory.
#[derive(Clone, Debug)]
pub struct TerraformEngine {
    binary: PathBuf,
}

impl TerraformEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run one terraform command and return its combined output.
    ///
    /// A non-zero exit becomes [`ForgeError::Engine`] with stderr and stdout attached.
    async fn run(&self, dir: &Path, args: &[String]) -> ForgeResult<String> {
        tracing::info!(
            dir = %dir.display(),
            command = %args.join(" "),
            "running terraform"
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(dir)
            .env("TF_IN_AUTOMATION", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| {
            ForgeError::Engine(format!(
                "failed to spawn {} in {}: {e}",
                self.binary.display(),
                dir.display()
            ))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            tracing::error!(
                dir = %dir.display(),
                status = %output.status,
                stderr = %stderr,
                "terraform command failed"
            );
            let diagnostic = match (stderr.is_empty(), stdout.is_empty()) {
                (false, false) => format!("{stderr}\n{stdout}"),
                (false, true) => stderr,
                (true, _) => stdout,
            };
            return Err(ForgeError::Engine(format!(
                "terraform {} failed ({}): {diagnostic}",
                args.first().map(String::as_str).unwrap_or_default(),
                output.status
            )));
        }

        tracing::debug!(dir = %dir.display(), output = %stdout, "terraform command finished");
        Ok(stdout)
    }
}

fn var_file_arg(vars_file: &Path) -> String {
    format!("-var-file={}", vars_file.display())
}

/// Flatten `terraform output -json` into name -> value.
pub(crate) fn parse_output_json(raw: &str) -> ForgeResult<OutputMap> {
    if raw.trim().is_empty() {
        return Ok(OutputMap::new());
    }
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ForgeError::Engine(format!("unparsable terraform output: {e}")))?;

    let serde_json::Value::Object(entries) = parsed else {
        return Err(ForgeError::Engine(
            "terraform output is not a JSON object".to_string(),
        ));
    };

    Ok(entries
        .into_iter()
        .map(|(name, entry)| {
            let value = match entry {
                serde_json::Value::Object(mut fields) => fields
                    .remove("value")
                    .unwrap_or(serde_json::Value::Null),
                other => other,
            };
            (name, value)
        })
        .collect())
}

#[async_trait]
impl InfraEngine for TerraformEngine {
    async fn init(&self, workspace: &EngineWorkspace) -> ForgeResult<()> {
        workspace.dir().prepare()?;

        let mut args = vec!["init".to_string(), "-no-color".to_string()];
        if !workspace.dir().has_module() {
            args.push(format!("-from-module={}", workspace.module().display()));
        }
        self.run(workspace.work_dir(), &args).await.map(|_| ())
    }

    async fn apply(&self, workspace: &EngineWorkspace, vars_file: &Path) -> ForgeResult<String> {
        let args = vec![
            "apply".to_string(),
            "-auto-approve".to_string(),
            "-no-color".to_string(),
            var_file_arg(vars_file),
        ];
        self.run(workspace.work_dir(), &args).await
    }

    async fn output(&self, workspace: &EngineWorkspace) -> ForgeResult<OutputMap> {
        let args = vec!["output".to_string(), "-json".to_string()];
        let raw = self.run(workspace.work_dir(), &args).await?;
        parse_output_json(&raw)
    }

    async fn destroy(
        &self,
        workspace: &EngineWorkspace,
        vars_file: &Path,
    ) -> ForgeResult<String> {
        let args = vec![
            "destroy".to_string(),
            "-auto-approve".to_string(),
            "-no-color".to_string(),
            var_file_arg(vars_file),
        ];
        self.run(workspace.work_dir(), &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::layout::ResourceDir;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn output_values_are_unwrapped() {
        let raw = r#"{
            "vpc_id": {"sensitive": false, "type": "string", "value": "vpc-123"},
            "private_subnets": {"type": ["list", "string"], "value": ["subnet-a", "subnet-b"]}
        }"#;
        let map = parse_output_json(raw).unwrap();
        assert_eq!(map["vpc_id"], json!("vpc-123"));
        assert_eq!(map["private_subnets"], json!(["subnet-a", "subnet-b"]));
    }

    #[test]
    fn empty_output_is_an_empty_map() {
        assert!(parse_output_json("").unwrap().is_empty());
        assert!(parse_output_json("{}").unwrap().is_empty());
    }

    #[test]
    fn non_object_output_is_rejected() {
        assert!(matches!(
            parse_output_json("[1, 2]"),
            Err(ForgeError::Engine(_))
        ));
    }

    #[cfg(unix)]
    fn fake_terraform(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("terraform");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn init_materializes_module_once() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("calls.log");
        let bin = fake_terraform(
            temp.path(),
            &format!("echo \"$@\" >> {}", log.display()),
        );

        let engine = TerraformEngine::new(bin);
        let dir = ResourceDir::new(temp.path().join("ws/vpc"));
        let workspace = EngineWorkspace::new(dir.clone(), "/manifests/aws/vpc");

        engine.init(&workspace).await.unwrap();
        std::fs::write(dir.path().join("main.tf"), "").unwrap();
        engine.init(&workspace).await.unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines[0], "init -no-color -from-module=/manifests/aws/vpc");
        assert_eq!(lines[1], "init -no-color");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_diagnostic() {
        let temp = TempDir::new().unwrap();
        let bin = fake_terraform(temp.path(), "echo 'Error: quota exceeded' >&2\nexit 1");

        let engine = TerraformEngine::new(bin);
        let dir = ResourceDir::new(temp.path().join("ws/kms"));
        dir.prepare().unwrap();
        let workspace = EngineWorkspace::new(dir.clone(), "/manifests/aws/kms");

        let err = engine
            .apply(&workspace, &dir.vars_file())
            .await
            .unwrap_err();
        match err {
            ForgeError::Engine(msg) => assert!(msg.contains("quota exceeded"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_reads_json_from_subprocess() {
        let temp = TempDir::new().unwrap();
        let bin = fake_terraform(
            temp.path(),
            r#"echo '{"arn": {"value": "arn:aws:kms:key/1"}}'"#,
        );

        let engine = TerraformEngine::new(bin);
        let dir = ResourceDir::new(temp.path().join("ws/kms"));
        dir.prepare().unwrap();
        let workspace = EngineWorkspace::new(dir, "/manifests/aws/kms");

        let map = engine.output(&workspace).await.unwrap();
        assert_eq!(map["arn"], json!("arn:aws:kms:key/1"));
    }
}

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use serde_json::json;

use crate::config::{PublishConfig, REPO_PATH_ENV};
use crate::error_codes::CodedError;

const GIT_BINARY: &str = "git";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub repo: PathBuf,
    pub message: String,
    pub remote: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    NothingToCommit,
    Pushed { branch: String },
    DryRun { commands: Vec<Vec<String>> },
}

/// Repository to publish: explicit path, then `REPO_PATH`, then `fallback`.
pub fn resolve_repo_path(explicit: Option<&Path>, fallback: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            env::var_os(REPO_PATH_ENV)
                .map(PathBuf::from)
                .filter(|path| !path.as_os_str().is_empty())
        })
        .unwrap_or_else(|| fallback.to_path_buf())
}

pub fn commit_message(explicit: Option<&str>, config: &PublishConfig) -> String {
    explicit
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .unwrap_or(config.default_message.as_str())
        .to_owned()
}

/// The command lines a publish runs, with the branch left as `HEAD`.
pub fn planned_commands(message: &str, remote: &str) -> Vec<Vec<String>> {
    [
        vec!["add", "."],
        vec!["commit", "-m", message],
        vec!["push", "-u", remote, "HEAD"],
    ]
    .into_iter()
    .map(|args| {
        std::iter::once(GIT_BINARY)
            .chain(args)
            .map(str::to_owned)
            .collect()
    })
    .collect()
}

/// Stages everything, commits when something changed and pushes the
/// current branch.
pub fn publish(request: &PublishRequest) -> Result<PublishOutcome> {
    if request.dry_run {
        return Ok(PublishOutcome::DryRun {
            commands: planned_commands(&request.message, &request.remote),
        });
    }

    ensure_git_available()?;
    if !request.repo.is_dir() {
        return Err(anyhow!(CodedError::input(
            "REPO_NOT_FOUND",
            format!("repository path {} does not exist", request.repo.display()),
        )));
    }

    tracing::info!("staging changes in {}", request.repo.display());
    run_git(&request.repo, &["add", "."])?;

    let status = run_git(&request.repo, &["status", "--porcelain"])?;
    if status.trim().is_empty() {
        tracing::info!("no changes to commit");
        return Ok(PublishOutcome::NothingToCommit);
    }

    tracing::info!("committing changes: {}", request.message);
    run_git(&request.repo, &["commit", "-m", &request.message])?;

    let branch = run_git(&request.repo, &["rev-parse", "--abbrev-ref", "HEAD"])?
        .trim()
        .to_owned();
    tracing::info!("pushing {} to {}", branch, request.remote);
    run_git(&request.repo, &["push", "-u", &request.remote, &branch])?;

    Ok(PublishOutcome::Pushed { branch })
}

fn ensure_git_available() -> Result<()> {
    match Command::new(GIT_BINARY).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(anyhow!(CodedError::external(
            "GIT_NOT_FOUND",
            format!("'git --version' exited with status {:?}", output.status.code()),
        ))),
        Err(error) => Err(anyhow!(CodedError::external(
            "GIT_NOT_FOUND",
            format!("'git' is not installed or not on PATH: {error}"),
        ))),
    }
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new(GIT_BINARY)
        .args(args)
        .current_dir(repo)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        return Err(anyhow!(CodedError::external(
            "GIT_FAILED",
            format!(
                "git {} exited with status {:?}: {}",
                args.join(" "),
                output.status.code(),
                stderr
            ),
        )
        .with_details(json!({
            "args": args,
            "repo": repo.display().to_string(),
        }))));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

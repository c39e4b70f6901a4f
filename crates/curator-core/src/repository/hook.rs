//! Persistence hooks run after a mutation has been saved.

use crate::{CuratorError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Notified with the files a mutation wrote.
///
/// A hook failure never undoes the mutation; the repository logs it.
pub trait PersistHook: Send + Sync {
    fn persisted(&self, paths: &[PathBuf]) -> Result<()>;
}

/// Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl PersistHook for NoopHook {
    fn persisted(&self, _paths: &[PathBuf]) -> Result<()> {
        Ok(())
    }
}

/// Stages saved files in the git repository containing the project.
#[derive(Debug, Clone)]
pub struct GitHook {
    work_dir: PathBuf,
}

impl GitHook {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let command = args.first().copied().unwrap_or_default().to_string();
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| CuratorError::Git {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("git {:?} failed: {}", args, stderr);
            return Err(CuratorError::Git {
                command,
                message: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Name of the checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Commit staged changes and push them.
    ///
    /// Refuses to run on `main` or `master`; curation is expected to happen
    /// on a review branch.
    pub fn publish(&self, curator: &str, count: usize) -> Result<String> {
        let branch = self.current_branch()?;
        if branch == "main" || branch == "master" {
            return Err(CuratorError::Git {
                command: "commit".into(),
                message: format!("refusing to publish directly to {}", branch),
            });
        }

        let message = commit_message(curator, count);
        self.git(&["commit", "-m", &message])?;
        self.git(&["push", "origin", &branch])?;
        info!("Published {} to {}", message, branch);
        Ok(message)
    }
}

impl PersistHook for GitHook {
    fn persisted(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.git(&args).map(|_| ()).inspect_err(|e| {
            warn!("Failed to stage {} file(s): {}", paths.len(), e);
        })
    }
}

/// Commit message for `count` curated mappings.
pub fn commit_message(curator: &str, count: usize) -> String {
    let noun = if count == 1 { "mapping" } else { "mappings" };
    format!("Curated {} {} ({})", count, noun, curator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_message() {
        assert_eq!(commit_message("orcid:1", 1), "Curated 1 mapping (orcid:1)");
        assert_eq!(commit_message("orcid:1", 3), "Curated 3 mappings (orcid:1)");
    }

    #[test]
    fn test_noop_hook() {
        assert!(NoopHook.persisted(&[PathBuf::from("a.tsv")]).is_ok());
    }

    #[test]
    fn test_git_hook_outside_repository_fails() {
        let temp_dir = TempDir::new().unwrap();
        let hook = GitHook::new(temp_dir.path());
        let file = temp_dir.path().join("a.tsv");
        std::fs::write(&file, "x").unwrap();
        // Either git is missing or the directory is not a repository.
        assert!(matches!(
            hook.persisted(&[file]),
            Err(CuratorError::Git { .. })
        ));
    }
}

//! `git` command-line adapter for [`VersionControl`].

use crate::adapters::process::{CommandExecutor, CommandResult, ProcessCommandExecutor};
use crate::domain::model::RepoDescriptor;
use crate::domain::ports::VersionControl;
use crate::utils::error::{LedgerError, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct GitCli<E = ProcessCommandExecutor> {
    executor: E,
}

impl GitCli<ProcessCommandExecutor> {
    pub fn new() -> Self {
        Self {
            executor: ProcessCommandExecutor,
        }
    }
}

impl<E: CommandExecutor> GitCli<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Top level of the working tree containing `dir`, or `None` outside any checkout.
    pub fn toplevel(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let checkout = RepoDescriptor {
            name: dir.display().to_string(),
            path: dir.to_path_buf(),
        };
        let (_, result) = self.execute(&checkout, &["rev-parse", "--show-toplevel"])?;
        let toplevel = result.stdout.trim();
        if !result.success || toplevel.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(toplevel)))
    }

    fn execute(&self, repo: &RepoDescriptor, args: &[&str]) -> Result<(String, CommandResult)> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        let command = format!("git {}", args.join(" "));
        tracing::debug!("{} (in {})", command, repo.path.display());

        let result = self
            .executor
            .execute("git", &args, &repo.path)
            .map_err(|error| LedgerError::GitSpawn {
                command: command.clone(),
                message: format!("{} (in {})", error, repo.path.display()),
            })?;
        Ok((command, result))
    }

    fn run(&self, repo: &RepoDescriptor, args: &[&str]) -> Result<String> {
        let (command, result) = self.execute(repo, args)?;
        if result.success {
            return Ok(result.stdout);
        }

        let stderr = if result.stderr.trim().is_empty() {
            result.stdout
        } else {
            result.stderr
        };
        Err(LedgerError::GitCommand {
            command,
            code: result.code,
            stderr: stderr.trim().to_string(),
        })
    }
}

impl<E: CommandExecutor> VersionControl for GitCli<E> {
    fn fetch(&self, repo: &RepoDescriptor) -> Result<()> {
        tracing::info!("Fetching {}", repo.name);
        self.run(repo, &["fetch", "--tags", "--quiet"])?;
        Ok(())
    }

    fn list_tags(&self, repo: &RepoDescriptor) -> Result<Vec<String>> {
        let stdout = self.run(repo, &["tag", "--sort=creatordate"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn commit_date(&self, repo: &RepoDescriptor, reference: &str) -> Result<Option<NaiveDate>> {
        let object = format!("{}^{{commit}}", reference);
        let (_, verify) = self.execute(repo, &["rev-parse", "--verify", "--quiet", &object])?;
        if !verify.success {
            return Ok(None);
        }
        let sha = verify.stdout.trim().to_string();

        let stdout = self.run(repo, &["log", "-1", "--format=%cs", &sha])?;
        let date = NaiveDate::parse_from_str(stdout.trim(), "%Y-%m-%d").map_err(|e| {
            LedgerError::GitCommand {
                command: format!("git log -1 --format=%cs {}", sha),
                code: None,
                stderr: format!("unexpected date {:?}: {}", stdout.trim(), e),
            }
        })?;
        Ok(Some(date))
    }

    fn shortlog(&self, repo: &RepoDescriptor, lower: &str, upper: &str) -> Result<String> {
        let range = format!("{}..{}", lower, upper);
        self.run(repo, &["shortlog", "-s", "-n", &range])
    }
}

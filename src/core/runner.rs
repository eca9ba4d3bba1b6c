//! Command execution seam for repository operations.
//!
//! `CommandRunner` is the narrow interface between the convergence core and
//! the svn client: four operations, each returning the client's output or an
//! execution error. The production [`SvnRunner`] shells out to the configured
//! binary; tests substitute a recording mock.

use crate::core::config::RunnerConfig;
use crate::core::error::TrunksyncError;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Key under which `svn info` reports the working-copy revision.
pub const REVISION_KEY: &str = "Revision";

/// Flags passed through to checkout/update/diff invocations.
///
/// Pass-through only: values are never checked against what the installed
/// svn client actually accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOpts {
    /// Pin the operation to a revision instead of the repository head.
    pub rev: Option<String>,
    /// Continue past conflicts and obstructing local files.
    pub force: bool,
    /// Skip nested externals definitions.
    pub ignore_externals: bool,
}

impl CheckoutOpts {
    /// Render the argument suffix for these flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(rev) = &self.rev {
            args.push("-r".to_string());
            args.push(rev.clone());
        }
        if self.force {
            args.push("--force".to_string());
        }
        if self.ignore_externals {
            args.push("--ignore-externals".to_string());
        }
        args
    }
}

/// Narrow collaborator interface for working-copy operations.
///
/// `user` is the local account the client runs as; `username` is the
/// repository account used for authentication. Both are pass-through.
pub trait CommandRunner {
    fn checkout(
        &self,
        source: &str,
        target: &Path,
        user: Option<&str>,
        username: Option<&str>,
        opts: &CheckoutOpts,
    ) -> Result<String, TrunksyncError>;

    fn update(
        &self,
        target: &Path,
        user: Option<&str>,
        opts: &CheckoutOpts,
    ) -> Result<String, TrunksyncError>;

    fn diff(&self, target: &Path, opts: &CheckoutOpts) -> Result<String, TrunksyncError>;

    /// Structured `svn info` metadata. Valid working copies carry at minimum
    /// a [`REVISION_KEY`] entry.
    fn info(
        &self,
        target: &Path,
        user: Option<&str>,
        username: Option<&str>,
    ) -> Result<BTreeMap<String, String>, TrunksyncError>;
}

/// Production runner spawning the svn client as a child process.
pub struct SvnRunner {
    config: RunnerConfig,
}

impl SvnRunner {
    pub fn new(config: RunnerConfig) -> Self {
        SvnRunner { config }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.config.non_interactive {
            args.push("--non-interactive".to_string());
        }
        if self.config.trust_server_cert {
            args.push("--trust-server-cert".to_string());
        }
        args
    }

    /// Full program + argument vector. Operations running as another local
    /// user are prefixed with `sudo -n -u <user>`.
    fn command_line(&self, user: Option<&str>, svn_args: Vec<String>) -> Vec<String> {
        let mut line = Vec::new();
        if let Some(user) = user {
            line.extend([
                "sudo".to_string(),
                "-n".to_string(),
                "-u".to_string(),
                user.to_string(),
            ]);
        }
        line.push(self.config.svn_bin.clone());
        line.extend(svn_args);
        line
    }

    fn run(
        &self,
        operation: &str,
        user: Option<&str>,
        svn_args: Vec<String>,
        cwd: &Path,
    ) -> Result<String, TrunksyncError> {
        let line = self.command_line(user, svn_args);
        let (program, args) = line.split_first().ok_or_else(|| {
            TrunksyncError::ValidationError("empty command line".to_string())
        })?;
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| TrunksyncError::ExecutionError {
                operation: operation.to_string(),
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(TrunksyncError::ExecutionError {
                operation: operation.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl CommandRunner for SvnRunner {
    fn checkout(
        &self,
        source: &str,
        target: &Path,
        user: Option<&str>,
        username: Option<&str>,
        opts: &CheckoutOpts,
    ) -> Result<String, TrunksyncError> {
        let mut args = vec!["checkout".to_string()];
        args.extend(self.base_args());
        if let Some(name) = username {
            args.push("--username".to_string());
            args.push(name.to_string());
        }
        args.extend(opts.to_args());
        args.push(source.to_string());
        args.push(target.to_string_lossy().to_string());
        self.run("checkout", user, args, &work_dir(target))
    }

    fn update(
        &self,
        target: &Path,
        user: Option<&str>,
        opts: &CheckoutOpts,
    ) -> Result<String, TrunksyncError> {
        let mut args = vec!["update".to_string()];
        args.extend(self.base_args());
        args.extend(opts.to_args());
        args.push(target.to_string_lossy().to_string());
        self.run("update", user, args, &work_dir(target))
    }

    fn diff(&self, target: &Path, opts: &CheckoutOpts) -> Result<String, TrunksyncError> {
        let mut args = vec!["diff".to_string()];
        args.extend(self.base_args());
        args.extend(opts.to_args());
        args.push(target.to_string_lossy().to_string());
        self.run("diff", None, args, &work_dir(target))
    }

    fn info(
        &self,
        target: &Path,
        user: Option<&str>,
        username: Option<&str>,
    ) -> Result<BTreeMap<String, String>, TrunksyncError> {
        let mut args = vec!["info".to_string()];
        args.extend(self.base_args());
        if let Some(name) = username {
            args.push("--username".to_string());
            args.push(name.to_string());
        }
        args.push(target.to_string_lossy().to_string());
        let out = self.run("info", user, args, &work_dir(target))?;
        Ok(parse_info(&out))
    }
}

/// Directory the client process runs in. The target itself may not exist
/// yet (checkout), so operations run from its parent.
fn work_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Extract `Key: Value` lines from `svn info` output. Field keys are
/// capitalized, which keeps client warning lines (`svn: ...`) out of the map.
pub fn parse_info(output: &str) -> BTreeMap<String, String> {
    let line_re = Regex::new(r"^([A-Z][A-Za-z0-9 ]*?):\s+(.+)$").expect("static regex");
    let mut fields = BTreeMap::new();
    for line in output.lines() {
        if let Some(caps) = line_re.captures(line.trim_end()) {
            fields.insert(caps[1].to_string(), caps[2].trim().to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_INFO: &str = "\
Path: wc
URL: http://example/repo/trunk
Repository Root: http://example/repo
Repository UUID: 2b2f8b6c-2ca2-4b3e-a215-9f93073c6ac8
Revision: 105
Node Kind: directory
Schedule: normal
Last Changed Rev: 103
";

    #[test]
    fn parse_info_extracts_revision_and_url() {
        let fields = parse_info(SAMPLE_INFO);
        assert_eq!(fields.get(REVISION_KEY).map(String::as_str), Some("105"));
        assert_eq!(
            fields.get("URL").map(String::as_str),
            Some("http://example/repo/trunk")
        );
        assert_eq!(
            fields.get("Last Changed Rev").map(String::as_str),
            Some("103")
        );
    }

    #[test]
    fn parse_info_ignores_non_field_lines() {
        let fields = parse_info("svn: warning: something\n\nRevision: 7\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get(REVISION_KEY).map(String::as_str), Some("7"));
    }

    #[test]
    fn opts_render_in_stable_order() {
        let opts = CheckoutOpts {
            rev: Some("42".to_string()),
            force: true,
            ignore_externals: true,
        };
        assert_eq!(
            opts.to_args(),
            vec!["-r", "42", "--force", "--ignore-externals"]
        );
        assert!(CheckoutOpts::default().to_args().is_empty());
    }

    #[test]
    fn command_line_prefixes_sudo_for_run_as_user() {
        let runner = SvnRunner::new(RunnerConfig::default());
        let line = runner.command_line(Some("builder"), vec!["update".to_string()]);
        assert_eq!(line, vec!["sudo", "-n", "-u", "builder", "svn", "update"]);

        let line = runner.command_line(None, vec!["info".to_string()]);
        assert_eq!(line, vec!["svn", "info"]);
    }

    #[test]
    fn base_args_follow_config() {
        let runner = SvnRunner::new(RunnerConfig {
            non_interactive: true,
            trust_server_cert: true,
            ..RunnerConfig::default()
        });
        assert_eq!(
            runner.base_args(),
            vec!["--non-interactive", "--trust-server-cert"]
        );

        let quiet = SvnRunner::new(RunnerConfig {
            non_interactive: false,
            ..RunnerConfig::default()
        });
        assert!(quiet.base_args().is_empty());
    }

    #[test]
    fn work_dir_is_parent_or_current() {
        assert_eq!(work_dir(Path::new("/tmp/wc")), PathBuf::from("/tmp"));
        assert_eq!(work_dir(Path::new("wc")), PathBuf::from("."));
    }
}

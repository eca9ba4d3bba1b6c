//! Convergence decision procedure and result contract.
//!
//! Given a [`DesiredSpec`] and the inspected [`CurrentState`], the engine
//! picks the minimal action to bring the target into compliance, runs it
//! through the [`CommandRunner`] collaborator (or previews it in dry-run
//! mode), and reports a [`ReconcileResult`]. Failure never escapes as an
//! error: every path, including collaborator failures, terminates in a
//! result, so callers can batch many targets.

use crate::core::error::TrunksyncError;
use crate::core::inspect::{CurrentState, StateInspector};
use crate::core::runner::{CheckoutOpts, CommandRunner, REVISION_KEY};
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Desired end state for one working copy. Immutable per reconcile call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredSpec {
    /// Repository URL handed to checkout.
    pub source: String,
    /// Directory that materializes the working copy.
    pub target: PathBuf,
    /// Revision to pin to; repository head when unset.
    pub rev: Option<String>,
    /// Local user the svn client runs as.
    pub user: Option<String>,
    /// Repository account used for authentication.
    pub username: Option<String>,
    /// Continue past conflicts and obstructing local files.
    pub force: bool,
    /// Also materialize nested externals.
    pub externals: bool,
}

/// Convergence action, chosen from the inspected state and the run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// An update ran against a working copy already at the desired state.
    NoOp,
    Create,
    Update,
    PreviewCreate,
    PreviewUpdate,
}

impl Action {
    /// Exhaustive selection over (state exists, dry-run). `NoOp` is never
    /// selected up front; it is the recorded outcome of an `Update` that
    /// moved nothing.
    pub fn select(exists: bool, dry_run: bool) -> Action {
        match (exists, dry_run) {
            (false, true) => Action::PreviewCreate,
            (true, true) => Action::PreviewUpdate,
            (false, false) => Action::Create,
            (true, false) => Action::Update,
        }
    }
}

/// Structured outcome returned to every caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// Source location the reconcile was declared against.
    pub name: String,
    pub success: bool,
    /// Command output, preview diff, or failure detail.
    pub comment: String,
    /// Verified state transitions; empty when nothing changed.
    pub changes: BTreeMap<String, String>,
}

impl ReconcileResult {
    fn new(name: &str) -> Self {
        ReconcileResult {
            name: name.to_string(),
            success: true,
            comment: String::new(),
            changes: BTreeMap::new(),
        }
    }

    /// Failure result. Changes stay empty: no transition was verified.
    pub fn fail(name: &str, comment: impl Into<String>) -> Self {
        ReconcileResult {
            success: false,
            comment: comment.into(),
            ..ReconcileResult::new(name)
        }
    }

    /// Neutral preview result: pending work is not a failure.
    pub fn neutral(name: &str, comment: impl Into<String>) -> Self {
        ReconcileResult {
            comment: comment.into(),
            ..ReconcileResult::new(name)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReconcileEvent {
    ts: String,
    event_id: String,
    action: Action,
    source: String,
    target: String,
    status: String,
    revision: Option<String>,
}

/// Drives a working copy toward its declared spec through a `CommandRunner`.
pub struct ConvergenceEngine<'a, R: CommandRunner> {
    runner: &'a R,
    events_log: Option<PathBuf>,
}

impl<'a, R: CommandRunner> ConvergenceEngine<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        ConvergenceEngine {
            runner,
            events_log: None,
        }
    }

    /// Append one JSONL event per reconcile to `path`. Best effort: an
    /// unwritable log never fails a run.
    pub fn with_events_log(mut self, path: Option<PathBuf>) -> Self {
        self.events_log = path;
        self
    }

    /// Reconcile the target with the spec, or preview what would happen.
    pub fn reconcile(&self, spec: &DesiredSpec, dry_run: bool) -> ReconcileResult {
        let name = spec.source.as_str();

        if spec.target.as_os_str().is_empty() {
            return ReconcileResult::fail(name, "Target option is required");
        }
        if spec.target.exists() && !spec.target.is_dir() {
            return ReconcileResult::fail(
                name,
                format!(
                    "The path \"{}\" exists and is not a directory.",
                    spec.target.display()
                ),
            );
        }

        let state = StateInspector::new(self.runner).inspect(spec);
        let action = Action::select(state.exists(), dry_run);

        let result = match (&state, dry_run) {
            (CurrentState::Absent, true) => ReconcileResult::neutral(
                name,
                format!(
                    "{} doesn't exist and is set to be checked out.",
                    spec.target.display()
                ),
            ),
            (CurrentState::Present { .. }, true) => self.preview_update(spec, name),
            (CurrentState::Absent, false) => self.create(spec, name),
            (CurrentState::Present { revision, .. }, false) => {
                self.update(spec, name, revision)
            }
        };

        let recorded = if action == Action::Update && result.success && result.changes.is_empty()
        {
            Action::NoOp
        } else {
            action
        };
        self.log_event(spec, recorded, &result);

        result
    }

    /// Diff the working copy against the desired revision (head if unset).
    fn preview_update(&self, spec: &DesiredSpec, name: &str) -> ReconcileResult {
        let opts = CheckoutOpts {
            rev: Some(spec.rev.clone().unwrap_or_else(|| "HEAD".to_string())),
            ..CheckoutOpts::default()
        };
        match self.runner.diff(&spec.target, &opts) {
            Ok(out) => ReconcileResult::neutral(name, out),
            Err(e) => ReconcileResult::fail(name, failure_comment(&e)),
        }
    }

    fn create(&self, spec: &DesiredSpec, name: &str) -> ReconcileResult {
        let out = match self.runner.checkout(
            &spec.source,
            &spec.target,
            spec.user.as_deref(),
            spec.username.as_deref(),
            &self.opts(spec),
        ) {
            Ok(out) => out,
            Err(e) => return ReconcileResult::fail(name, failure_comment(&e)),
        };

        let revision = match self.post_action_revision(spec) {
            Ok(revision) => revision,
            Err(e) => return ReconcileResult::fail(name, failure_comment(&e)),
        };

        let mut result = ReconcileResult::new(name);
        result.comment = out;
        result.changes.insert("new".to_string(), spec.source.clone());
        result.changes.insert("revision".to_string(), revision);
        result
    }

    fn update(&self, spec: &DesiredSpec, name: &str, before: &str) -> ReconcileResult {
        let out = match self
            .runner
            .update(&spec.target, spec.user.as_deref(), &self.opts(spec))
        {
            Ok(out) => out,
            Err(e) => return ReconcileResult::fail(name, failure_comment(&e)),
        };

        let after = match self.post_action_revision(spec) {
            Ok(revision) => revision,
            Err(e) => return ReconcileResult::fail(name, failure_comment(&e)),
        };

        let mut result = ReconcileResult::new(name);
        result.comment = out;
        if before != after {
            result
                .changes
                .insert("revision".to_string(), format!("{} => {}", before, after));
        }
        result
    }

    fn opts(&self, spec: &DesiredSpec) -> CheckoutOpts {
        CheckoutOpts {
            rev: spec.rev.clone(),
            force: spec.force,
            ignore_externals: !spec.externals,
        }
    }

    /// Re-query the working copy after a mutation to obtain the verified
    /// revision. A copy that cannot report one is a failed transition.
    fn post_action_revision(&self, spec: &DesiredSpec) -> Result<String, TrunksyncError> {
        let info = self.runner.info(
            &spec.target,
            spec.user.as_deref(),
            spec.username.as_deref(),
        )?;
        info.get(REVISION_KEY).cloned().ok_or_else(|| {
            TrunksyncError::ValidationError(format!(
                "working copy at {} reports no revision after the operation",
                spec.target.display()
            ))
        })
    }

    fn log_event(&self, spec: &DesiredSpec, action: Action, result: &ReconcileResult) {
        let Some(path) = &self.events_log else {
            return;
        };
        let event = ReconcileEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            action,
            source: spec.source.clone(),
            target: spec.target.display().to_string(),
            status: if result.success { "success" } else { "error" }.to_string(),
            revision: result.changes.get("revision").cloned(),
        };
        let _ = append_event(path, &event);
    }
}

/// Execution failures surface their detail verbatim as the result comment;
/// everything else renders through `Display`.
fn failure_comment(err: &TrunksyncError) -> String {
    match err {
        TrunksyncError::ExecutionError { detail, .. } => detail.clone(),
        other => other.to_string(),
    }
}

fn append_event(path: &Path, event: &ReconcileEvent) -> Result<(), TrunksyncError> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(event)
        .map_err(|e| TrunksyncError::ValidationError(e.to_string()))?;
    writeln!(f, "{}", line)?;
    Ok(())
}

//! Working-copy state inspection.

use crate::core::engine::DesiredSpec;
use crate::core::runner::{CommandRunner, REVISION_KEY};
use std::collections::BTreeMap;

/// Outcome of a working-copy inspection.
///
/// Inspection has no error path: a missing target, a directory that is not a
/// working copy, and metadata without a readable revision all inspect as
/// `Absent`. A (possibly forced) checkout is the recovery for each of them,
/// so they take the same branch downstream.
#[derive(Debug, Clone)]
pub enum CurrentState {
    /// No usable working copy at the target.
    Absent,
    /// Valid working copy with its revision and raw `svn info` fields.
    Present {
        revision: String,
        info: BTreeMap<String, String>,
    },
}

impl CurrentState {
    pub fn exists(&self) -> bool {
        matches!(self, CurrentState::Present { .. })
    }

    pub fn revision(&self) -> Option<&str> {
        match self {
            CurrentState::Present { revision, .. } => Some(revision),
            CurrentState::Absent => None,
        }
    }
}

/// Read-only prober for the current state of a working copy.
pub struct StateInspector<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> StateInspector<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        StateInspector { runner }
    }

    /// Query the target. A fresh state is produced on every call; convergence
    /// decisions must never run against cached metadata.
    pub fn inspect(&self, spec: &DesiredSpec) -> CurrentState {
        if !spec.target.exists() {
            return CurrentState::Absent;
        }
        match self
            .runner
            .info(&spec.target, spec.user.as_deref(), spec.username.as_deref())
        {
            Ok(info) => match info.get(REVISION_KEY) {
                Some(revision) => CurrentState::Present {
                    revision: revision.clone(),
                    info,
                },
                None => CurrentState::Absent,
            },
            Err(_) => CurrentState::Absent,
        }
    }
}

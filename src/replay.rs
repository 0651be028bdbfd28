//! Log replay for tm.
//!
//! Rebuilds a `TaskStore` by folding the log left to right through
//! [`TaskStore::apply`]. File order is the only ordering truth.
//!
//! A line fails when it cannot be parsed or when the task state rejects it
//! (duplicate start, stop without start, rename of an unknown task, ...).
//! With [`ReplayPolicy::Abort`] the first failure ends replay with
//! `Error::Replay`. With [`ReplayPolicy::Skip`] the line is left out and
//! reported as a [`ReplayDiagnostic`].

use serde::Serialize;

use crate::config::{RenameConflictPolicy, ReplayPolicy};
use crate::error::{Error, Result};
use crate::storage::LogLine;
use crate::task::TaskStore;

/// A log line that replay left out.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayDiagnostic {
    pub line: usize,
    pub raw: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ReplayDiagnostic>,
}

/// Replay `lines` into a fresh store.
pub fn replay(
    lines: &[LogLine],
    policy: ReplayPolicy,
    rename_policy: RenameConflictPolicy,
) -> Result<(TaskStore, ReplayReport)> {
    let mut store = TaskStore::new(rename_policy);
    let report = replay_into(&mut store, lines, policy)?;
    Ok((store, report))
}

/// Replay `lines` on top of an existing store.
pub fn replay_into(
    store: &mut TaskStore,
    lines: &[LogLine],
    policy: ReplayPolicy,
) -> Result<ReplayReport> {
    let mut report = ReplayReport {
        applied: 0,
        skipped: Vec::new(),
    };

    for line in lines {
        let result = line.parse().and_then(|record| store.apply(&record));
        match result {
            Ok(_) => report.applied += 1,
            Err(err) => match policy {
                ReplayPolicy::Abort => {
                    return Err(Error::Replay {
                        line: line.number,
                        source: Box::new(err),
                    })
                }
                ReplayPolicy::Skip => {
                    tracing::warn!(line = line.number, error = %err, "skipping log record");
                    report.skipped.push(ReplayDiagnostic {
                        line: line.number,
                        raw: line.text.clone(),
                        error: err.to_string(),
                    });
                }
            },
        }
    }

    tracing::debug!(
        applied = report.applied,
        skipped = report.skipped.len(),
        tasks = store.len(),
        "replayed task log"
    );
    Ok(report)
}

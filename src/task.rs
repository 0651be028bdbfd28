//! Task state for tm.
//!
//! `TaskStore` owns every task and is the only place task state changes.
//! Live commands and log replay both go through [`TaskStore::apply`], so a
//! replayed log reproduces exactly what the live commands did.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::RenameConflictPolicy;
use crate::error::{Error, Result};
use crate::record::{LogRecord, Size, TaskCommand};

const DESCRIPTION_SEPARATOR: &str = " ";
const MIN_SIZE_SAMPLES: usize = 2;

/// One tracked unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub description: Option<String>,
    pub size: Option<Size>,
    pub elapsed_minutes: i64,
    pub started_at: Option<NaiveDateTime>,
}

impl Task {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            size: None,
            elapsed_minutes: 0,
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn start(&mut self, at: NaiveDateTime) -> Result<()> {
        if self.is_running() {
            return Err(Error::InvalidTransition(format!(
                "task '{}' is already running",
                self.name
            )));
        }
        self.started_at = Some(at);
        Ok(())
    }

    fn stop(&mut self, at: NaiveDateTime) -> Result<i64> {
        let started_at = self.started_at.ok_or_else(|| {
            Error::InvalidTransition(format!("task '{}' is not running", self.name))
        })?;
        let minutes = (at - started_at).num_minutes();
        if minutes < 0 {
            return Err(Error::InvalidTransition(format!(
                "task '{}' stopped before it was started",
                self.name
            )));
        }
        self.elapsed_minutes += minutes;
        self.started_at = None;
        Ok(minutes)
    }

    fn append_description(&mut self, text: &str) {
        self.description = Some(match self.description.take() {
            Some(existing) => format!("{existing}{DESCRIPTION_SEPARATOR}{text}"),
            None => text.to_string(),
        });
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            size: self.size,
            elapsed_minutes: self.elapsed_minutes,
            running: self.is_running(),
            started_at: self.started_at,
        }
    }
}

/// Snapshot of a task for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    pub elapsed_minutes: i64,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<NaiveDateTime>,
}

/// Elapsed-time statistics for one size bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SizeSummary {
    InsufficientData {
        size: Size,
        count: usize,
    },
    Stats {
        size: Size,
        count: usize,
        min_minutes: i64,
        max_minutes: i64,
        average_minutes: f64,
    },
}

/// What a successfully applied command changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started { created: bool },
    Stopped { minutes: i64, total_minutes: i64 },
    Described { created: bool },
    Sized { created: bool },
    Renamed { replaced: bool },
    Deleted,
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: HashMap<String, Task>,
    rename_policy: RenameConflictPolicy,
}

impl TaskStore {
    pub fn new(rename_policy: RenameConflictPolicy) -> Self {
        Self {
            tasks: HashMap::new(),
            rename_policy,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Apply one record. Nothing changes when this returns an error.
    pub fn apply(&mut self, record: &LogRecord) -> Result<Outcome> {
        let at = record.timestamp;
        match &record.command {
            TaskCommand::Start { name } => self.start(name, at),
            TaskCommand::Stop { name } => self.stop(name, at),
            TaskCommand::Describe { name, text, size } => self.describe(name, text, *size),
            TaskCommand::Size { name, size } => self.set_size(name, *size),
            TaskCommand::Rename { name, new_name } => self.rename(name, new_name),
            TaskCommand::Delete { name } => self.delete(name),
        }
    }

    pub fn start(&mut self, name: &str, at: NaiveDateTime) -> Result<Outcome> {
        let created = !self.tasks.contains_key(name);
        self.entry(name).start(at)?;
        Ok(Outcome::Started { created })
    }

    pub fn stop(&mut self, name: &str, at: NaiveDateTime) -> Result<Outcome> {
        let task = self.tasks.get_mut(name).ok_or_else(|| {
            Error::InvalidTransition(format!("task '{name}' was never started"))
        })?;
        let minutes = task.stop(at)?;
        Ok(Outcome::Stopped {
            minutes,
            total_minutes: task.elapsed_minutes,
        })
    }

    pub fn describe(&mut self, name: &str, text: &str, size: Option<Size>) -> Result<Outcome> {
        let created = !self.tasks.contains_key(name);
        let task = self.entry(name);
        task.append_description(text);
        if size.is_some() {
            task.size = size;
        }
        Ok(Outcome::Described { created })
    }

    pub fn set_size(&mut self, name: &str, size: Size) -> Result<Outcome> {
        let created = !self.tasks.contains_key(name);
        self.entry(name).size = Some(size);
        Ok(Outcome::Sized { created })
    }

    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<Outcome> {
        if !self.tasks.contains_key(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        if name == new_name {
            return Ok(Outcome::Renamed { replaced: false });
        }
        let replaced = self.tasks.contains_key(new_name);
        if replaced && self.rename_policy == RenameConflictPolicy::Reject {
            return Err(Error::Conflict(new_name.to_string()));
        }
        let mut task = self
            .tasks
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        task.name = new_name.to_string();
        self.tasks.insert(new_name.to_string(), task);
        Ok(Outcome::Renamed { replaced })
    }

    pub fn delete(&mut self, name: &str) -> Result<Outcome> {
        self.tasks
            .remove(name)
            .map(|_| Outcome::Deleted)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn summary(&self, name: &str) -> Result<TaskSummary> {
        self.tasks
            .get(name)
            .map(Task::summary)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Snapshots of every task, ordered by name.
    pub fn summary_all(&self) -> Vec<TaskSummary> {
        let mut summaries: Vec<TaskSummary> = self.tasks.values().map(Task::summary).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn summary_by_size(&self, size: Size) -> SizeSummary {
        let elapsed: Vec<i64> = self
            .tasks
            .values()
            .filter(|task| task.size == Some(size))
            .map(|task| task.elapsed_minutes)
            .collect();
        let count = elapsed.len();

        let (Some(min), Some(max)) = (elapsed.iter().min(), elapsed.iter().max()) else {
            return SizeSummary::InsufficientData { size, count };
        };
        if count < MIN_SIZE_SAMPLES {
            return SizeSummary::InsufficientData { size, count };
        }

        let total: i64 = elapsed.iter().sum();
        SizeSummary::Stats {
            size,
            count,
            min_minutes: *min,
            max_minutes: *max,
            average_minutes: total as f64 / count as f64,
        }
    }

    fn entry(&mut self, name: &str) -> &mut Task {
        self.tasks
            .entry(name.to_string())
            .or_insert_with(|| Task::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    fn store() -> TaskStore {
        TaskStore::new(RenameConflictPolicy::Reject)
    }

    #[test]
    fn start_stop_cycles_accumulate() {
        let mut store = store();
        store.start("alpha", at(9, 0)).expect("start");
        store.stop("alpha", at(9, 25)).expect("stop");
        store.start("alpha", at(10, 0)).expect("restart");
        let outcome = store.stop("alpha", at(11, 5)).expect("stop again");

        assert_eq!(
            outcome,
            Outcome::Stopped {
                minutes: 65,
                total_minutes: 90
            }
        );
        let task = store.get("alpha").expect("task");
        assert_eq!(task.elapsed_minutes, 90);
        assert!(!task.is_running());
    }

    #[test]
    fn start_creates_running_task() {
        let mut store = store();
        let outcome = store.start("alpha", at(9, 0)).expect("start");
        assert_eq!(outcome, Outcome::Started { created: true });
        assert_eq!(store.get("alpha").and_then(|t| t.started_at), Some(at(9, 0)));
    }

    #[test]
    fn double_start_is_invalid_transition() {
        let mut store = store();
        store.start("alpha", at(9, 0)).expect("start");
        let err = store.start("alpha", at(9, 30)).expect_err("double start");
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert_eq!(store.get("alpha").and_then(|t| t.started_at), Some(at(9, 0)));
    }

    #[test]
    fn stop_requires_running_task() {
        let mut store = store();
        let err = store.stop("ghost", at(9, 0)).expect_err("unknown");
        assert!(matches!(err, Error::InvalidTransition(_)));

        store.describe("alpha", "notes", None).expect("describe");
        let err = store.stop("alpha", at(9, 0)).expect_err("not running");
        assert!(matches!(err, Error::InvalidTransition(_)));
    }

    #[test]
    fn stop_before_start_is_rejected_without_change() {
        let mut store = store();
        store.start("alpha", at(10, 0)).expect("start");
        let err = store.stop("alpha", at(9, 0)).expect_err("backwards");
        assert!(matches!(err, Error::InvalidTransition(_)));
        let task = store.get("alpha").expect("task");
        assert!(task.is_running());
        assert_eq!(task.elapsed_minutes, 0);
    }

    #[test]
    fn describe_appends_with_space() {
        let mut store = store();
        store.describe("alpha", "x", None).expect("first");
        store.describe("alpha", "y", Some(Size::L)).expect("second");
        store.describe("alpha", "z", None).expect("third");

        let summary = store.summary("alpha").expect("summary");
        assert_eq!(summary.description.as_deref(), Some("x y z"));
        assert_eq!(summary.size, Some(Size::L));
    }

    #[test]
    fn set_size_creates_and_overwrites() {
        let mut store = store();
        assert_eq!(
            store.set_size("alpha", Size::S).expect("size"),
            Outcome::Sized { created: true }
        );
        store.set_size("alpha", Size::XL).expect("resize");
        assert_eq!(store.get("alpha").and_then(|t| t.size), Some(Size::XL));
    }

    #[test]
    fn rename_moves_all_fields() {
        let mut store = store();
        store.start("a", at(9, 0)).expect("start");
        store.stop("a", at(9, 40)).expect("stop");
        store.describe("a", "notes", Some(Size::M)).expect("describe");
        let before = store.summary("a").expect("summary");

        store.rename("a", "b").expect("rename");

        let after = store.summary("b").expect("summary b");
        assert_eq!(after.description, before.description);
        assert_eq!(after.size, before.size);
        assert_eq!(after.elapsed_minutes, before.elapsed_minutes);
        assert_eq!(after.name, "b");
        assert!(matches!(store.summary("a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn rename_unknown_is_not_found() {
        let mut store = store();
        assert!(matches!(store.rename("a", "b"), Err(Error::NotFound(_))));
    }

    #[test]
    fn rename_conflict_follows_policy() {
        let mut rejecting = store();
        rejecting.describe("a", "first", None).expect("a");
        rejecting.describe("b", "second", None).expect("b");
        assert!(matches!(rejecting.rename("a", "b"), Err(Error::Conflict(_))));
        assert_eq!(rejecting.len(), 2);

        let mut overwriting = TaskStore::new(RenameConflictPolicy::Overwrite);
        overwriting.describe("a", "first", None).expect("a");
        overwriting.describe("b", "second", None).expect("b");
        assert_eq!(
            overwriting.rename("a", "b").expect("rename"),
            Outcome::Renamed { replaced: true }
        );
        assert_eq!(overwriting.len(), 1);
        assert_eq!(
            overwriting.summary("b").expect("b").description.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut store = store();
        store.describe("a", "first", None).expect("a");
        assert_eq!(
            store.rename("a", "a").expect("rename"),
            Outcome::Renamed { replaced: false }
        );
        assert!(store.get("a").is_some());
    }

    #[test]
    fn delete_removes_or_reports_not_found() {
        let mut store = store();
        store.describe("a", "first", None).expect("a");
        assert_eq!(store.delete("a").expect("delete"), Outcome::Deleted);
        assert!(store.is_empty());
        assert!(matches!(store.delete("a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn summary_all_is_sorted_by_name() {
        let mut store = store();
        store.describe("charlie", "c", None).expect("c");
        store.describe("alpha", "a", None).expect("a");
        store.describe("bravo", "b", None).expect("b");
        let names: Vec<String> = store.summary_all().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn summary_by_size_needs_two_tasks() {
        let mut store = store();
        assert_eq!(
            store.summary_by_size(Size::M),
            SizeSummary::InsufficientData {
                size: Size::M,
                count: 0
            }
        );

        store.start("a", at(9, 0)).expect("start a");
        store.stop("a", at(9, 10)).expect("stop a");
        store.set_size("a", Size::M).expect("size a");
        assert_eq!(
            store.summary_by_size(Size::M),
            SizeSummary::InsufficientData {
                size: Size::M,
                count: 1
            }
        );

        store.start("b", at(10, 0)).expect("start b");
        store.stop("b", at(10, 30)).expect("stop b");
        store.set_size("b", Size::M).expect("size b");
        store.set_size("c", Size::L).expect("size c");

        assert_eq!(
            store.summary_by_size(Size::M),
            SizeSummary::Stats {
                size: Size::M,
                count: 2,
                min_minutes: 10,
                max_minutes: 30,
                average_minutes: 20.0,
            }
        );
    }
}

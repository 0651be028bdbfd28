//! tm command implementations.
//!
//! Every mutating command follows the same path: build one `TaskCommand`,
//! lock the log, replay it, apply the record, and append the record only
//! after the apply succeeded. A rejected command never reaches the log.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{Config, ReplayPolicy};
use crate::error::Result;
use crate::output::{emit_success, format_minutes, HumanOutput, OutputOptions};
use crate::record::{format_timestamp, LogRecord, Size, TaskCommand};
use crate::replay::{replay, ReplayDiagnostic, ReplayReport};
use crate::storage::TaskLog;
use crate::task::{Outcome, SizeSummary, TaskStore, TaskSummary};

pub struct GlobalOptions {
    pub dir: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

pub struct NameOptions {
    pub name: String,
    pub globals: GlobalOptions,
}

pub struct DescribeOptions {
    pub name: String,
    pub text: String,
    pub size: Option<String>,
    pub globals: GlobalOptions,
}

pub struct SizeOptions {
    pub name: String,
    pub size: String,
    pub globals: GlobalOptions,
}

pub struct RenameOptions {
    pub name: String,
    pub new_name: String,
    pub globals: GlobalOptions,
}

pub struct SummaryOptions {
    pub name: Option<String>,
    pub globals: GlobalOptions,
}

struct TaskContext {
    config: Config,
    log: TaskLog,
}

impl TaskContext {
    fn load(globals: &GlobalOptions) -> Result<Self> {
        let dir = match globals.dir.clone() {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let config = Config::load_from_dir(&dir)?;
        let log_path = match globals.log.as_ref() {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => dir.join(path),
            None => config.log_path(&dir),
        };
        Ok(Self {
            config,
            log: TaskLog::new(log_path),
        })
    }

    fn replay(&self, policy: ReplayPolicy) -> Result<(TaskStore, ReplayReport)> {
        let lines = self.log.read_lines()?;
        replay(&lines, policy, self.config.tasks.on_rename_conflict)
    }

    fn load_store(&self) -> Result<(TaskStore, ReplayReport)> {
        self.replay(self.config.replay.on_error)
    }
}

#[derive(Serialize)]
struct TaskMutationOutput {
    record: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<TaskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_minutes: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    replaced: bool,
}

#[derive(Serialize)]
struct TaskListOutput {
    tasks: Vec<TaskSummary>,
    total: usize,
}

#[derive(Serialize)]
struct DoctorOutput {
    log: String,
    applied: usize,
    tasks: usize,
    skipped: Vec<ReplayDiagnostic>,
}

pub fn run_start(options: NameOptions) -> Result<()> {
    let command = TaskCommand::Start {
        name: options.name.trim().to_string(),
    };
    run_mutation(&options.globals, command)
}

pub fn run_stop(options: NameOptions) -> Result<()> {
    let command = TaskCommand::Stop {
        name: options.name.trim().to_string(),
    };
    run_mutation(&options.globals, command)
}

pub fn run_describe(options: DescribeOptions) -> Result<()> {
    let size = options
        .size
        .as_deref()
        .map(str::parse::<Size>)
        .transpose()?;
    let command = TaskCommand::Describe {
        name: options.name.trim().to_string(),
        text: options.text.trim().to_string(),
        size,
    };
    run_mutation(&options.globals, command)
}

pub fn run_size(options: SizeOptions) -> Result<()> {
    let command = TaskCommand::Size {
        name: options.name.trim().to_string(),
        size: options.size.parse()?,
    };
    run_mutation(&options.globals, command)
}

pub fn run_rename(options: RenameOptions) -> Result<()> {
    let command = TaskCommand::Rename {
        name: options.name.trim().to_string(),
        new_name: options.new_name.trim().to_string(),
    };
    run_mutation(&options.globals, command)
}

pub fn run_delete(options: NameOptions) -> Result<()> {
    let command = TaskCommand::Delete {
        name: options.name.trim().to_string(),
    };
    run_mutation(&options.globals, command)
}

pub fn run_summary(options: SummaryOptions) -> Result<()> {
    let ctx = TaskContext::load(&options.globals)?;
    let (store, report) = ctx.load_store()?;
    let output = options.globals.output();

    let Some(name) = options.name.as_deref().map(str::trim) else {
        let tasks = store.summary_all();
        let mut human = HumanOutput::new("Summary for all tasks");
        human.push_summary("Tasks", tasks.len().to_string());
        for task in &tasks {
            human.push_detail(task_line(task));
        }
        push_replay_warnings(&mut human, &report);
        let data = TaskListOutput {
            total: tasks.len(),
            tasks,
        };
        return emit_success(output, "summary", &data, &human);
    };

    if let Some(size) = Size::bucket(name) {
        let stats = store.summary_by_size(size);
        let mut human = size_summary_output(&stats);
        push_replay_warnings(&mut human, &report);
        return emit_success(output, "summary", &stats, &human);
    }

    let summary = store.summary(name)?;
    let mut human = HumanOutput::new(format!("Summary for task '{}'", summary.name));
    push_task_summary(&mut human, &summary);
    push_replay_warnings(&mut human, &report);
    emit_success(output, "summary", &summary, &human)
}

pub fn run_doctor(globals: GlobalOptions) -> Result<()> {
    let ctx = TaskContext::load(&globals)?;
    let (store, report) = ctx.replay(ReplayPolicy::Skip)?;

    let mut human = HumanOutput::new("Task log doctor report");
    human.push_summary("Log", ctx.log.path().display().to_string());
    human.push_summary("Records applied", report.applied.to_string());
    human.push_summary("Records skipped", report.skipped.len().to_string());
    human.push_summary("Tasks", store.len().to_string());
    for entry in &report.skipped {
        human.push_detail(format!("line {}: {} ({})", entry.line, entry.error, entry.raw));
    }

    let data = DoctorOutput {
        log: ctx.log.path().display().to_string(),
        applied: report.applied,
        tasks: store.len(),
        skipped: report.skipped,
    };
    emit_success(globals.output(), "doctor", &data, &human)
}

fn run_mutation(globals: &GlobalOptions, command: TaskCommand) -> Result<()> {
    command.validate()?;
    let ctx = TaskContext::load(globals)?;

    let lock = ctx.log.lock(ctx.config.log.lock_timeout_ms)?;
    tracing::debug!(lock = %lock.path().display(), "holding log lock");
    let (mut store, report) = ctx.load_store()?;

    let record = LogRecord::now(command);
    let outcome = store.apply(&record)?;
    ctx.log.append(&record)?;
    tracing::debug!(
        command = record.command.keyword(),
        task = record.command.task_name(),
        "command applied"
    );

    let name = match &record.command {
        TaskCommand::Rename { new_name, .. } => new_name.as_str(),
        other => other.task_name(),
    };
    let task = store.summary(name).ok();

    let mut human = mutation_output(&record, &outcome, task.as_ref());
    if let Some(task) = task.as_ref() {
        push_bucket_name_warning(&mut human, &outcome, &task.name);
    }
    push_replay_warnings(&mut human, &report);

    let data = TaskMutationOutput {
        record: record.to_line(),
        task,
        session_minutes: match outcome {
            Outcome::Stopped { minutes, .. } => Some(minutes),
            _ => None,
        },
        replaced: matches!(outcome, Outcome::Renamed { replaced: true }),
    };
    emit_success(globals.output(), record.command.keyword(), &data, &human)
}

fn mutation_output(record: &LogRecord, outcome: &Outcome, task: Option<&TaskSummary>) -> HumanOutput {
    let name = record.command.task_name();
    let mut human = match outcome {
        Outcome::Started { created } => {
            let mut human = HumanOutput::new(format!("Task '{name}' started"));
            human.push_summary("At", format_timestamp(&record.timestamp));
            if *created {
                human.push_summary("New task", "");
            }
            human
        }
        Outcome::Stopped {
            minutes,
            total_minutes,
        } => {
            let mut human = HumanOutput::new(format!("Task '{name}' stopped"));
            human.push_summary("Session", format_minutes(*minutes));
            human.push_summary("Total", format_minutes(*total_minutes));
            human
        }
        Outcome::Described { created } => {
            let mut human = HumanOutput::new(format!("Task '{name}' described"));
            if *created {
                human.push_summary("New task", "");
            }
            human
        }
        Outcome::Sized { created } => {
            let mut human = HumanOutput::new(format!("Task '{name}' sized"));
            if *created {
                human.push_summary("New task", "");
            }
            human
        }
        Outcome::Renamed { replaced } => {
            let mut human = HumanOutput::new(format!("Task '{name}' renamed"));
            if let TaskCommand::Rename { new_name, .. } = &record.command {
                human.push_summary("New name", new_name.clone());
                if *replaced {
                    human.push_warning(format!("replaced existing task '{new_name}'"));
                }
            }
            human
        }
        Outcome::Deleted => HumanOutput::new(format!("Task '{name}' deleted")),
    };

    if matches!(outcome, Outcome::Stopped { .. }) {
        return human;
    }
    if let Some(task) = task {
        if let Some(description) = task.description.as_ref() {
            human.push_summary("Description", description.clone());
        }
        if let Some(size) = task.size {
            human.push_summary("Size", size.to_string());
        }
    }
    human
}

fn size_summary_output(stats: &SizeSummary) -> HumanOutput {
    match stats {
        SizeSummary::InsufficientData { size, count } => {
            let mut human =
                HumanOutput::new(format!("Not enough tasks of size {size} for summary statistics"));
            human.push_summary("Tasks", count.to_string());
            human
        }
        SizeSummary::Stats {
            size,
            count,
            min_minutes,
            max_minutes,
            average_minutes,
        } => {
            let mut human = HumanOutput::new(format!("Summary statistics for tasks of size {size}"));
            human.push_summary("Tasks", count.to_string());
            human.push_summary("Min time spent", format!("{min_minutes} minutes"));
            human.push_summary("Max time spent", format!("{max_minutes} minutes"));
            human.push_summary("Average time spent", format!("{average_minutes:.1} minutes"));
            human
        }
    }
}

fn push_task_summary(human: &mut HumanOutput, task: &TaskSummary) {
    human.push_summary(
        "Description",
        task.description.clone().unwrap_or_else(|| "-".to_string()),
    );
    human.push_summary(
        "Size",
        task.size.map(|size| size.to_string()).unwrap_or_else(|| "-".to_string()),
    );
    human.push_summary(
        "Time logged",
        format!(
            "{} minutes ({})",
            task.elapsed_minutes,
            format_minutes(task.elapsed_minutes)
        ),
    );
    match task.started_at.as_ref() {
        Some(started_at) => human.push_summary("Running since", format_timestamp(started_at)),
        None => human.push_summary("Running", "no"),
    }
}

fn task_line(task: &TaskSummary) -> String {
    let mut line = format!("{}: {} minutes", task.name, task.elapsed_minutes);
    if let Some(size) = task.size {
        line.push_str(&format!(" [{size}]"));
    }
    if task.running {
        line.push_str(" (running)");
    }
    if let Some(description) = task.description.as_ref() {
        line.push_str(&format!(" - {description}"));
    }
    line
}

/// `summary <name>` reads S, M, L and XL as size buckets, so a task with
/// one of those names cannot be summarized on its own.
fn push_bucket_name_warning(human: &mut HumanOutput, outcome: &Outcome, name: &str) {
    let named = matches!(
        outcome,
        Outcome::Started { created: true }
            | Outcome::Described { created: true }
            | Outcome::Sized { created: true }
            | Outcome::Renamed { .. }
    );
    if named && Size::bucket(name).is_some() {
        human.push_warning(format!(
            "task name '{name}' is also a size bucket; `tm summary {name}` shows bucket statistics, use `tm summary` to see the task"
        ));
    }
}

fn push_replay_warnings(human: &mut HumanOutput, report: &ReplayReport) {
    for entry in &report.skipped {
        human.push_warning(format!("skipped log line {}: {}", entry.line, entry.error));
    }
}

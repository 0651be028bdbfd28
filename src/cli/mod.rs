//! Command-line interface for tm
//!
//! This module defines the CLI structure using clap derive macros.
//! Command handlers live in `task`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod task;

/// tm - Task minutes
///
/// Track time spent on named tasks. Every command is appended to a
/// plain-text log that is replayed on each run.
#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Working directory holding `.tm.toml` and the default log
    #[arg(long, global = true, env = "TM_DIR")]
    pub dir: Option<PathBuf>,

    /// Task log path (overrides `log.path` from `.tm.toml`)
    #[arg(long, global = true, env = "TM_LOG")]
    pub log: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start working on a task (creates it if needed)
    Start {
        /// Task name
        name: String,
    },

    /// Stop a running task and log the elapsed time
    Stop {
        /// Task name
        name: String,
    },

    /// Append to a task description and optionally set its size
    Describe {
        /// Task name
        name: String,

        /// Description text (appended to any existing description)
        text: String,

        /// Size bucket: S, M, L or XL
        size: Option<String>,
    },

    /// Set the size bucket of a task
    Size {
        /// Task name
        name: String,

        /// Size bucket: S, M, L or XL
        size: String,
    },

    /// Rename a task, keeping its history
    Rename {
        /// Current task name
        name: String,

        /// New task name
        new_name: String,
    },

    /// Delete a task
    Delete {
        /// Task name
        name: String,
    },

    /// Summarize one task, a size bucket (S, M, L, XL), or all tasks
    Summary {
        /// Task name or size bucket
        name: Option<String>,
    },

    /// Check the task log and report every line replay cannot apply
    Doctor,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = task::GlobalOptions {
            dir: self.dir,
            log: self.log,
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::Start { name } => task::run_start(task::NameOptions { name, globals }),
            Commands::Stop { name } => task::run_stop(task::NameOptions { name, globals }),
            Commands::Describe { name, text, size } => task::run_describe(task::DescribeOptions {
                name,
                text,
                size,
                globals,
            }),
            Commands::Size { name, size } => task::run_size(task::SizeOptions {
                name,
                size,
                globals,
            }),
            Commands::Rename { name, new_name } => task::run_rename(task::RenameOptions {
                name,
                new_name,
                globals,
            }),
            Commands::Delete { name } => task::run_delete(task::NameOptions { name, globals }),
            Commands::Summary { name } => task::run_summary(task::SummaryOptions { name, globals }),
            Commands::Doctor => task::run_doctor(globals),
        }
    }
}

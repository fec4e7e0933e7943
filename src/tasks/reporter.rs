//! Task lifecycle reporting.
//!
//! The executor emits one [`TaskEvent`] per state change. [`ConsoleReporter`]
//! renders them the way the command line shows task progress:
//!
//! ```text
//! > Task :resolveRepositories UP-TO-DATE
//! > Task :resolveRequirements
//! > Task :test FAILED
//! ```

use colored::Colorize;

/// A state change of a task during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// The action is about to run
    Started(String),
    /// The action was skipped because inputs and outputs did not change
    UpToDate(String),
    /// The action completed successfully
    Done(String),
    /// The action, or hashing its inputs, failed
    Failed {
        /// Failing task
        task: String,
        /// Failure reason
        reason: String,
    },
}

impl TaskEvent {
    /// Id of the task the event is about.
    pub fn task(&self) -> &str {
        match self {
            Self::Started(task) | Self::UpToDate(task) | Self::Done(task) => task,
            Self::Failed {
                task, ..
            } => task,
        }
    }
}

/// Receives task events.
pub trait TaskReporter: Send + Sync {
    fn report(&self, event: TaskEvent);
}

/// Prints task progress to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
        }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: TaskEvent) {
        match event {
            TaskEvent::Started(task) if !self.quiet => {
                println!("{} {}", ">".bold(), format!("Task :{task}").bold());
            }
            TaskEvent::UpToDate(task) if !self.quiet => {
                println!("{} Task :{} {}", ">".bold(), task, "UP-TO-DATE".dimmed());
            }
            TaskEvent::Failed {
                task,
                reason,
            } => {
                eprintln!("{} Task :{} {}", ">".bold(), task, "FAILED".red().bold());
                eprintln!("  {reason}");
            }
            _ => {}
        }
    }
}

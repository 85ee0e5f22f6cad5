//! Command-line interface for studytrack
//!
//! The CLI is a terminal presentation layer over the library: every command
//! opens the task store, applies one intent and prints the result.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::StatusFilter;
use crate::storage::{Backend, FileBackend, StorageAdapter};
use crate::task::{Category, Priority, TaskStore};
use crate::theme::{self, Theme, ThemePreference};

mod task;
mod theme_cmd;
mod track;

/// studytrack - study task tracker for language learners
///
/// Create study tasks, filter and prioritize them, time your sessions and
/// review progress statistics.
#[derive(Parser, Debug)]
#[command(name = "studytrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "STUDYTRACK_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to studytrack.toml
    #[arg(long, global = true, env = "STUDYTRACK_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Create a study task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// vocabulary, grammar, listening, speaking, reading, writing
        #[arg(short, long)]
        category: Category,

        /// high, medium, low
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Estimated minutes
        #[arg(long)]
        estimate: Option<u32>,
    },

    /// List tasks (open first, then by priority)
    #[command(alias = "ls")]
    List {
        /// Case-insensitive text in title or description
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<Category>,

        #[arg(short, long)]
        priority: Option<Priority>,

        /// completed or pending
        #[arg(long)]
        status: Option<StatusFilter>,
    },

    /// Show one task
    Show {
        /// Task id or unique id prefix
        id: String,
    },

    /// Edit task fields; omitted fields are kept
    Edit {
        /// Task id or unique id prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        category: Option<Category>,

        #[arg(short, long)]
        priority: Option<Priority>,

        /// Due date (YYYY-MM-DD); an empty value clears it
        #[arg(long)]
        due: Option<String>,

        /// Estimated minutes
        #[arg(long)]
        estimate: Option<u32>,
    },

    /// Toggle completion
    Done {
        /// Task id or unique id prefix
        id: String,
    },

    /// Delete a task
    #[command(alias = "delete")]
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// Log study minutes against a task
    Log {
        /// Task id or unique id prefix
        id: String,

        /// Minutes studied
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },

    /// Show totals, completion rate and breakdowns
    Stats,

    /// Run the study timer in the foreground
    ///
    /// Enter or `r` resumes, `p` pauses, `+N` logs N extra minutes,
    /// `s` (or Ctrl-C, or end of input) stops and records the time.
    Track {
        /// Task id or unique id prefix (defaults to the first task)
        id: Option<String>,
    },

    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommands>,
    },
}

/// Theme subcommands
#[derive(Subcommand, Debug)]
pub enum ThemeCommands {
    /// Print the current theme
    Show,
    /// Switch between dark and light
    Toggle,
    /// Set the theme explicitly
    Set { theme: Theme },
}

/// Resolved configuration and backend shared by all commands.
pub struct Context {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
}

impl Context {
    pub fn load(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let project_dirs = ProjectDirs::from("dev", "studytrack", "studytrack");

        let config = match config_path {
            Some(path) => Config::load(&path)?,
            None => data_dir
                .clone()
                .or_else(|| project_dirs.as_ref().map(|dirs| dirs.config_dir().to_path_buf()))
                .map(|dir| Config::load_from_dir(&dir))
                .unwrap_or_default(),
        };

        let data_dir = data_dir
            .or_else(|| config.storage.dir.clone())
            .or_else(|| project_dirs.map(|dirs| dirs.data_dir().to_path_buf()))
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "cannot determine a data directory; pass --data-dir".to_string(),
                )
            })?;
        tracing::debug!(data_dir = %data_dir.display(), "using data directory");

        let backend =
            FileBackend::new(data_dir).with_lock_timeout(config.storage.lock_timeout_ms);
        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    pub fn open_store(&self) -> TaskStore {
        TaskStore::open(StorageAdapter::new(
            Arc::clone(&self.backend),
            self.config.storage.tasks_key.clone(),
        ))
    }

    pub fn theme(&self) -> ThemePreference {
        ThemePreference::load_or_init(
            Arc::clone(&self.backend),
            self.config.storage.theme_key.clone(),
            theme::detect_ambient(),
            self.config.theme.ambient,
        )
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::load(self.data_dir, self.config)?;
        let json = self.json;
        let quiet = self.quiet;

        match self.command {
            Commands::Add {
                title,
                description,
                category,
                priority,
                due,
                estimate,
            } => task::run_add(
                &ctx,
                task::AddOptions {
                    title,
                    description,
                    category,
                    priority,
                    due,
                    estimate,
                    json,
                    quiet,
                },
            ),
            Commands::List {
                search,
                category,
                priority,
                status,
            } => task::run_list(
                &ctx,
                task::ListOptions {
                    search,
                    category,
                    priority,
                    status,
                    json,
                    quiet,
                },
            ),
            Commands::Show { id } => task::run_show(&ctx, &id, json, quiet),
            Commands::Edit {
                id,
                title,
                description,
                category,
                priority,
                due,
                estimate,
            } => task::run_edit(
                &ctx,
                task::EditOptions {
                    id,
                    title,
                    description,
                    category,
                    priority,
                    due,
                    estimate,
                    json,
                    quiet,
                },
            ),
            Commands::Done { id } => task::run_done(&ctx, &id, json, quiet),
            Commands::Rm { id } => task::run_rm(&ctx, &id, json, quiet),
            Commands::Log { id, minutes } => task::run_log(&ctx, &id, minutes, json, quiet),
            Commands::Stats => task::run_stats(&ctx, json, quiet),
            Commands::Track { id } => track::run_track(&ctx, id, json, quiet),
            Commands::Theme { action } => {
                theme_cmd::run_theme(&ctx, action.unwrap_or(ThemeCommands::Show), json, quiet)
            }
        }
    }
}

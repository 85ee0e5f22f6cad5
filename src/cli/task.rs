//! One-shot task commands: add, list, show, edit, done, rm, log, stats.

use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::filter::{self, FilterCriteria, StatusFilter};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::require_title;
use crate::stats::{self, StatsSummary};
use crate::task::{format_minutes, parse_due_date, Category, NewTask, Priority, Task, TaskPatch};

use super::Context;

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub due: Option<String>,
    pub estimate: Option<u32>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<StatusFilter>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub estimate: Option<u32>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    count: usize,
    total: usize,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletedOutput {
    id: String,
    deleted: bool,
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let title = require_title(&options.title)?;
    let due_date = match options.due.as_deref() {
        Some(raw) => parse_due_date(raw)?,
        None => None,
    };

    let mut store = ctx.open_store();
    let task = store.create(NewTask {
        title,
        description: options.description,
        category: options.category,
        priority: options.priority,
        due_date,
        estimated_time: options.estimate,
    });

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Category", task.category.label());
    human.push_summary("Priority", task.priority.label());
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.to_string());
        if task.is_overdue(Utc::now()) {
            human.push_warning("due date is already in the past");
        }
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "add",
        &task,
        Some(&human),
    )
}

pub fn run_list(ctx: &Context, options: ListOptions) -> Result<()> {
    let store = ctx.open_store();
    let criteria = FilterCriteria {
        search: options.search.unwrap_or_default(),
        category: options.category,
        priority: options.priority,
        status: options.status,
    };
    let visible = filter::filter(store.get_all(), &criteria);

    let now = Utc::now();
    let header = if visible.is_empty() {
        "No tasks".to_string()
    } else {
        format!("Tasks ({} of {})", visible.len(), store.len())
    };
    let mut human = HumanOutput::new(header);
    for task in &visible {
        human.push_detail(format_task_line(task, now));
    }

    let output = TaskListOutput {
        count: visible.len(),
        total: store.len(),
        tasks: visible,
    };
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "list",
        &output,
        Some(&human),
    )
}

pub fn run_show(ctx: &Context, id: &str, json: bool, quiet: bool) -> Result<()> {
    let store = ctx.open_store();
    let id = store.resolve_id(id)?;
    let task = store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let human = task_details("Task", task);
    emit_success(OutputOptions { json, quiet }, "show", task, Some(&human))
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let patch = TaskPatch {
        title: options.title.as_deref().map(require_title).transpose()?,
        description: options.description,
        category: options.category,
        priority: options.priority,
        due_date: options.due.as_deref().map(parse_due_date).transpose()?,
        estimated_time: options.estimate,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass at least one field".to_string(),
        ));
    }

    let mut store = ctx.open_store();
    let id = store.resolve_id(&options.id)?;
    store.update(&id, patch);
    let task = store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let human = task_details("Task updated", task);
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "edit",
        task,
        Some(&human),
    )
}

pub fn run_done(ctx: &Context, id: &str, json: bool, quiet: bool) -> Result<()> {
    let mut store = ctx.open_store();
    let id = store.resolve_id(id)?;
    store.toggle_completion(&id);
    let task = store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new(if task.completed {
        "Task completed"
    } else {
        "Task reopened"
    });
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    if task.completed {
        for review in task.review_dates.iter().flatten() {
            human.push_detail(format!("review on {}", review.date_naive()));
        }
    }

    emit_success(OutputOptions { json, quiet }, "done", task, Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str, json: bool, quiet: bool) -> Result<()> {
    let mut store = ctx.open_store();
    let id = store.resolve_id(id)?;
    store.delete(&id);

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.clone());

    emit_success(
        OutputOptions { json, quiet },
        "rm",
        &DeletedOutput { id, deleted: true },
        Some(&human),
    )
}

pub fn run_log(ctx: &Context, id: &str, minutes: i64, json: bool, quiet: bool) -> Result<()> {
    if minutes <= 0 {
        return Err(Error::InvalidArgument(
            "minutes must be a positive number".to_string(),
        ));
    }

    let mut store = ctx.open_store();
    let id = store.resolve_id(id)?;
    store.add_study_time(&id, minutes);
    let task = store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new("Study time logged");
    human.push_summary("Title", task.title.clone());
    human.push_summary("Added", format!("{minutes} min"));
    human.push_summary("Total", format_minutes(task.study_time));

    emit_success(OutputOptions { json, quiet }, "log", task, Some(&human))
}

pub fn run_stats(ctx: &Context, json: bool, quiet: bool) -> Result<()> {
    let store = ctx.open_store();
    let summary = stats::compute(store.get_all());
    let human = stats_human(&summary);
    emit_success(OutputOptions { json, quiet }, "stats", &summary, Some(&human))
}

fn format_task_line(task: &Task, now: chrono::DateTime<Utc>) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!(
        "{mark} {}  {:<6}  {:<10}  {}",
        task.id,
        task.priority.label(),
        task.category.label(),
        task.title
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {due}"));
        if task.is_overdue(now) {
            line.push_str(" (overdue)");
        }
    }
    if task.study_time > 0 {
        line.push_str(&format!("  {}", format_minutes(task.study_time)));
    }
    line
}

fn task_details(header: &str, task: &Task) -> HumanOutput {
    let now = Utc::now();
    let mut human = HumanOutput::new(header);
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    if !task.description.is_empty() {
        human.push_summary("Description", task.description.clone());
    }
    human.push_summary("Category", task.category.label());
    human.push_summary("Priority", task.priority.label());
    human.push_summary(
        "Status",
        if task.completed { "completed" } else { "pending" },
    );
    if let Some(due) = task.due_date {
        let suffix = if task.is_overdue(now) { " (overdue)" } else { "" };
        human.push_summary("Due", format!("{due}{suffix}"));
    }
    if task.estimated_time > 0 {
        human.push_summary("Estimate", format_minutes(task.estimated_time));
    }
    human.push_summary("Studied", format_minutes(task.study_time));
    human.push_summary("Created", task.created_at.to_rfc3339());
    if let Some(completed_at) = task.completed_at {
        human.push_summary("Completed", completed_at.to_rfc3339());
    }
    for review in task.review_dates.iter().flatten() {
        human.push_detail(format!("review on {}", review.date_naive()));
    }
    human
}

fn stats_human(summary: &StatsSummary) -> HumanOutput {
    let mut human = HumanOutput::new("Study statistics");
    human.push_summary("Total", summary.total.to_string());
    human.push_summary("Completed", summary.completed.to_string());
    human.push_summary("Pending", summary.pending.to_string());
    human.push_summary("Overdue", summary.overdue.to_string());
    human.push_summary("Completion", format!("{}%", summary.completion_rate));
    human.push_summary(
        "Study time",
        format!("{} min", summary.total_study_minutes),
    );
    for (category, count) in &summary.by_category {
        human.push_detail(format!("{:<10} {count}", category.label()));
    }
    for (priority, count) in &summary.by_priority {
        human.push_detail(format!("{:<10} {count}", format!("{} priority", priority.label())));
    }
    human
}

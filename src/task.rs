//! Study tasks and the task store.
//!
//! The store owns the full task list for a session. Every mutation persists
//! a complete snapshot through the [`StorageAdapter`] and then notifies
//! subscribers that the list changed. Unknown ids are silent no-ops.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ulid::{Generator, Ulid};

use crate::error::{Error, Result};
use crate::storage::StorageAdapter;

/// Days after completion at which review reminders are scheduled.
pub const REVIEW_OFFSETS_DAYS: [i64; 4] = [1, 3, 7, 30];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vocabulary,
    Grammar,
    Listening,
    Speaking,
    Reading,
    Writing,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Vocabulary,
        Category::Grammar,
        Category::Listening,
        Category::Speaking,
        Category::Reading,
        Category::Writing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Vocabulary => "vocabulary",
            Category::Grammar => "grammar",
            Category::Listening => "listening",
            Category::Speaking => "speaking",
            Category::Reading => "reading",
            Category::Writing => "writing",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Vocabulary => "Vocabulary",
            Category::Grammar => "Grammar",
            Category::Listening => "Listening",
            Category::Speaking => "Speaking",
            Category::Reading => "Reading",
            Category::Writing => "Writing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown category '{trimmed}' (expected vocabulary|grammar|listening|speaking|reading|writing)"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort weight; higher sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown priority '{trimmed}' (expected high|medium|low)"
                ))
            })
    }
}

/// A single persisted study task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "deserialize_due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_minutes")]
    pub estimated_time: u32,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_minutes")]
    pub study_time: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_dates: Option<Vec<DateTime<Utc>>>,
}

impl Task {
    /// Still open and past the start (00:00 UTC) of its due day.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.completed && due.and_time(NaiveTime::MIN).and_utc() < now,
            None => false,
        }
    }
}

/// Accepts `"2025-01-31"`, a full RFC 3339 timestamp, `""` or `null`.
fn deserialize_due_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_due_date(&raw).map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinutes {
    Whole(i64),
    Fraction(f64),
    Text(String),
}

/// Minute counts written by older clients may be negative, fractional,
/// numeric strings or `null`. Anything unusable reads as 0.
fn deserialize_minutes<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawMinutes> = Option::deserialize(deserializer)?;
    let whole = match raw {
        Some(RawMinutes::Whole(value)) => value,
        Some(RawMinutes::Fraction(value)) if value.is_finite() => value.trunc() as i64,
        Some(RawMinutes::Text(text)) => text.trim().parse().unwrap_or(0),
        Some(RawMinutes::Fraction(_)) | None => 0,
    };
    Ok(u32::try_from(whole.max(0)).unwrap_or(u32::MAX))
}

/// Parse a user or persisted due date; blank means "no deadline".
pub fn parse_due_date(raw: &str) -> Result<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|stamp| Some(stamp.with_timezone(&Utc).date_naive()))
        .map_err(|_| Error::InvalidArgument(format!("invalid due date '{trimmed}' (expected YYYY-MM-DD)")))
}

/// Render accumulated study minutes for display.
pub fn format_minutes(minutes: u32) -> String {
    format!("{minutes} min")
}

/// Input for [`TaskStore::create`]; optional fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_time: Option<u32>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: Category, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: None,
            category,
            priority,
            due_date: None,
            estimated_time: None,
        }
    }
}

/// Shallow update: `Some` fields overwrite, `None` fields are preserved.
///
/// `due_date` is doubly optional so a patch can clear the deadline.
/// Completion state and study time are not patchable; they only change
/// through [`TaskStore::toggle_completion`] and [`TaskStore::add_study_time`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub estimated_time: Option<u32>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(estimated_time) = self.estimated_time {
            task.estimated_time = estimated_time;
        }
    }
}

type Subscriber = Box<dyn FnMut(&[Task]) + Send>;

/// Owner of the session's task list.
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: StorageAdapter,
    ids: Generator,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("storage", &self.storage)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl TaskStore {
    /// Load the persisted list (empty on missing or corrupt data).
    pub fn open(storage: StorageAdapter) -> Self {
        let tasks = storage.load();
        tracing::debug!(count = tasks.len(), "task store opened");
        Self {
            tasks,
            storage,
            ids: Generator::new(),
            subscribers: Vec::new(),
        }
    }

    /// Register a "list changed" callback, called after every persisted mutation.
    pub fn subscribe(&mut self, callback: impl FnMut(&[Task]) + Send + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    pub fn get_all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Resolve a full id or a unique, case-insensitive id prefix.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        if let Some(task) = self.get(trimmed) {
            return Ok(task.id.clone());
        }

        let needle = trimmed.to_lowercase();
        let exact: Vec<&str> = self
            .tasks
            .iter()
            .filter(|task| task.id.eq_ignore_ascii_case(trimmed))
            .map(|task| task.id.as_str())
            .collect();
        let mut matches = if exact.is_empty() {
            self.tasks
                .iter()
                .filter(|task| task.id.to_lowercase().starts_with(&needle))
                .map(|task| task.id.as_str())
                .collect()
        } else {
            exact
        };
        match matches.len() {
            0 => Err(Error::TaskNotFound(trimmed.to_string())),
            1 => Ok(matches.remove(0).to_string()),
            _ => {
                matches.sort_unstable();
                Err(Error::InvalidArgument(format!(
                    "ambiguous task id '{trimmed}': {}",
                    matches.join(", ")
                )))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn create(&mut self, data: NewTask) -> Task {
        let task = Task {
            id: self.next_id(),
            title: data.title,
            description: data.description.unwrap_or_default(),
            category: data.category,
            priority: data.priority,
            due_date: data.due_date,
            estimated_time: data.estimated_time.unwrap_or(0),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            study_time: 0,
            review_dates: None,
        };
        tracing::debug!(id = %task.id, "task created");
        self.tasks.push(task.clone());
        self.commit();
        task
    }

    pub fn update(&mut self, id: &str, patch: TaskPatch) {
        let Some(task) = self.find_mut(id) else {
            tracing::debug!(id, "update ignored: unknown task");
            return;
        };
        patch.apply(task);
        tracing::debug!(id, "task updated");
        self.commit();
    }

    pub fn delete(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            tracing::debug!(id, "delete ignored: unknown task");
            return;
        }
        tracing::debug!(id, "task deleted");
        self.commit();
    }

    /// Flip completion. Completing stamps `completed_at` and (re)schedules
    /// review dates; reopening clears `completed_at` and keeps review dates.
    pub fn toggle_completion(&mut self, id: &str) {
        let Some(task) = self.find_mut(id) else {
            tracing::debug!(id, "toggle ignored: unknown task");
            return;
        };
        task.completed = !task.completed;
        if task.completed {
            let now = Utc::now();
            task.completed_at = Some(now);
            task.review_dates = Some(review_schedule(now));
        } else {
            task.completed_at = None;
        }
        tracing::debug!(id, completed = task.completed, "task completion toggled");
        self.commit();
    }

    pub fn add_study_time(&mut self, id: &str, minutes: i64) {
        if minutes <= 0 {
            return;
        }
        let Some(task) = self.find_mut(id) else {
            tracing::debug!(id, "study time ignored: unknown task");
            return;
        };
        let minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
        task.study_time = task.study_time.saturating_add(minutes);
        tracing::debug!(id, minutes, total = task.study_time, "study time added");
        self.commit();
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    fn next_id(&mut self) -> String {
        loop {
            // The monotonic generator only fails when the random part overflows
            // within one millisecond.
            let ulid = self.ids.generate().unwrap_or_else(|_| Ulid::new());
            let id = ulid.to_string().to_lowercase();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    fn commit(&mut self) {
        self.storage.save(&self.tasks);
        for subscriber in &mut self.subscribers {
            subscriber(&self.tasks);
        }
    }
}

/// Review reminders at +1, +3, +7 and +30 days from `completed_at`.
pub fn review_schedule(completed_at: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    REVIEW_OFFSETS_DAYS
        .iter()
        .map(|days| completed_at + Duration::days(*days))
        .collect()
}

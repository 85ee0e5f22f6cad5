//! Visible-task filtering and ordering.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::task::{Category, Priority, Task};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Completed,
    Pending,
}

impl std::str::FromStr for StatusFilter {
    type Err = crate::error::Error;

    fn from_str(raw: &str) -> crate::error::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "open" => Ok(StatusFilter::Pending),
            other => Err(crate::error::Error::InvalidArgument(format!(
                "unknown status '{other}' (expected completed|pending)"
            ))),
        }
    }
}

/// Search text plus optional category/priority/status constraints, ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<StatusFilter>,
}

impl FilterCriteria {
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_search(task)
            && self.category.map_or(true, |category| task.category == category)
            && self.priority.map_or(true, |priority| task.priority == priority)
            && match self.status {
                Some(StatusFilter::Completed) => task.completed,
                Some(StatusFilter::Pending) => !task.completed,
                None => true,
            }
    }

    fn matches_search(&self, task: &Task) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }
}

/// Matching tasks, open before completed, then by priority (high first).
/// Equal keys keep their source order.
pub fn filter<'a>(tasks: &'a [Task], criteria: &FilterCriteria) -> Vec<&'a Task> {
    let mut visible: Vec<&Task> = tasks.iter().filter(|task| criteria.matches(task)).collect();
    visible.sort_by_key(|task| (task.completed, Reverse(task.priority.rank())));
    visible
}

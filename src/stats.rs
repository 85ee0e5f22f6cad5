use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::{Category, Priority, Task};

/// Aggregate numbers over the full task list.
///
/// Histograms only carry buckets with at least one task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub total_study_minutes: u64,
    pub completion_rate: u32,
    pub by_category: BTreeMap<Category, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
}

pub fn compute(tasks: &[Task]) -> StatsSummary {
    compute_at(tasks, Utc::now())
}

pub fn compute_at(tasks: &[Task], now: DateTime<Utc>) -> StatsSummary {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let overdue = tasks.iter().filter(|task| task.is_overdue(now)).count();
    let total_study_minutes = tasks.iter().map(|task| u64::from(task.study_time)).sum();

    let mut by_category = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    for task in tasks {
        *by_category.entry(task.category).or_insert(0) += 1;
        *by_priority.entry(task.priority).or_insert(0) += 1;
    }

    StatsSummary {
        total,
        completed,
        pending: total - completed,
        overdue,
        total_study_minutes,
        completion_rate: completion_rate(completed, total),
        by_category,
        by_priority,
    }
}

/// Whole-percent completion, half rounding up; 0 for an empty list.
pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

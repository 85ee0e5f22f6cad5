//! Study timer state machine.
//!
//! ```text
//!   Idle --bind--> Ready --start--> Running <--start/pause--> Paused
//!     ^                                |                        |
//!     +------------- stop (commit ceil(elapsed / 60) min) ------+
//! ```
//!
//! The timer only counts logical seconds via [`StudyTimer::tick`]; the
//! scheduling of ticks belongs to [`crate::ticker::Ticker`]. Time commits are
//! routed through the [`TaskStore`], which the caller passes in.

use serde::Serialize;

use crate::task::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Ready,
    Running,
    Paused,
}

/// Task the timer is bound to; the title is kept for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundTask {
    pub id: String,
    pub title: String,
}

/// Result of stopping a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopOutcome {
    pub task_id: Option<String>,
    pub elapsed_seconds: u64,
    /// Minutes committed to the task; 0 means nothing was committed.
    pub minutes: u32,
}

#[derive(Debug, Clone)]
pub struct StudyTimer {
    state: TimerState,
    bound: Option<BoundTask>,
    elapsed_seconds: u64,
}

impl Default for StudyTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StudyTimer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            bound: None,
            elapsed_seconds: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn bound_task(&self) -> Option<&BoundTask> {
        self.bound.as_ref()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// `HH:MM:SS` for the current elapsed time
    pub fn display(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    /// Bind to a task and reset to zero. Any running count is discarded.
    pub fn set_current_task(&mut self, id: impl Into<String>, title: impl Into<String>) {
        let bound = BoundTask {
            id: id.into(),
            title: title.into(),
        };
        tracing::debug!(task = %bound.id, previous = ?self.state, "timer bound");
        self.bound = Some(bound);
        self.elapsed_seconds = 0;
        self.state = TimerState::Ready;
    }

    /// Returns true when this call started the timer.
    pub fn start(&mut self) -> bool {
        match self.state {
            TimerState::Ready | TimerState::Paused if self.bound.is_some() => {
                self.state = TimerState::Running;
                true
            }
            _ => false,
        }
    }

    /// Returns true when this call paused the timer.
    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Paused;
        true
    }

    /// Count one logical second. Ignored unless running.
    pub fn tick(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// Stop from running or paused and commit the rounded-up minutes.
    ///
    /// Returns `None` (and changes nothing) from idle or ready.
    pub fn stop(&mut self, store: &mut TaskStore) -> Option<StopOutcome> {
        if !matches!(self.state, TimerState::Running | TimerState::Paused) {
            return None;
        }
        let elapsed_seconds = self.elapsed_seconds;
        let minutes = seconds_to_minutes(elapsed_seconds);
        let task_id = self.bound.take().map(|bound| bound.id);

        let committed = match &task_id {
            Some(id) if minutes > 0 => {
                store.add_study_time(id, i64::from(minutes));
                minutes
            }
            _ => 0,
        };

        self.elapsed_seconds = 0;
        self.state = TimerState::Idle;
        tracing::debug!(task = ?task_id, elapsed_seconds, minutes = committed, "timer stopped");

        Some(StopOutcome {
            task_id,
            elapsed_seconds,
            minutes: committed,
        })
    }

    /// Log minutes against the bound task without touching the count.
    pub fn add_manual_time(&self, minutes: i64, store: &mut TaskStore) -> bool {
        match &self.bound {
            Some(bound) if minutes > 0 => {
                store.add_study_time(&bound.id, minutes);
                true
            }
            _ => false,
        }
    }
}

/// Whole minutes, rounded up; zero stays zero.
pub fn seconds_to_minutes(seconds: u64) -> u32 {
    u32::try_from(seconds.div_ceil(60)).unwrap_or(u32::MAX)
}

pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

//! Foreground study timer driven by line commands on stdin.

use std::io::{self, BufRead, Write};
use std::thread;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{Intent, Presenter, Session};
use crate::stats::StatsSummary;
use crate::task::{format_minutes, Task};

use super::Context;

const INTENT_BUFFER: usize = 16;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackOutput {
    id: String,
    title: String,
    added_minutes: u32,
    study_time: u32,
}

/// Terminal presenter: one live clock line, rewritten in place.
struct TrackPresenter {
    live: bool,
}

impl TrackPresenter {
    fn write_clock(&self, display: &str) {
        if !self.live {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\r{display}");
        let _ = stdout.flush();
    }
}

impl Presenter for TrackPresenter {
    fn render_tasks(&mut self, _tasks: &[&Task]) {}

    fn render_stats(&mut self, _stats: &StatsSummary) {}

    fn update_timer_display(&mut self, display: &str) {
        self.write_clock(display);
    }

    fn show_timer(&mut self, title: &str) {
        if self.live {
            println!("Studying: {title}");
            println!("[Enter/r] resume  [p] pause  [+N] add N min  [s] stop");
        }
    }

    fn hide_timer(&mut self) {
        if self.live {
            println!();
        }
    }
}

pub fn run_track(ctx: &Context, id: Option<String>, json: bool, quiet: bool) -> Result<()> {
    let store = ctx.open_store();
    let id = id.as_deref().map(|id| store.resolve_id(id)).transpose()?;
    let presenter = TrackPresenter {
        live: !json && !quiet,
    };
    let mut session = Session::new(store, presenter, ctx.config.timer.tick())
        .with_theme(ctx.theme());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (bound_id, before) = runtime.block_on(async {
        session.handle(Intent::TimerBindTask(id))?;
        let bound_id = session
            .timer()
            .bound_task()
            .map(|bound| bound.id.clone())
            .ok_or_else(|| Error::OperationFailed("timer has no task".to_string()))?;
        let before = session.store().get(&bound_id).map_or(0, |task| task.study_time);
        session.handle(Intent::TimerStart)?;

        let (tx, rx) = mpsc::channel(INTENT_BUFFER);
        spawn_stdin_reader(tx.clone());
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(Intent::Shutdown).await;
            }
        });

        session.run(rx).await?;
        Ok::<_, Error>((bound_id, before))
    })?;

    let store = session.into_store();
    let task = store
        .get(&bound_id)
        .ok_or_else(|| Error::TaskNotFound(bound_id.clone()))?;
    let output = TrackOutput {
        id: task.id.clone(),
        title: task.title.clone(),
        added_minutes: task.study_time.saturating_sub(before),
        study_time: task.study_time,
    };

    let mut human = HumanOutput::new("Study session recorded");
    human.push_summary("Title", output.title.clone());
    human.push_summary("Added", format_minutes(output.added_minutes));
    human.push_summary("Total", format_minutes(output.study_time));

    emit_success(OutputOptions { json, quiet }, "track", &output, Some(&human))
}

/// Blocking stdin reader on its own thread; end of input stops the timer.
fn spawn_stdin_reader(tx: mpsc::Sender<Intent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Ok(intents) => {
                    for intent in intents {
                        if tx.blocking_send(intent).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => eprintln!("{err}"),
            }
        }
        let _ = tx.blocking_send(Intent::TimerStop);
        let _ = tx.blocking_send(Intent::Shutdown);
    });
}

fn parse_command(line: &str) -> Result<Vec<Intent>> {
    let command = line.trim().to_ascii_lowercase();
    let intents = match command.as_str() {
        "" | "r" | "resume" | "start" => vec![Intent::TimerStart],
        "p" | "pause" => vec![Intent::TimerPause],
        "s" | "stop" | "q" | "quit" => vec![Intent::TimerStop, Intent::Shutdown],
        other => {
            let minutes = other
                .strip_prefix('+')
                .or_else(|| other.strip_prefix("add "))
                .ok_or_else(|| Error::InvalidArgument(format!("unknown command '{other}'")))?;
            let minutes: i64 = minutes.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!("invalid minutes '{}'", minutes.trim()))
            })?;
            if minutes <= 0 {
                return Err(Error::InvalidArgument(
                    "minutes must be a positive number".to_string(),
                ));
            }
            vec![Intent::TimerAddManual(minutes)]
        }
    };
    Ok(intents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_commands_map_to_intents() {
        assert_eq!(parse_command("").expect("enter"), vec![Intent::TimerStart]);
        assert_eq!(parse_command(" P ").expect("pause"), vec![Intent::TimerPause]);
        assert_eq!(
            parse_command("s").expect("stop"),
            vec![Intent::TimerStop, Intent::Shutdown]
        );
        assert_eq!(parse_command("+15").expect("add"), vec![Intent::TimerAddManual(15)]);
        assert_eq!(
            parse_command("add 5").expect("add"),
            vec![Intent::TimerAddManual(5)]
        );
    }

    #[test]
    fn bad_lines_rejected() {
        assert!(parse_command("+0").is_err());
        assert!(parse_command("+abc").is_err());
        assert!(parse_command("dance").is_err());
    }
}

//! Wiring between a presentation layer and the core.
//!
//! The presentation layer implements [`Presenter`] and sends [`Intent`]s.
//! A [`Session`] owns the task store, the timer and its tick source for one
//! run of the application, and processes intents and ticks one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::filter::{self, FilterCriteria};
use crate::stats::{self, StatsSummary};
use crate::task::{NewTask, Task, TaskPatch, TaskStore};
use crate::theme::{Theme, ThemePreference};
use crate::ticker::Ticker;
use crate::timer::StudyTimer;

/// Rendering surface driven by the session.
pub trait Presenter {
    fn render_tasks(&mut self, tasks: &[&Task]);
    fn render_stats(&mut self, stats: &StatsSummary);
    fn update_timer_display(&mut self, display: &str);
    fn show_timer(&mut self, title: &str);
    fn hide_timer(&mut self);
    fn render_theme(&mut self, _theme: Theme) {}
}

/// User intents raised by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CreateTask(NewTask),
    UpdateTask { id: String, patch: TaskPatch },
    DeleteTask(String),
    ToggleCompletion(String),
    FilterChanged(FilterCriteria),
    /// `None` binds the first task in the list.
    TimerBindTask(Option<String>),
    TimerStart,
    TimerPause,
    TimerStop,
    TimerAddManual(i64),
    ShowStats,
    ToggleTheme,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct Session<P> {
    store: TaskStore,
    timer: StudyTimer,
    ticker: Ticker,
    criteria: FilterCriteria,
    theme: Option<ThemePreference>,
    presenter: P,
    list_changed: Arc<AtomicBool>,
}

impl<P: Presenter> Session<P> {
    pub fn new(mut store: TaskStore, presenter: P, tick: Duration) -> Self {
        let list_changed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&list_changed);
        store.subscribe(move |_tasks| flag.store(true, Ordering::SeqCst));
        Self {
            store,
            timer: StudyTimer::new(),
            ticker: Ticker::new(tick),
            criteria: FilterCriteria::default(),
            theme: None,
            presenter,
            list_changed,
        }
    }

    pub fn with_theme(mut self, theme: ThemePreference) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn timer(&self) -> &StudyTimer {
        &self.timer
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn into_store(self) -> TaskStore {
        self.store
    }

    /// Initial paint of the current view.
    pub fn render(&mut self) {
        self.render_visible();
        if let Some(theme) = &self.theme {
            self.presenter.render_theme(theme.theme());
        }
    }

    /// Apply one intent. Invalid input is rejected before reaching the store.
    pub fn handle(&mut self, intent: Intent) -> Result<Flow> {
        tracing::debug!(?intent, "handling intent");
        let flow = self.dispatch(intent)?;
        if self.list_changed.swap(false, Ordering::SeqCst) {
            self.render_visible();
        }
        Ok(flow)
    }

    fn dispatch(&mut self, intent: Intent) -> Result<Flow> {
        match intent {
            Intent::CreateTask(mut data) => {
                data.title = require_title(&data.title)?;
                self.store.create(data);
            }
            Intent::UpdateTask { id, mut patch } => {
                if let Some(title) = patch.title.as_deref() {
                    patch.title = Some(require_title(title)?);
                }
                self.store.update(&id, patch);
            }
            Intent::DeleteTask(id) => self.store.delete(&id),
            Intent::ToggleCompletion(id) => self.store.toggle_completion(&id),
            Intent::FilterChanged(criteria) => {
                self.criteria = criteria;
                self.render_visible();
            }
            Intent::TimerBindTask(id) => self.bind_timer(id.as_deref())?,
            Intent::TimerStart => {
                if self.timer.start() {
                    self.ticker.arm();
                }
            }
            Intent::TimerPause => {
                if self.timer.pause() {
                    self.ticker.disarm();
                }
            }
            Intent::TimerStop => self.stop_timer(),
            Intent::TimerAddManual(minutes) => {
                if minutes <= 0 {
                    return Err(Error::InvalidArgument(
                        "minutes must be a positive number".to_string(),
                    ));
                }
                if !self.timer.add_manual_time(minutes, &mut self.store) {
                    tracing::debug!(minutes, "manual time ignored: no task bound");
                }
            }
            Intent::ShowStats => {
                let summary = stats::compute(self.store.get_all());
                self.presenter.render_stats(&summary);
            }
            Intent::ToggleTheme => {
                if let Some(theme) = self.theme.as_mut() {
                    let next = theme.toggle();
                    self.presenter.render_theme(next);
                }
            }
            Intent::Shutdown => {
                self.stop_timer();
                return Ok(Flow::Shutdown);
            }
        }
        Ok(Flow::Continue)
    }

    /// Count one tick and refresh the display.
    pub fn on_tick(&mut self) {
        if self.timer.tick() {
            let display = self.timer.display();
            self.presenter.update_timer_display(&display);
        }
    }

    /// Process intents and ticks until shutdown or until every sender is gone.
    pub async fn run(&mut self, mut intents: mpsc::Receiver<Intent>) -> Result<()> {
        loop {
            tokio::select! {
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        self.handle(Intent::Shutdown)?;
                        return Ok(());
                    };
                    match self.handle(intent) {
                        Ok(Flow::Shutdown) => return Ok(()),
                        Ok(Flow::Continue) => {}
                        Err(err) => tracing::warn!(error = %err, "intent rejected"),
                    }
                }
                _ = self.ticker.tick() => self.on_tick(),
            }
        }
    }

    fn bind_timer(&mut self, id: Option<&str>) -> Result<()> {
        let task = match id {
            Some(id) => self
                .store
                .get(id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?,
            None => self.store.get_all().first().ok_or_else(|| {
                Error::InvalidArgument("no tasks yet; add a task first".to_string())
            })?,
        };
        let (id, title) = (task.id.clone(), task.title.clone());

        self.ticker.disarm();
        self.timer.set_current_task(id, title.clone());
        self.presenter.show_timer(&title);
        let display = self.timer.display();
        self.presenter.update_timer_display(&display);
        Ok(())
    }

    fn stop_timer(&mut self) {
        self.ticker.disarm();
        if self.timer.stop(&mut self.store).is_some() {
            let display = self.timer.display();
            self.presenter.update_timer_display(&display);
            self.presenter.hide_timer();
        }
    }

    fn render_visible(&mut self) {
        let visible = filter::filter(self.store.get_all(), &self.criteria);
        self.presenter.render_tasks(&visible);
    }
}

/// Trimmed title, or `InvalidArgument` when nothing is left.
pub(crate) fn require_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StatusFilter;
    use crate::storage::{MemoryBackend, StorageAdapter, THEME_KEY};
    use crate::task::{Category, Priority};

    #[derive(Debug, Default)]
    struct Recorder {
        renders: Vec<Vec<String>>,
        stats: Vec<StatsSummary>,
        displays: Vec<String>,
        shown: Vec<String>,
        hidden: usize,
        themes: Vec<Theme>,
    }

    impl Presenter for Recorder {
        fn render_tasks(&mut self, tasks: &[&Task]) {
            self.renders
                .push(tasks.iter().map(|task| task.title.clone()).collect());
        }

        fn render_stats(&mut self, stats: &StatsSummary) {
            self.stats.push(stats.clone());
        }

        fn update_timer_display(&mut self, display: &str) {
            self.displays.push(display.to_string());
        }

        fn show_timer(&mut self, title: &str) {
            self.shown.push(title.to_string());
        }

        fn hide_timer(&mut self) {
            self.hidden += 1;
        }

        fn render_theme(&mut self, theme: Theme) {
            self.themes.push(theme);
        }
    }

    fn session() -> Session<Recorder> {
        let storage = StorageAdapter::new(Arc::new(MemoryBackend::new()), "tasks");
        Session::new(TaskStore::open(storage), Recorder::default(), Duration::from_secs(1))
    }

    fn create(session: &mut Session<Recorder>, title: &str, priority: Priority) -> String {
        session
            .handle(Intent::CreateTask(NewTask::new(title, Category::Grammar, priority)))
            .expect("create");
        session
            .store()
            .get_all()
            .last()
            .map(|task| task.id.clone())
            .expect("created task")
    }

    #[test]
    fn mutations_rerender_filtered_view() {
        let mut session = session();
        create(&mut session, "Low one", Priority::Low);
        let high = create(&mut session, "High one", Priority::High);

        session
            .handle(Intent::FilterChanged(FilterCriteria {
                status: Some(StatusFilter::Pending),
                ..FilterCriteria::default()
            }))
            .expect("filter");
        session.handle(Intent::ToggleCompletion(high)).expect("toggle");

        let renders = &session.presenter().renders;
        assert_eq!(renders[1], vec!["High one", "Low one"]);
        assert_eq!(renders.last().expect("render"), &vec!["Low one".to_string()]);
    }

    #[test]
    fn blank_title_never_reaches_store() {
        let mut session = session();
        let err = session
            .handle(Intent::CreateTask(NewTask::new("   ", Category::Reading, Priority::Low)))
            .expect_err("rejected");
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(session.store().is_empty());

        let id = create(&mut session, "  Padded  ", Priority::Low);
        assert_eq!(session.store().get(&id).expect("task").title, "Padded");

        let err = session
            .handle(Intent::UpdateTask {
                id: id.clone(),
                patch: TaskPatch {
                    title: Some(String::new()),
                    ..TaskPatch::default()
                },
            })
            .expect_err("rejected");
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(session.store().get(&id).expect("task").title, "Padded");
    }

    #[test]
    fn require_title_trims_and_rejects_blank() {
        assert!(matches!(require_title(" \t "), Err(Error::InvalidArgument(_))));
        assert_eq!(require_title("  Shadowing ").expect("title"), "Shadowing");
    }

    #[test]
    fn non_positive_manual_time_is_rejected() {
        let mut session = session();
        let id = create(&mut session, "Essay", Priority::High);
        session
            .handle(Intent::TimerBindTask(Some(id.clone())))
            .expect("bind");

        assert!(session.handle(Intent::TimerAddManual(0)).is_err());
        assert!(session.handle(Intent::TimerAddManual(-3)).is_err());
        session.handle(Intent::TimerAddManual(25)).expect("manual");
        assert_eq!(session.store().get(&id).expect("task").study_time, 25);
    }

    #[test]
    fn binding_without_id_uses_first_task() {
        let mut session = session();
        assert!(session.handle(Intent::TimerBindTask(None)).is_err());

        create(&mut session, "First", Priority::Low);
        create(&mut session, "Second", Priority::High);
        session.handle(Intent::TimerBindTask(None)).expect("bind");

        assert_eq!(session.presenter().shown, vec!["First"]);
        assert_eq!(session.presenter().displays.last().map(String::as_str), Some("00:00:00"));
        assert!(matches!(
            session.handle(Intent::TimerBindTask(Some("nope".to_string()))),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn stats_cover_full_list_not_filtered_view() {
        let mut session = session();
        let done = create(&mut session, "Done", Priority::Low);
        create(&mut session, "Open", Priority::Low);
        session.handle(Intent::ToggleCompletion(done)).expect("toggle");
        session
            .handle(Intent::FilterChanged(FilterCriteria {
                status: Some(StatusFilter::Pending),
                ..FilterCriteria::default()
            }))
            .expect("filter");

        session.handle(Intent::ShowStats).expect("stats");
        let stats = session.presenter().stats.last().expect("stats");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completion_rate, 50);
    }

    #[test]
    fn theme_toggle_persists_and_renders() {
        let backend = MemoryBackend::new();
        let theme = ThemePreference::load_or_init(
            Arc::new(backend.clone()),
            THEME_KEY,
            Some(Theme::Light),
            Theme::Light,
        );
        let mut session = session().with_theme(theme);
        session.handle(Intent::ToggleTheme).expect("toggle");

        assert_eq!(session.presenter().themes, vec![Theme::Dark]);
        assert_eq!(backend.raw(THEME_KEY).as_deref(), Some("dark"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_ticks_and_commits_on_stop() {
        let mut session = session();
        let id = create(&mut session, "Listening", Priority::Medium);

        let (tx, rx) = mpsc::channel(8);
        let bind_id = id.clone();
        let driver = tokio::spawn(async move {
            tx.send(Intent::TimerBindTask(Some(bind_id))).await.expect("send");
            tx.send(Intent::TimerStart).await.expect("send");
            tokio::time::sleep(Duration::from_millis(61_500)).await;
            tx.send(Intent::TimerStop).await.expect("send");
            tx.send(Intent::Shutdown).await.expect("send");
        });

        session.run(rx).await.expect("run");
        driver.await.expect("driver");

        assert_eq!(session.store().get(&id).expect("task").study_time, 2);
        assert!(session.presenter().displays.contains(&"00:01:01".to_string()));
        assert_eq!(session.presenter().hidden, 1);
        assert!(!session.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_timer_receives_no_stale_ticks() {
        let mut session = session();
        let id = create(&mut session, "Reading", Priority::Low);

        let (tx, rx) = mpsc::channel(8);
        let driver = tokio::spawn(async move {
            tx.send(Intent::TimerBindTask(Some(id))).await.expect("send");
            tx.send(Intent::TimerStart).await.expect("send");
            tokio::time::sleep(Duration::from_millis(3_500)).await;
            tx.send(Intent::TimerPause).await.expect("send");
            tokio::time::sleep(Duration::from_secs(30)).await;
            tx.send(Intent::Shutdown).await.expect("send");
        });

        session.run(rx).await.expect("run");
        driver.await.expect("driver");

        assert_eq!(session.timer().elapsed_seconds(), 0);
        let last_display = session.presenter().displays.last().cloned();
        assert_eq!(last_display.as_deref(), Some("00:00:00"));
        assert!(session
            .presenter()
            .displays
            .iter()
            .all(|display| display.as_str() <= "00:00:03"));
    }

    #[tokio::test]
    async fn closed_channel_stops_running_timer() {
        let mut session = session();
        let id = create(&mut session, "Speaking", Priority::High);
        session
            .handle(Intent::TimerBindTask(Some(id.clone())))
            .expect("bind");
        session.handle(Intent::TimerStart).expect("start");
        session.on_tick();
        assert!(session.is_ticking());

        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        session.run(rx).await.expect("run");

        assert_eq!(session.store().get(&id).expect("task").study_time, 1);
        assert!(!session.is_ticking());
    }
}

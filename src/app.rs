//! Application orchestration.
//!
//! Wires the stream controller, the search coordinator, the list view and a renderer into one
//! event loop: terminal input, search worker replies and a redraw tick are multiplexed with
//! `tokio::select!`, and every iteration ends with a frame.

pub mod list;
pub mod runtime;

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::input::InputAction;
use crate::render::ui::{UIRenderer, ViewState};
use crate::search::{Debouncer, IndexStatus, SearchCoordinator};
use crate::store::LogStore;
use crate::stream::{ChunkSource, StreamController};
use crate::timeline::Histogram;
use list::{DisplaySource, ListView};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const INPUT_POLL_INTERVAL_MS: u64 = 25;
/// Minimum spacing between timeline rebuilds while records are still arriving
const TIMELINE_REFRESH_MS: u64 = 250;

pub use runtime::spawn_input_thread;

/// Rebuilds the histogram only when the store changed, and not more often than the refresh
/// interval while streaming.
#[derive(Default)]
struct TimelineCache {
    version: Option<(u64, usize)>,
    built_at: Option<Instant>,
    histogram: Option<Histogram>,
}

impl TimelineCache {
    fn refresh(&mut self, store: &LogStore, buckets: usize, settled: bool, now: Instant) {
        let version = store.version();
        if self.version == Some(version) {
            return;
        }
        let due = settled
            || self.built_at.map_or(true, |at| {
                now.saturating_duration_since(at) >= Duration::from_millis(TIMELINE_REFRESH_MS)
            });
        if due {
            self.histogram = Histogram::build(&store.snapshot(), buckets);
            self.version = Some(version);
            self.built_at = Some(now);
        }
    }
}

pub struct Application {
    controller: StreamController,
    search: SearchCoordinator,
    ui_renderer: Box<dyn UIRenderer>,
    config: ViewerConfig,
    view: ViewState,
    list: ListView,
    debouncer: Debouncer<String>,
    filter: String,
    /// Store version last handed to the search worker
    indexed_version: Option<(u64, usize)>,
    timeline: TimelineCache,
}

impl Application {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        ui_renderer: Box<dyn UIRenderer>,
        config: ViewerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (width, height) = ui_renderer.get_terminal_size()?;
        let label = source.describe();
        let controller = StreamController::new(source, LogStore::new());

        let view = ViewState::new(label, width, height);
        let mut list = ListView::new(&config);
        list.resize(width, view.list_height());

        Ok(Self {
            controller,
            search: SearchCoordinator::new(),
            ui_renderer,
            debouncer: Debouncer::new(config.search_debounce()),
            config,
            view,
            list,
            filter: String::new(),
            indexed_version: None,
            timeline: TimelineCache::default(),
        })
    }

    pub fn controller(&self) -> &StreamController {
        &self.controller
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Begin ingestion without entering the event loop.
    pub fn start(&mut self) {
        self.controller.start();
    }

    /// Run until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        self.ui_renderer.initialize()?;
        let result = self.event_loop().await;
        self.search.shutdown().await;
        self.controller.abort();
        self.ui_renderer.cleanup()?;
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let input_thread = spawn_input_thread(
            input_tx,
            Arc::clone(&shutdown),
            Duration::from_millis(INPUT_POLL_INTERVAL_MS),
        );

        self.start();
        let mut ticker = tokio::time::interval(self.config.tick_rate());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut result = Ok(());
        loop {
            let step = tokio::select! {
                Some(action) = input_rx.recv() => self.handle_action(action),
                Some(response) = self.search.next_response() => {
                    self.search.handle_response(response).map(|_| true)
                }
                _ = ticker.tick() => Ok(true),
            };
            match step {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
            if let Err(error) = self.on_tick(Instant::now()).and_then(|_| self.draw()) {
                result = Err(error);
                break;
            }
        }

        shutdown.store(true, Ordering::SeqCst);
        if input_thread.join().is_err() {
            log::warn!("input thread panicked");
        }
        result
    }

    /// Apply one input action. Returns `false` when the user asked to quit.
    pub fn handle_action(&mut self, action: InputAction) -> Result<bool> {
        match action {
            InputAction::Quit => return Ok(false),
            InputAction::Scroll { direction, lines } => self.list.scroll_by(direction.delta(lines)),
            InputAction::SelectNext => self.list.move_selection(1),
            InputAction::SelectPrevious => self.list.move_selection(-1),
            InputAction::PageDown => self.list.page(1),
            InputAction::PageUp => self.list.page(-1),
            InputAction::GoToStart => self.list.go_to_start(),
            InputAction::GoToEnd => self.list.go_to_end(),
            InputAction::ToggleExpand => self.list.toggle_expanded(),
            InputAction::StartFilter { buffer } => {
                self.view.filter_prompt = Some(buffer);
            }
            InputAction::UpdateFilter { buffer } => {
                self.view.filter_prompt = Some(buffer.clone());
                self.debouncer.push(buffer, Instant::now());
            }
            InputAction::ApplyFilter { query } => {
                self.view.filter_prompt = None;
                self.debouncer.cancel();
                self.apply_filter(query);
            }
            InputAction::ClearFilter => {
                self.view.filter_prompt = None;
                self.debouncer.cancel();
                self.apply_filter(String::new());
            }
            InputAction::Abort => self.controller.abort(),
            InputAction::Retry => {
                self.view.status.clear_message();
                self.controller.retry();
            }
            InputAction::Resize { width, height } => {
                self.view.update_terminal_size(width, height);
                self.list.resize(width, self.view.list_height());
            }
            InputAction::NoAction | InputAction::InvalidInput => {}
        }
        Ok(true)
    }

    fn apply_filter(&mut self, query: String) {
        if query == self.filter {
            return;
        }
        log::debug!("filter changed to {query:?}");
        if !self.search.search(&query) && !query.is_empty() {
            self.view
                .status
                .set_message("filter applies once indexing finishes");
        } else {
            self.view.status.clear_message();
        }
        self.filter = query;
    }

    /// Periodic housekeeping: debounced filter dispatch, index loading, status and timeline.
    pub fn on_tick(&mut self, now: Instant) -> Result<()> {
        if let Some(query) = self.debouncer.poll(now) {
            self.apply_filter(query);
        }

        let status = self.controller.status();
        let store = self.controller.store().clone();
        let version = store.version();

        if status.state.is_terminal() && version.1 > 0 && self.indexed_version != Some(version) {
            self.search.load(store.snapshot())?;
            self.indexed_version = Some(version);
        }

        self.timeline.refresh(
            &store,
            self.config.timeline_buckets,
            status.state.is_terminal(),
            now,
        );
        self.view.timeline = self.timeline.histogram.clone();

        self.view.status.apply_stream_status(&status);
        self.view.status.indexing = self.search.is_indexing();
        self.view.filter.clone_from(&self.filter);
        Ok(())
    }

    /// What the list should show right now.
    fn display_source(&self) -> DisplaySource {
        let store = self.controller.store();
        let index_current = self
            .indexed_version
            .is_some_and(|(generation, _)| generation == store.generation());
        let ready = matches!(self.search.status(), IndexStatus::Ready { .. });
        // Until a filter has been answered for this index the live list stays up.
        let answered = self
            .search
            .results_query()
            .is_some_and(|query| !query.is_empty());

        if !self.filter.is_empty() && index_current && ready && answered {
            DisplaySource::Filtered(self.search.results())
        } else {
            DisplaySource::Live(store.clone())
        }
    }

    /// Lay out and draw one frame.
    pub fn draw(&mut self) -> Result<()> {
        let source = self.display_source();
        self.view.status.filtered_count = match &source {
            DisplaySource::Filtered(records) => Some(records.len()),
            DisplaySource::Live(_) => None,
        };

        let frame = self.list.layout(&source);
        self.view.rows = frame.rows;
        self.view.skip_lines = frame.skip_lines;
        self.view.status.following = self.list.is_following();

        let drew_rows = self.ui_renderer.render(&self.view)?;
        if drew_rows {
            if let Some(ttfr) = self.controller.record_first_render() {
                log::info!("first row rendered after {}ms", ttfr.as_millis());
            }
        }
        Ok(())
    }

    /// Drain and apply every search reply that is already waiting.
    pub fn process_search_responses(&mut self) -> Result<bool> {
        let mut changed = false;
        while let Some(response) = self.search.try_next_response() {
            changed |= self.search.handle_response(response)?;
        }
        Ok(changed)
    }

    /// Wait for the next search reply and apply it.
    pub async fn next_search_response(&mut self) -> Result<bool> {
        match self.search.next_response().await {
            Some(response) => self.search.handle_response(response),
            None => Ok(false),
        }
    }

    pub async fn wait_for_stream(&mut self) {
        self.controller.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ui::MockUIRenderer;
    use crate::stream::{MemorySource, SessionState};
    use tokio::time::timeout;

    const FEED: &str = concat!(
        "{\"_time\":1724323612000,\"level\":\"info\",\"msg\":\"boot\"}\n",
        "{\"_time\":1724323613000,\"level\":\"error\",\"msg\":\"disk\"}\n",
        "not json\n",
        "{\"_time\":1724323614000,\"level\":\"info\",\"msg\":\"ready\"}\n",
    );

    fn app(config: ViewerConfig) -> Application {
        let source = Arc::new(MemorySource::chunked(FEED, 7));
        Application::new(source, Box::new(MockUIRenderer::new()), config).unwrap()
    }

    async fn loaded(config: ViewerConfig) -> Application {
        let mut app = app(config);
        app.start();
        app.wait_for_stream().await;
        app.on_tick(Instant::now()).unwrap();
        app
    }

    fn row_indices(app: &Application) -> Vec<usize> {
        app.view_state().rows.iter().map(|r| r.index).collect()
    }

    #[tokio::test]
    async fn streams_and_draws_all_rows() {
        let mut app = loaded(ViewerConfig::default()).await;
        app.draw().unwrap();

        let status = app.controller().status();
        assert_eq!(status.state, SessionState::Completed);
        assert_eq!(status.record_count, 3);
        assert_eq!(row_indices(&app), vec![0, 1, 2]);
        assert!(app.view_state().timeline.is_some());
        assert!(app.controller().status().ttfr.is_some());
        assert!(app.view_state().status.format().contains("3 logs"));
    }

    #[tokio::test]
    async fn filter_shows_matching_rows_after_indexing() {
        let mut app = loaded(ViewerConfig::default()).await;
        assert!(app.view_state().status.indexing);

        // Ready
        assert!(timeout(Duration::from_secs(1), app.next_search_response())
            .await
            .unwrap()
            .unwrap());

        app.handle_action(InputAction::ApplyFilter {
            query: "ERROR".to_string(),
        })
        .unwrap();
        assert!(timeout(Duration::from_secs(1), app.next_search_response())
            .await
            .unwrap()
            .unwrap());

        app.draw().unwrap();
        assert_eq!(app.view_state().status.filtered_count, Some(1));
        assert_eq!(app.view_state().rows.len(), 1);
        assert_eq!(app.view_state().rows[0].level.as_deref(), Some("error"));

        app.handle_action(InputAction::ClearFilter).unwrap();
        app.draw().unwrap();
        assert_eq!(app.view_state().status.filtered_count, None);
        assert_eq!(row_indices(&app), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn filter_typed_before_ready_is_applied_on_ready() {
        let mut app = loaded(ViewerConfig::default()).await;
        app.handle_action(InputAction::ApplyFilter {
            query: "ready".to_string(),
        })
        .unwrap();
        assert_eq!(app.filter(), "ready");
        app.draw().unwrap();
        assert_eq!(app.view_state().status.filtered_count, None);

        // Ready re-issues the current query; the list stays live until it is answered.
        assert!(timeout(Duration::from_secs(1), app.next_search_response())
            .await
            .unwrap()
            .unwrap());
        app.draw().unwrap();
        assert_eq!(app.view_state().status.filtered_count, None);
        assert_eq!(row_indices(&app), vec![0, 1, 2]);

        assert!(timeout(Duration::from_secs(1), app.next_search_response())
            .await
            .unwrap()
            .unwrap());
        app.draw().unwrap();
        assert_eq!(app.view_state().status.filtered_count, Some(1));
    }

    #[tokio::test]
    async fn debounced_filter_waits_for_quiet_period() {
        let mut app = loaded(ViewerConfig::default()).await;
        let start = Instant::now();
        app.handle_action(InputAction::UpdateFilter {
            buffer: "disk".to_string(),
        })
        .unwrap();
        assert_eq!(app.view_state().filter_prompt.as_deref(), Some("disk"));

        app.on_tick(start).unwrap();
        assert_eq!(app.filter(), "");
        app.on_tick(start + Duration::from_secs(1)).unwrap();
        assert_eq!(app.filter(), "disk");
    }

    #[tokio::test]
    async fn navigation_and_quit() {
        let mut app = loaded(ViewerConfig {
            follow: false,
            ..ViewerConfig::default()
        })
        .await;
        app.draw().unwrap();

        app.handle_action(InputAction::SelectNext).unwrap();
        app.handle_action(InputAction::ToggleExpand).unwrap();
        app.draw().unwrap();
        assert!(app.list().is_expanded(0));
        assert!(app.view_state().rows[0].height() > 1);

        app.handle_action(InputAction::GoToEnd).unwrap();
        assert!(app.list().is_following());
        assert!(!app.handle_action(InputAction::Quit).unwrap());
    }

    #[tokio::test]
    async fn retry_restarts_session() {
        let mut app = loaded(ViewerConfig::default()).await;
        app.handle_action(InputAction::Retry).unwrap();
        app.wait_for_stream().await;
        app.on_tick(Instant::now()).unwrap();
        app.draw().unwrap();

        let status = app.controller().status();
        assert_eq!(status.session_id, 2);
        assert_eq!(status.record_count, 3);
        assert_eq!(row_indices(&app), vec![0, 1, 2]);
    }
}

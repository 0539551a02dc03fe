//! The chat session: every piece of session state lives in [`App`], and
//! [`App::update`] is the only place it changes. The event loop feeds it one
//! [`AppEvent`] at a time and carries out the [`Effect`]s it returns.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use luke_core::llm::Message;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;

pub mod catalog;
pub mod chat;
pub mod compose;
pub mod input;
pub mod picker;
pub mod stream;

use catalog::ModelCatalog;
use chat::Conversation;
use compose::{ImageResolver, Submission};
use input::InputBuffer;
use picker::PickerState;
use stream::{StreamState, Usage};

pub type RequestId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Chat,
    PickerNormal,
    PickerSearch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer {
    /// Animation tick. Only the newest generation is acted on, so a
    /// restarted cadence never runs alongside the one it replaced.
    Redraw(u64),
    Watchdog,
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Paste(String),
    Resize,
    Tick(Timer),
    /// Cumulative text received so far for request `id`.
    Partial { id: RequestId, content: String },
    /// `content` is `None` when the reply was streamed into the buffer.
    Completed { id: RequestId, content: Option<String>, usage: Option<Usage> },
    Failed { id: RequestId, error: String },
    CatalogFetched(Result<Vec<String>, String>),
    CredentialSaveFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub id: RequestId,
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Redraw,
    Schedule { timer: Timer, after: Duration },
    SendChat(ChatRequest),
    FetchCatalog { credential: Option<String> },
    SaveCredential(String),
    Quit,
}

pub struct App {
    pub cfg: SessionConfig,
    pub conversation: Conversation,
    pub catalog: ModelCatalog,
    pub selected_model: String,
    pub picker: Option<PickerState>,
    pub stream: Option<StreamState>,
    pub input: InputBuffer,
    pub credential: Option<String>,
    pub last_error: Option<String>,
    pub usage: Option<Usage>,
    /// Lines scrolled up from the bottom of the transcript.
    pub chat_scroll: u16,
    /// Largest useful `chat_scroll`, as measured by the last frame.
    scroll_limit: u16,
    pub should_quit: bool,
    next_request: RequestId,
    last_redraw_at: Option<Instant>,
    redraw_generation: u64,
    watchdog_ticking: bool,
    resolve_image: ImageResolver,
}

impl App {
    pub fn new(cfg: SessionConfig, credential: Option<String>, preferred_model: Option<String>) -> Self {
        let catalog = ModelCatalog::builtin();
        let selected_model = preferred_model
            .filter(|m| catalog.contains(m))
            .unwrap_or_else(|| cfg.default_model.clone());
        Self {
            cfg,
            conversation: Conversation::primed(),
            catalog,
            selected_model,
            picker: None,
            stream: None,
            input: InputBuffer::default(),
            credential: credential.filter(|c| !c.trim().is_empty()),
            last_error: None,
            usage: None,
            chat_scroll: 0,
            scroll_limit: 0,
            should_quit: false,
            next_request: 0,
            last_redraw_at: None,
            redraw_generation: 0,
            watchdog_ticking: false,
            resolve_image: compose::resolve_on_disk,
        }
    }

    pub fn with_image_resolver(mut self, resolve: ImageResolver) -> Self {
        self.resolve_image = resolve;
        self
    }

    pub fn mode(&self) -> Mode {
        match &self.picker {
            None => Mode::Chat,
            Some(p) if p.searching => Mode::PickerSearch,
            Some(_) => Mode::PickerNormal,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.stream.is_some()
    }

    /// First effects of a session: both periodic timers and an initial frame.
    pub fn start(&mut self, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.restart_redraw_ticks(&mut fx);
        self.ensure_watchdog(&mut fx);
        fx.push(Effect::Redraw);
        self.last_redraw_at = Some(now);
        fx
    }

    /// Records how far the transcript can scroll at the current size.
    pub fn set_scroll_limit(&mut self, limit: u16) {
        self.scroll_limit = limit;
        self.chat_scroll = self.chat_scroll.min(limit);
    }

    pub fn update(&mut self, event: AppEvent, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            AppEvent::Key(key) => self.on_key(key, now, &mut fx),
            AppEvent::Paste(text) => self.on_paste(&text, &mut fx),
            AppEvent::Resize => fx.push(Effect::Redraw),
            AppEvent::Tick(Timer::Redraw(generation)) => self.on_redraw_tick(generation, now, &mut fx),
            AppEvent::Tick(Timer::Watchdog) => self.on_watchdog_tick(now, &mut fx),
            AppEvent::Partial { id, content } => self.on_partial(id, content, now, &mut fx),
            AppEvent::Completed { id, content, usage } => self.on_completed(id, content, usage, now, &mut fx),
            AppEvent::Failed { id, error } => self.on_failed(id, error, &mut fx),
            AppEvent::CatalogFetched(result) => self.on_catalog_fetched(result, &mut fx),
            AppEvent::CredentialSaveFailed(e) => {
                warn!(target: "tui", "credential not saved: {}", e);
                self.last_error = Some(format!("Failed to save API key: {}", e));
                fx.push(Effect::Redraw);
            }
        }
        if fx.contains(&Effect::Redraw) {
            self.last_redraw_at = Some(now);
        }
        fx
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant, fx: &mut Vec<Effect>) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                info!(target: "tui", "quit requested (outstanding request: {})", self.is_waiting());
                self.should_quit = true;
                fx.push(Effect::Quit);
                return;
            }
            KeyCode::Char('k') if ctrl => {
                self.clear_history();
                fx.push(Effect::Redraw);
                return;
            }
            _ => {}
        }
        match self.mode() {
            Mode::Chat => self.on_chat_key(key, now, fx),
            Mode::PickerNormal => self.on_picker_normal_key(key, fx),
            Mode::PickerSearch => self.on_picker_search_key(key, fx),
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent, now: Instant, fx: &mut Vec<Effect>) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let newline_mod = key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
        match key.code {
            KeyCode::Char('f') if ctrl => self.open_picker(fx),
            KeyCode::Char('w') if ctrl => self.input.delete_prev_word(),
            KeyCode::Char('a') if ctrl => self.input.move_line_start(),
            KeyCode::Char('e') if ctrl => self.input.move_line_end(),
            KeyCode::Enter if newline_mod => self.input.insert_char('\n'),
            KeyCode::Enter => self.submit(now, fx),
            KeyCode::Char(ch) if !ctrl => self.input.insert_char(ch),
            KeyCode::Backspace => self.input.delete_left(),
            KeyCode::Delete => self.input.delete_right(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_line_start(),
            KeyCode::End => self.input.move_line_end(),
            KeyCode::PageUp => {
                self.chat_scroll = self
                    .chat_scroll
                    .saturating_add(self.cfg.page_step as u16)
                    .min(self.scroll_limit);
            }
            KeyCode::PageDown => {
                self.chat_scroll = self.chat_scroll.saturating_sub(self.cfg.page_step as u16);
            }
            _ => return,
        }
        fx.push(Effect::Redraw);
    }

    fn on_picker_normal_key(&mut self, key: KeyEvent, fx: &mut Vec<Effect>) {
        let step = self.cfg.page_step as isize;
        let Some(p) = self.picker.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.picker = None,
            KeyCode::Enter => self.commit_picker_selection(),
            KeyCode::Char('/') | KeyCode::Char('i') => p.enter_search(&self.catalog),
            KeyCode::Up | KeyCode::Char('k') => p.move_by(-1),
            KeyCode::Down | KeyCode::Char('j') => p.move_by(1),
            KeyCode::PageUp => p.move_by(-step),
            KeyCode::PageDown => p.move_by(step),
            _ => return,
        }
        fx.push(Effect::Redraw);
    }

    fn on_picker_search_key(&mut self, key: KeyEvent, fx: &mut Vec<Effect>) {
        let step = self.cfg.page_step as isize;
        let printable_mods = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
        let Some(p) = self.picker.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => p.leave_search(&self.catalog),
            KeyCode::Enter => self.commit_picker_selection(),
            KeyCode::Backspace => p.pop_char(&self.catalog),
            KeyCode::Up => p.move_by(-1),
            KeyCode::Down => p.move_by(1),
            KeyCode::PageUp => p.move_by(-step),
            KeyCode::PageDown => p.move_by(step),
            KeyCode::Char(ch) if printable_mods && !ch.is_control() => p.push_char(ch, &self.catalog),
            _ => return,
        }
        fx.push(Effect::Redraw);
    }

    fn on_paste(&mut self, text: &str, fx: &mut Vec<Effect>) {
        match self.picker.as_mut() {
            None => self.input.insert_text(text),
            Some(p) if p.searching => {
                for ch in text.chars().filter(|c| !c.is_control()) {
                    p.push_char(ch, &self.catalog);
                }
            }
            Some(_) => return,
        }
        fx.push(Effect::Redraw);
    }

    fn open_picker(&mut self, fx: &mut Vec<Effect>) {
        self.picker = Some(PickerState::open(&self.catalog, &self.selected_model));
        if self.credential.is_some() {
            fx.push(Effect::FetchCatalog {
                credential: self.credential.clone(),
            });
        }
    }

    /// Closes the overlay on the highlighted model. Nothing happens when the
    /// filtered list is empty.
    fn commit_picker_selection(&mut self) {
        let Some(chosen) = self
            .picker
            .as_ref()
            .and_then(|p| p.highlighted())
            .map(str::to_string)
        else {
            return;
        };
        info!(target: "tui", "model selected: {}", chosen);
        self.selected_model = chosen;
        self.picker = None;
    }

    fn clear_history(&mut self) {
        if let Some(s) = self.stream.take() {
            debug!(target: "tui", "clear abandons outstanding request {}", s.id);
        }
        self.conversation.clear();
        self.usage = None;
        self.chat_scroll = 0;
    }

    fn submit(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if self.input.is_blank() {
            return;
        }
        if let Some(s) = &self.stream {
            debug!(target: "tui", "submit rejected: request {} outstanding", s.id);
            return;
        }
        let body = match compose::parse_submission(self.input.text()) {
            Submission::SetKey(key) => {
                self.credential = Some(key.clone());
                self.input.clear();
                fx.push(Effect::SaveCredential(key));
                return;
            }
            Submission::Message(body) => body,
        };
        let content = compose::expand_image_lines(&body, self.resolve_image);
        self.conversation.push(Message::user(content));
        self.input.clear();
        self.last_error = None;
        self.chat_scroll = 0;

        self.next_request += 1;
        let id = self.next_request;
        self.stream = Some(StreamState::begin(id, now));
        info!(
            target: "tui",
            "submit: request={} model={} history_len={}",
            id,
            self.selected_model,
            self.conversation.len()
        );
        fx.push(Effect::SendChat(ChatRequest {
            id,
            model: self.selected_model.clone(),
            messages: self.conversation.messages().to_vec(),
        }));
        // Switch to the active cadence now rather than after the idle tick.
        self.restart_redraw_ticks(fx);
        self.ensure_watchdog(fx);
    }

    fn restart_redraw_ticks(&mut self, fx: &mut Vec<Effect>) {
        self.redraw_generation += 1;
        fx.push(Effect::Schedule {
            timer: Timer::Redraw(self.redraw_generation),
            after: self.redraw_interval(),
        });
    }

    fn ensure_watchdog(&mut self, fx: &mut Vec<Effect>) {
        if !self.watchdog_ticking {
            self.watchdog_ticking = true;
            fx.push(Effect::Schedule {
                timer: Timer::Watchdog,
                after: self.cfg.watchdog_interval,
            });
        }
    }

    fn on_catalog_fetched(&mut self, result: Result<Vec<String>, String>, fx: &mut Vec<Effect>) {
        let fresh = match result {
            Ok(ids) => ids,
            Err(e) => {
                warn!(target: "tui", "catalog refresh failed, keeping {} models: {}", self.catalog.len(), e);
                return;
            }
        };
        if !self.catalog.replace(fresh) {
            info!(target: "tui", "catalog refresh empty, keeping {} models", self.catalog.len());
            return;
        }
        info!(target: "tui", "catalog refreshed: {} models", self.catalog.len());
        if !self.catalog.contains(&self.selected_model) {
            let fallback = if self.catalog.contains(&self.cfg.default_model) {
                self.cfg.default_model.clone()
            } else {
                self.catalog.ids()[0].clone()
            };
            info!(target: "tui", "selected model {} gone, falling back to {}", self.selected_model, fallback);
            self.selected_model = fallback;
        }
        if let Some(p) = self.picker.as_mut() {
            p.refilter_following(&self.catalog);
        }
        fx.push(Effect::Redraw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::filter_models;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(ch: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
    }

    fn type_str(app: &mut App, s: &str, now: Instant) {
        for ch in s.chars() {
            app.update(key(KeyCode::Char(ch)), now);
        }
    }

    fn app() -> App {
        App::new(SessionConfig::default(), None, None).with_image_resolver(|_| None)
    }

    fn submit(app: &mut App, text: &str, now: Instant) -> Option<ChatRequest> {
        type_str(app, text, now);
        app.update(key(KeyCode::Enter), now)
            .into_iter()
            .find_map(|e| match e {
                Effect::SendChat(req) => Some(req),
                _ => None,
            })
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn start_schedules_both_timers() {
        let mut a = app();
        let fx = a.start(Instant::now());
        assert!(fx.contains(&Effect::Schedule { timer: Timer::Redraw(1), after: a.cfg.idle_tick }));
        assert!(fx.contains(&Effect::Schedule { timer: Timer::Watchdog, after: a.cfg.watchdog_interval }));
        assert!(fx.contains(&Effect::Redraw));
    }

    #[test]
    fn submit_and_complete_appends_both_turns() {
        let mut a = app();
        let t0 = Instant::now();
        a.start(t0);
        let req = submit(&mut a, "hello", t0).expect("request issued");
        assert_eq!(req.model, "anthropic/claude-3.7-sonnet");
        assert_eq!(req.messages.last(), Some(&Message::user("hello")));
        assert!(a.is_waiting());
        assert!(a.input.is_blank());

        a.update(
            AppEvent::Completed { id: req.id, content: Some("hi there".into()), usage: None },
            t0 + secs(1),
        );
        assert_eq!(
            a.conversation.visible(),
            &[Message::user("hello"), Message::assistant("hi there")]
        );
        assert!(!a.is_waiting());
    }

    #[test]
    fn streamed_partials_become_the_reply() {
        let mut a = app();
        let t0 = Instant::now();
        let req = submit(&mut a, "hello", t0).unwrap();
        for (i, part) in ["hi", "hi th", "hi there"].iter().enumerate() {
            let fx = a.update(
                AppEvent::Partial { id: req.id, content: part.to_string() },
                t0 + Duration::from_millis(10 * i as u64),
            );
            assert!(fx.contains(&Effect::Redraw));
        }
        assert_eq!(a.stream.as_ref().map(|s| s.buffer.as_str()), Some("hi there"));
        let usage = Usage { prompt: 5, completion: 2 };
        a.update(AppEvent::Completed { id: req.id, content: None, usage: Some(usage) }, t0 + secs(1));
        assert_eq!(a.conversation.visible().last(), Some(&Message::assistant("hi there")));
        assert_eq!(a.usage, Some(usage));
    }

    #[test]
    fn silence_past_the_bound_times_out() {
        let mut a = app();
        let t0 = Instant::now();
        submit(&mut a, "hello", t0).unwrap();

        a.update(AppEvent::Tick(Timer::Watchdog), t0 + secs(60));
        assert!(a.is_waiting());

        let fx = a.update(AppEvent::Tick(Timer::Watchdog), t0 + secs(91));
        assert!(!a.is_waiting());
        let last = a.conversation.visible().last().unwrap();
        assert_eq!(last.role, luke_core::llm::Role::System);
        assert!(last.content.contains("timed out"));
        assert!(a.last_error.is_some());
        assert!(fx.contains(&Effect::Schedule { timer: Timer::Watchdog, after: secs(5) }));
    }

    #[test]
    fn progress_keeps_the_watchdog_quiet() {
        let mut a = app();
        let t0 = Instant::now();
        let req = submit(&mut a, "hello", t0).unwrap();
        a.update(AppEvent::Partial { id: req.id, content: "x".into() }, t0 + secs(60));
        a.update(AppEvent::Tick(Timer::Watchdog), t0 + secs(91));
        assert!(a.is_waiting());
        a.update(AppEvent::Tick(Timer::Watchdog), t0 + secs(151));
        assert!(!a.is_waiting());
    }

    #[test]
    fn second_submission_is_rejected_while_waiting() {
        let mut a = app();
        let t0 = Instant::now();
        let first = submit(&mut a, "one", t0).unwrap();
        assert!(submit(&mut a, "two", t0).is_none());
        assert_eq!(a.input.text(), "two");
        assert_eq!(a.stream.as_ref().map(|s| s.id), Some(first.id));
        assert_eq!(a.conversation.visible().len(), 1);
    }

    #[test]
    fn blank_input_is_not_submitted() {
        let mut a = app();
        assert!(submit(&mut a, "   ", Instant::now()).is_none());
        assert!(!a.is_waiting());
    }

    #[test]
    fn late_events_do_not_touch_a_newer_request() {
        let mut a = app();
        let t0 = Instant::now();
        let old = submit(&mut a, "one", t0).unwrap();
        a.update(AppEvent::Tick(Timer::Watchdog), t0 + secs(95));
        let new = submit(&mut a, "two", t0 + secs(96)).unwrap();
        assert_ne!(old.id, new.id);
        let before = a.conversation.clone();

        a.update(AppEvent::Partial { id: old.id, content: "stale".into() }, t0 + secs(97));
        a.update(AppEvent::Completed { id: old.id, content: Some("stale".into()), usage: None }, t0 + secs(97));
        a.update(AppEvent::Failed { id: old.id, error: "stale".into() }, t0 + secs(97));

        assert_eq!(a.conversation, before);
        let s = a.stream.as_ref().unwrap();
        assert_eq!(s.id, new.id);
        assert!(s.buffer.is_empty());
    }

    #[test]
    fn failure_appends_error_and_allows_retry() {
        let mut a = app();
        let t0 = Instant::now();
        let req = submit(&mut a, "one", t0).unwrap();
        a.update(AppEvent::Failed { id: req.id, error: "network error: refused".into() }, t0);
        assert_eq!(
            a.conversation.visible().last(),
            Some(&Message::system("Error: network error: refused"))
        );
        assert_eq!(a.last_error.as_deref(), Some("network error: refused"));
        assert!(submit(&mut a, "again", t0).is_some());
        assert!(a.last_error.is_none());
    }

    #[test]
    fn clear_abandons_the_outstanding_request() {
        let mut a = app();
        let t0 = Instant::now();
        let req = submit(&mut a, "one", t0).unwrap();
        a.update(ctrl('k'), t0);
        assert_eq!(a.conversation.len(), 0);
        assert!(!a.is_waiting());
        a.update(AppEvent::Completed { id: req.id, content: Some("late".into()), usage: None }, t0);
        assert_eq!(a.conversation.len(), 0);
    }

    #[test]
    fn clear_works_inside_the_picker() {
        let mut a = app();
        let t0 = Instant::now();
        a.conversation.push(Message::user("x"));
        a.update(ctrl('f'), t0);
        a.update(ctrl('k'), t0);
        assert_eq!(a.conversation.len(), 0);
        assert_eq!(a.mode(), Mode::PickerNormal);
    }

    #[test]
    fn redraw_ticks_are_throttled() {
        let mut a = app();
        let t0 = Instant::now();
        let req = submit(&mut a, "one", t0).unwrap();
        a.update(AppEvent::Partial { id: req.id, content: "a".into() }, t0);

        let fx = a.update(AppEvent::Tick(Timer::Redraw(1)), t0 + Duration::from_millis(50));
        assert!(!fx.contains(&Effect::Redraw));
        assert!(fx.contains(&Effect::Schedule { timer: Timer::Redraw(1), after: a.cfg.active_tick }));

        let fx = a.update(AppEvent::Tick(Timer::Redraw(1)), t0 + Duration::from_millis(120));
        assert!(fx.contains(&Effect::Redraw));

        a.update(AppEvent::Completed { id: req.id, content: None, usage: None }, t0 + secs(1));
        let fx = a.update(AppEvent::Tick(Timer::Redraw(1)), t0 + secs(2));
        assert_eq!(fx, vec![Effect::Schedule { timer: Timer::Redraw(1), after: a.cfg.idle_tick }]);
    }

    #[test]
    fn submit_from_idle_starts_the_active_cadence_at_once() {
        let mut a = app();
        let t0 = Instant::now();
        a.start(t0);
        type_str(&mut a, "hello", t0);
        let fx = a.update(key(KeyCode::Enter), t0);
        assert!(fx.contains(&Effect::Schedule { timer: Timer::Redraw(2), after: a.cfg.active_tick }));

        // The idle tick scheduled by `start` is still queued; it must not
        // start a second cadence.
        let fx = a.update(AppEvent::Tick(Timer::Redraw(1)), t0 + Duration::from_millis(500));
        assert!(fx.is_empty());

        let fx = a.update(AppEvent::Tick(Timer::Redraw(2)), t0 + Duration::from_millis(50));
        assert_eq!(fx, vec![Effect::Schedule { timer: Timer::Redraw(2), after: a.cfg.active_tick }]);
    }

    #[test]
    fn page_up_stops_at_the_top_of_the_transcript() {
        let mut a = app();
        let t0 = Instant::now();
        a.set_scroll_limit(12);
        for _ in 0..50 {
            a.update(key(KeyCode::PageUp), t0);
        }
        assert_eq!(a.chat_scroll, 12);
        a.update(key(KeyCode::PageDown), t0);
        assert_eq!(a.chat_scroll, 2);

        a.chat_scroll = 12;
        a.set_scroll_limit(5);
        assert_eq!(a.chat_scroll, 5);
    }

    #[test]
    fn escape_keeps_the_search_query() {
        let mut a = app();
        let t0 = Instant::now();
        a.update(ctrl('f'), t0);
        assert_eq!(a.mode(), Mode::PickerNormal);
        a.update(key(KeyCode::Char('/')), t0);
        assert_eq!(a.mode(), Mode::PickerSearch);
        type_str(&mut a, "claude", t0);
        let searched = a.picker.clone().unwrap().filtered;

        a.update(key(KeyCode::Esc), t0);
        assert_eq!(a.mode(), Mode::PickerNormal);
        a.update(key(KeyCode::Char('/')), t0);
        let p = a.picker.as_ref().unwrap();
        assert_eq!(p.query, "claude");
        assert_eq!(p.filtered, searched);
        assert_eq!(p.filtered, filter_models(a.catalog.ids(), "claude"));
    }

    #[test]
    fn search_mode_treats_letters_as_query() {
        let mut a = app();
        let t0 = Instant::now();
        a.update(ctrl('f'), t0);
        a.update(key(KeyCode::Char('i')), t0);
        type_str(&mut a, "jk/i", t0);
        assert_eq!(a.picker.as_ref().unwrap().query, "jk/i");
    }

    #[test]
    fn picker_enter_commits_highlighted_model() {
        let mut a = app();
        let t0 = Instant::now();
        a.update(ctrl('f'), t0);
        a.update(key(KeyCode::Char('/')), t0);
        type_str(&mut a, "open turbo", t0);
        a.update(key(KeyCode::Enter), t0);
        assert_eq!(a.mode(), Mode::Chat);
        assert_eq!(a.selected_model, "openai/gpt-3.5-turbo");
        let req = submit(&mut a, "hey", t0).unwrap();
        assert_eq!(req.model, "openai/gpt-3.5-turbo");
    }

    #[test]
    fn picker_enter_on_empty_list_does_nothing() {
        let mut a = app();
        let t0 = Instant::now();
        a.update(ctrl('f'), t0);
        a.update(key(KeyCode::Char('/')), t0);
        type_str(&mut a, "zzzz", t0);
        a.update(key(KeyCode::Enter), t0);
        assert_eq!(a.mode(), Mode::PickerSearch);
        assert_eq!(a.selected_model, "anthropic/claude-3.7-sonnet");
        a.update(key(KeyCode::Esc), t0);
        a.update(key(KeyCode::Esc), t0);
        assert_eq!(a.mode(), Mode::Chat);
        assert!(a.picker.is_none());
    }

    #[test]
    fn selected_index_stays_in_bounds() {
        let mut a = app();
        let t0 = Instant::now();
        a.update(ctrl('f'), t0);
        let keys = [
            key(KeyCode::PageDown),
            key(KeyCode::PageDown),
            key(KeyCode::Down),
            key(KeyCode::Char('/')),
            key(KeyCode::Char('g')),
            key(KeyCode::PageDown),
            key(KeyCode::Char('p')),
            key(KeyCode::Char('q')),
            key(KeyCode::Up),
            key(KeyCode::Backspace),
            key(KeyCode::Backspace),
            key(KeyCode::Esc),
            key(KeyCode::PageUp),
            key(KeyCode::Char('k')),
            key(KeyCode::Char('j')),
        ];
        for k in keys {
            a.update(k, t0);
            let p = a.picker.as_ref().unwrap();
            if p.filtered.is_empty() {
                assert_eq!(p.selected, 0);
            } else {
                assert!(p.selected < p.filtered.len());
            }
        }
    }

    #[test]
    fn opening_picker_fetches_catalog_only_with_credential() {
        let mut a = app();
        let fx = a.update(ctrl('f'), Instant::now());
        assert!(!fx.iter().any(|e| matches!(e, Effect::FetchCatalog { .. })));

        let mut a = App::new(SessionConfig::default(), Some("sk".into()), None);
        let fx = a.update(ctrl('f'), Instant::now());
        assert!(fx.contains(&Effect::FetchCatalog { credential: Some("sk".into()) }));
    }

    #[test]
    fn empty_or_failed_refresh_keeps_catalog() {
        let mut a = app();
        a.catalog = ModelCatalog::from_ids(["a/1", "a/2", "b/1", "b/2", "c/1"]);
        let before = a.catalog.clone();
        a.update(AppEvent::CatalogFetched(Ok(vec![])), Instant::now());
        assert_eq!(a.catalog, before);
        a.update(AppEvent::CatalogFetched(Err("timeout".into())), Instant::now());
        assert_eq!(a.catalog, before);
    }

    #[test]
    fn refresh_without_selection_falls_back() {
        let mut a = app();
        a.selected_model = "openai/gpt-4o".into();
        a.update(
            AppEvent::CatalogFetched(Ok(vec!["x/one".into(), "anthropic/claude-3.7-sonnet".into()])),
            Instant::now(),
        );
        assert_eq!(a.selected_model, "anthropic/claude-3.7-sonnet");

        a.update(AppEvent::CatalogFetched(Ok(vec!["x/one".into(), "x/two".into()])), Instant::now());
        assert_eq!(a.selected_model, "x/one");
    }

    #[test]
    fn refresh_refilters_an_open_picker() {
        let mut a = app();
        let t0 = Instant::now();
        a.update(ctrl('f'), t0);
        a.update(key(KeyCode::Char('/')), t0);
        type_str(&mut a, "gpt", t0);
        a.update(
            AppEvent::CatalogFetched(Ok(vec!["openai/gpt-5".into(), "anthropic/claude-3.7-sonnet".into()])),
            t0,
        );
        let p = a.picker.as_ref().unwrap();
        assert_eq!(p.filtered, vec!["openai/gpt-5".to_string()]);
        assert_eq!(p.selected, 0);
    }

    #[test]
    fn key_command_saves_credential_without_a_request() {
        let mut a = app();
        let t0 = Instant::now();
        type_str(&mut a, "/key sk-or-abc", t0);
        let fx = a.update(key(KeyCode::Enter), t0);
        assert!(fx.contains(&Effect::SaveCredential("sk-or-abc".into())));
        assert!(!fx.iter().any(|e| matches!(e, Effect::SendChat(_))));
        assert_eq!(a.credential.as_deref(), Some("sk-or-abc"));
        assert!(a.input.is_blank());
        assert_eq!(a.conversation.visible().len(), 0);
    }

    #[test]
    fn newline_modifier_does_not_submit() {
        let mut a = app();
        let t0 = Instant::now();
        type_str(&mut a, "a", t0);
        a.update(AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)), t0);
        type_str(&mut a, "b", t0);
        assert_eq!(a.input.text(), "a\nb");
        assert!(!a.is_waiting());
    }

    #[test]
    fn quit_is_accepted_everywhere() {
        let mut a = app();
        let t0 = Instant::now();
        submit(&mut a, "one", t0).unwrap();
        a.update(ctrl('f'), t0);
        a.update(key(KeyCode::Char('/')), t0);
        let fx = a.update(ctrl('c'), t0);
        assert_eq!(fx, vec![Effect::Quit]);
        assert!(a.should_quit);
    }
}

use std::time::{Duration, Instant};

use luke_core::llm::Message;
use tracing::{debug, info, warn};

use super::{App, Effect, RequestId, Timer};
use crate::strings;

/// The assistant turn currently being received. At most one exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamState {
    pub id: RequestId,
    /// Cumulative reply text so far.
    pub buffer: String,
    pub started_at: Instant,
    pub last_progress_at: Instant,
}

impl StreamState {
    pub fn begin(id: RequestId, now: Instant) -> Self {
        Self {
            id,
            buffer: String::new(),
            started_at: now,
            last_progress_at: now,
        }
    }

    pub fn silent_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_progress_at)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Token counts reported for the last reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt: u32,
    pub completion: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt.saturating_add(self.completion)
    }
}

impl App {
    pub(super) fn redraw_interval(&self) -> Duration {
        if self.stream.is_some() {
            self.cfg.active_tick
        } else {
            self.cfg.idle_tick
        }
    }

    /// Takes the stream if `id` is the one outstanding; anything else is late.
    fn claim(&mut self, id: RequestId, what: &str) -> Option<StreamState> {
        match &self.stream {
            Some(s) if s.id == id => self.stream.take(),
            _ => {
                debug!(target: "tui", "discarding late {} for request {}", what, id);
                None
            }
        }
    }

    pub(super) fn on_partial(&mut self, id: RequestId, content: String, now: Instant, fx: &mut Vec<Effect>) {
        match self.stream.as_mut() {
            Some(s) if s.id == id => {
                s.buffer = content;
                s.last_progress_at = now;
                fx.push(Effect::Redraw);
            }
            _ => debug!(target: "tui", "discarding late partial for request {}", id),
        }
    }

    pub(super) fn on_completed(
        &mut self,
        id: RequestId,
        content: Option<String>,
        usage: Option<Usage>,
        now: Instant,
        fx: &mut Vec<Effect>,
    ) {
        let Some(s) = self.claim(id, "completion") else {
            return;
        };
        let elapsed = s.elapsed(now);
        let text = content.unwrap_or(s.buffer);
        info!(
            target: "tui",
            "request {} finished: {} chars in {:?}",
            id,
            text.len(),
            elapsed
        );
        self.conversation.push(Message::assistant(text));
        if usage.is_some() {
            self.usage = usage;
        }
        self.chat_scroll = 0;
        fx.push(Effect::Redraw);
    }

    pub(super) fn on_failed(&mut self, id: RequestId, error: String, fx: &mut Vec<Effect>) {
        if self.claim(id, "failure").is_none() {
            return;
        }
        warn!(target: "tui", "request {} failed: {}", id, error);
        self.conversation.push(Message::system(strings::error_message(&error)));
        self.last_error = Some(error);
        fx.push(Effect::Redraw);
    }

    pub(super) fn on_redraw_tick(&mut self, generation: u64, now: Instant, fx: &mut Vec<Effect>) {
        if generation != self.redraw_generation {
            debug!(target: "tui", "dropping superseded redraw tick {}", generation);
            return;
        }
        if self.stream.is_some() {
            let due = self
                .last_redraw_at
                .map_or(true, |at| now.saturating_duration_since(at) >= self.cfg.redraw_throttle);
            if due {
                fx.push(Effect::Redraw);
            }
        }
        fx.push(Effect::Schedule {
            timer: Timer::Redraw(generation),
            after: self.redraw_interval(),
        });
    }

    pub(super) fn on_watchdog_tick(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        let expired = self
            .stream
            .as_ref()
            .is_some_and(|s| s.silent_for(now) >= self.cfg.request_timeout);
        if expired {
            if let Some(s) = self.stream.take() {
                warn!(
                    target: "tui",
                    "request {} timed out after {:?} without progress",
                    s.id,
                    s.silent_for(now)
                );
            }
            self.conversation.push(Message::system(strings::TIMEOUT_MESSAGE));
            self.last_error = Some(strings::TIMEOUT_MESSAGE.to_string());
            fx.push(Effect::Redraw);
        }
        fx.push(Effect::Schedule {
            timer: Timer::Watchdog,
            after: self.cfg.watchdog_interval,
        });
    }
}

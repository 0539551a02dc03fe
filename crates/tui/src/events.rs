use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use luke_core::config::{ConfigStore, KEY_OPENROUTER_API_KEY};
use ratatui::{backend::Backend, Terminal};
use tokio::runtime::Handle;
use tracing::{error, info};

use crate::app::{App, AppEvent, Effect, Timer};
use crate::markdown::MarkdownRender;
use crate::tasks::Services;
use crate::ui;

const MAX_POLL: Duration = Duration::from_millis(100);

/// Pending self-scheduled ticks, fired in deadline order.
#[derive(Default)]
struct TimerQueue {
    pending: Vec<(Instant, Timer)>,
}

impl TimerQueue {
    fn schedule(&mut self, at: Instant, timer: Timer) {
        self.pending.push((at, timer));
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(at, _)| *at).min()
    }

    fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (at, _))| *at <= now)
            .min_by_key(|(_, (at, _))| *at)
            .map(|(i, _)| i)?;
        Some(self.pending.swap_remove(idx).1)
    }
}

/// Everything the loop needs besides the session itself.
pub struct Runner<'a, S: ConfigStore> {
    pub store: S,
    pub services: Services,
    pub runtime: Handle,
    pub markdown: &'a dyn MarkdownRender,
}

struct Loop<'a, S: ConfigStore> {
    ctx: Runner<'a, S>,
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
    timers: TimerQueue,
    dirty: bool,
    quit: bool,
}

impl<S: ConfigStore> Loop<'_, S> {
    fn dispatch(&mut self, app: &mut App, event: AppEvent) {
        let fx = app.update(event, Instant::now());
        self.apply(app, fx);
    }

    fn apply(&mut self, app: &mut App, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Redraw => self.dirty = true,
                Effect::Schedule { timer, after } => self.timers.schedule(Instant::now() + after, timer),
                Effect::SendChat(req) => {
                    self.ctx.services.spawn_chat(&self.ctx.runtime, req, self.tx.clone());
                }
                Effect::FetchCatalog { credential } => {
                    self.ctx
                        .services
                        .spawn_catalog_fetch(&self.ctx.runtime, credential, self.tx.clone());
                }
                Effect::SaveCredential(key) => {
                    if let Err(e) = self.ctx.store.set(KEY_OPENROUTER_API_KEY, &key) {
                        error!(target: "tui", "saving credential failed: {}", e);
                        let fx = app.update(AppEvent::CredentialSaveFailed(e.to_string()), Instant::now());
                        queue.extend(fx);
                    } else {
                        info!(target: "tui", "credential saved");
                    }
                    match self.ctx.services.rekey(key) {
                        Ok(s) => self.ctx.services = s,
                        Err(e) => error!(target: "tui", "rebuilding clients failed: {:#}", e),
                    }
                    self.dirty = true;
                }
                Effect::Quit => self.quit = true,
            }
        }
    }

    fn poll_timeout(&self) -> Duration {
        self.timers
            .next_deadline()
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(MAX_POLL)
            .min(MAX_POLL)
    }
}

pub fn run<B: Backend, S: ConfigStore>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    ctx: Runner<'_, S>,
) -> anyhow::Result<()> {
    let (tx, rx) = channel();
    let mut lp = Loop {
        ctx,
        tx,
        rx,
        timers: TimerQueue::default(),
        dirty: true,
        quit: false,
    };
    let fx = app.start(Instant::now());
    lp.apply(app, fx);

    loop {
        if lp.dirty {
            let md = lp.ctx.markdown;
            let mut scroll_limit = 0;
            terminal.draw(|f| scroll_limit = ui::draw(f, app, md))?;
            app.set_scroll_limit(scroll_limit);
            lp.dirty = false;
        }

        while let Ok(ev) = lp.rx.try_recv() {
            lp.dispatch(app, ev);
        }
        while let Some(timer) = lp.timers.pop_due(Instant::now()) {
            lp.dispatch(app, AppEvent::Tick(timer));
        }
        if lp.quit {
            break;
        }

        if event::poll(lp.poll_timeout())? {
            let ev = match event::read()? {
                Event::Key(key) => Some(AppEvent::Key(key)),
                Event::Paste(s) => Some(AppEvent::Paste(s)),
                Event::Resize(_, _) => Some(AppEvent::Resize),
                _ => None,
            };
            if let Some(ev) = ev {
                lp.dispatch(app, ev);
            }
        }
        if lp.quit {
            break;
        }
    }
    info!(target: "tui", "session ended");
    Ok(())
}

mod app;
mod config;
mod events;
mod logging;
mod markdown;
mod strings;
mod tasks;
mod terminal;
mod theme;
mod ui;

use anyhow::{Context, Result};
use tracing::info;

use config::{JsonConfigStore, SessionConfig, Settings};
use markdown::TermMarkdown;
use tasks::Services;
use terminal::TerminalGuard;

fn main() -> Result<()> {
    let _log_guard = logging::init();

    let store = JsonConfigStore::open_default().context("open config store")?;
    let settings = Settings::resolve(&store);
    info!(
        target: "tui",
        "starting: credential={} unified={}",
        settings.credential.is_some(),
        settings.unified_endpoint.is_some()
    );
    let services = Services::build(settings.credential.clone(), settings.unified_endpoint.clone())
        .context("build backend clients")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("start async runtime")?;

    let mut app = app::App::new(SessionConfig::default(), settings.credential, settings.default_model);
    let result = {
        let mut term = TerminalGuard::new()?;
        let runner = events::Runner {
            store,
            services,
            runtime: runtime.handle().clone(),
            markdown: &TermMarkdown,
        };
        events::run(&mut term.terminal, &mut app, runner)
    };
    // In-flight requests are abandoned, not awaited.
    runtime.shutdown_background();
    result
}

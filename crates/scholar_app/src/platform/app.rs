use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use scholar_core::{update, AppState, Effect, Msg, SearchState};
use scholar_engine::EngineHandle;
use scholar_logging::{scholar_debug, scholar_info, scholar_warn};

use super::effects::EffectRunner;
use super::ui::{self, Command};
use crate::config::AppConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the controller state and feeds it messages one at a time.
struct App {
    state: AppState,
    runner: EffectRunner,
}

impl App {
    fn new(config: &AppConfig, state: AppState) -> anyhow::Result<Self> {
        let engine =
            EngineHandle::new(config.backend_settings()).context("failed to start engine")?;
        Ok(Self {
            state,
            runner: EffectRunner::new(engine),
        })
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    /// Handles at most one engine event. Returns whether one arrived.
    fn pump(&mut self, timeout: Duration) -> bool {
        match self.runner.next_msg(timeout) {
            Some(msg) => {
                self.dispatch(msg);
                true
            }
            None => false,
        }
    }

    /// Pumps until nothing is outstanding. Returns false if `deadline` passed first.
    fn settle(&mut self, deadline: Instant) -> bool {
        while !self.state.is_settled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.pump((deadline - now).min(POLL_INTERVAL));
        }
        true
    }

    fn render_if_dirty(&mut self) -> Option<String> {
        let view = self.state.view();
        self.state
            .consume_dirty()
            .then(|| ui::render::render(&view))
    }
}

pub fn run_interactive(config: &AppConfig) -> anyhow::Result<()> {
    let category = config.category()?;
    let state = AppState::with_settings(config.core_settings(), category);
    let mut app = App::new(config, state)?;

    let lines = spawn_stdin_reader();
    println!("{}", ui::commands::HELP);
    app.dispatch(Msg::Started);
    app.dispatch(Msg::SearchSubmitted);

    loop {
        match lines.try_recv() {
            Ok(line) => match ui::commands::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Help) => println!("{}", ui::commands::HELP),
                Ok(command) => {
                    if let Some(msg) = command.into_msg() {
                        app.dispatch(msg);
                    }
                }
                Err(err) => println!("{err}"),
            },
            Err(TryRecvError::Disconnected) => {
                scholar_debug!("stdin closed");
                break;
            }
            Err(TryRecvError::Empty) => {
                app.pump(POLL_INTERVAL);
            }
        }

        if let Some(screen) = app.render_if_dirty() {
            print!("{screen}");
            io::stdout().flush().context("failed to write to stdout")?;
        }
    }

    scholar_info!("Interactive session finished");
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Runs one search, waits for the controller to settle, and prints the page.
pub fn run_search(config: &AppConfig, search: SearchState) -> anyhow::Result<()> {
    let page = search.page;
    let state = AppState::with_search(config.core_settings(), search);
    let mut app = App::new(config, state)?;
    let budget = config.request_timeout() * 3;

    app.dispatch(Msg::SearchSubmitted);
    if !app.settle(Instant::now() + budget) {
        scholar_warn!("Search did not settle within {:?}", budget);
    }

    if page > 1 {
        let total_pages = app.state.pagination().total_pages;
        if page > total_pages {
            scholar_warn!("Page {} requested but only {} available", page, total_pages);
        } else {
            app.dispatch(Msg::PageRequested(page));
            if !app.settle(Instant::now() + budget) {
                scholar_warn!("Page {} did not settle within {:?}", page, budget);
            }
        }
    }

    print!("{}", ui::render::render(&app.state.view()));
    Ok(())
}

/// Runs one health check and prints the repository statistics.
pub fn run_health(config: &AppConfig) -> anyhow::Result<()> {
    let app = App::new(config, AppState::with_settings(config.core_settings(), config.category()?))?;
    app.runner.enqueue(vec![Effect::CheckHealth]);

    let deadline = Instant::now() + config.request_timeout() + Duration::from_secs(1);
    while Instant::now() < deadline {
        match app.runner.next_msg(POLL_INTERVAL) {
            Some(Msg::HealthLoaded(Ok(stats))) => {
                println!("{}", ui::render::render_stats(&stats));
                return Ok(());
            }
            Some(Msg::HealthLoaded(Err(failure))) => bail!("health check failed: {failure}"),
            Some(other) => scholar_debug!("Ignoring {:?} while waiting for health", other),
            None => {}
        }
    }
    bail!("health check timed out")
}

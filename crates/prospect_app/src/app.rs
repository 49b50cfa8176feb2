use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use engine_logging::{engine_debug, engine_info};
use prospect_core::{update, AppState, AppViewModel, JobInput, JobStatus, Msg};
use prospect_engine::{EngineHandle, LoginRefresher, TokenManager};

use crate::commands::{parse_command, UserCommand, HELP};
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::persistence;
use crate::render;

/// How long a terminal job waits for outstanding control calls before exit.
const CONTROL_GRACE: Duration = Duration::from_secs(2);

pub struct RunOptions {
    pub input: JobInput,
    pub save: bool,
}

pub struct RunSummary {
    pub status: Option<JobStatus>,
    pub saved_to: Option<PathBuf>,
}

struct App {
    state: AppState,
    runner: EffectRunner,
    last_status: String,
}

impl App {
    fn dispatch_msg(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = state;

        let feedback = self.runner.enqueue(effects);
        if let Some(view) = view {
            self.render(&view);
        }
        for msg in feedback {
            self.dispatch_msg(msg);
        }
    }

    fn render(&mut self, view: &AppViewModel) {
        let line = render::status_line(view);
        if line != self.last_status {
            println!("{line}");
            self.last_status = line;
        }
    }

    fn handle_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::Dispatch(msg) => {
                let reorders = matches!(msg, Msg::SortChanged(_) | Msg::SearchChanged(_));
                self.dispatch_msg(msg);
                if reorders {
                    self.print_table();
                }
            }
            UserCommand::List => self.print_table(),
            UserCommand::Help => println!("{HELP}"),
            UserCommand::Quit => {
                engine_info!("Quit requested");
                if self.is_active() {
                    self.dispatch_msg(Msg::TerminateRequested);
                }
            }
            UserCommand::Invalid(message) => println!("{message}. {HELP}"),
        }
    }

    fn print_table(&self) {
        let view = self.state.view();
        println!("{}", render::table(&view.rows));
    }

    fn is_active(&self) -> bool {
        self.state
            .job_status()
            .is_some_and(|status| !status.is_terminal())
    }
}

fn token_manager(config: &AppConfig) -> Result<Arc<TokenManager>> {
    let settings = config.engine_settings()?;
    let manager = match config.login() {
        Some((login_url, open_id, tenant_key)) => {
            let refresher = LoginRefresher::new(&settings, login_url, open_id, tenant_key)
                .context("configuring login")?;
            TokenManager::new(config.token.clone(), Arc::new(refresher))
        }
        None => TokenManager::fixed(config.token.clone()),
    };
    Ok(Arc::new(manager))
}

/// Reads stdin lines on a thread; the thread ends quietly at EOF.
fn spawn_stdin_reader() -> mpsc::Receiver<UserCommand> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(command) = parse_command(&line) {
                if tx.send(command).is_err() {
                    break;
                }
            }
        }
        engine_debug!("stdin closed");
    });
    rx
}

/// Starts the job, follows it until it ends and optionally saves the result.
pub fn run_job(config: &AppConfig, options: RunOptions) -> Result<RunSummary> {
    let engine = EngineHandle::new(config.engine_settings()?, token_manager(config)?)
        .context("starting engine")?;
    let mut app = App {
        state: AppState::new(),
        runner: EffectRunner::new(engine),
        last_status: String::new(),
    };
    let commands = spawn_stdin_reader();
    let tick = config.tick();

    println!("{HELP}");
    app.dispatch_msg(Msg::StartRequested(options.input));

    let mut terminal_since: Option<Instant> = None;
    loop {
        while let Ok(command) = commands.try_recv() {
            app.handle_command(command);
        }

        match app.runner.next_msg(tick) {
            Some(msg) => {
                app.dispatch_msg(msg);
                while let Some(msg) = app.runner.try_next_msg() {
                    app.dispatch_msg(msg);
                }
            }
            None => app.dispatch_msg(Msg::Tick),
        }

        if app.is_active() {
            continue;
        }
        let since = *terminal_since.get_or_insert_with(Instant::now);
        if !app.runner.has_pending_calls() || since.elapsed() >= CONTROL_GRACE {
            break;
        }
    }
    let view = app.state.view();
    println!("{}", render::table(&view.rows));
    io::stdout().flush().ok();

    let mut saved_to = None;
    if options.save {
        if let (Some(snapshot), Some(job_key)) = (app.state.snapshot(), app.state.job_key()) {
            let store = persistence::store(&config.output_dir);
            saved_to = Some(persistence::save_snapshot(&store, &snapshot, job_key)?);
        }
    }

    Ok(RunSummary {
        status: app.state.job_status(),
        saved_to,
    })
}

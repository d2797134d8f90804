//! nav-trace: command-line harness for the console navigation and session
//! core.
//!
//! ## Subcommands
//!
//! - `parse`: Parse a history token and print its segments and window title
//! - `simulate`: Run a line-oriented session script from stdin and trace
//!   every transition

use std::io::{self, BufRead};

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use console_core::{
    load_config, view_path_title, ConsoleContext, ConsoleError, ContentOutcome, LoginOutcome,
    Message, SessionService, Shell, ViewPath, ViewRegistry,
};
use console_core::session::{MemorySessionStore, ResolvedIdentity, ServiceFailure, Subject};
use console_core::views::{BookmarkableView, ContentView, SimpleContainer};
use console_session_protocol::{parse_status_body, CheckStatusOptions, StatusBody};

#[derive(Parser)]
#[command(name = "nav-trace")]
#[command(about = "Console navigation and session trace harness")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a history token and print its segments and window title
    Parse {
        /// History token, e.g. Resource/10001/Operations
        #[arg(value_name = "TOKEN")]
        token: String,
    },

    /// Run a session script from stdin (see --help for the command set)
    ///
    /// Script commands, one per line:
    ///   status <body>     set the scripted status-endpoint body
    ///   login [user]      attempt a login
    ///   nav <token>       dispatch a history change
    ///   goto <token>      programmatic navigation (sticky suffixes apply)
    ///   notify <text>     refresh the current view with a queued message
    ///   logout            log out
    ///   tick <ms>         advance the clock and fire due timers
    Simulate,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { token } => run_parse(&token),
        Commands::Simulate => run_simulate(),
    };

    if let Err(err) = result {
        error!(error = %err, "nav-trace failed");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_parse(token: &str) -> Result<(), ConsoleError> {
    let config = load_config();
    let path = ViewPath::parse(token)?;

    println!("token:  {}", path.token());
    println!("title:  {}", view_path_title(&config.product_name, &path));
    for (index, segment) in path.segments().iter().enumerate() {
        match segment.key() {
            Some(key) => println!("seg[{}]: {} (key {})", index, segment.name(), key),
            None => println!("seg[{}]: {}", index, segment.name()),
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────
// Simulation doubles
// ─────────────────────────────────────────────────────────────────────────

/// Session service whose responses are scripted by `status` lines.
struct ScriptedService {
    body: StatusBody,
}

impl SessionService for ScriptedService {
    fn check_status(
        &mut self,
        _options: &CheckStatusOptions,
    ) -> Result<StatusBody, ServiceFailure> {
        Ok(self.body.clone())
    }

    fn session_timeout_ms(&mut self) -> Result<u64, ServiceFailure> {
        Ok(console_core::SESSION_TIMEOUT_FLOOR_MS)
    }

    fn logout(&mut self, session_id: &str) -> Result<(), ServiceFailure> {
        println!("  server: logout {}", session_id);
        Ok(())
    }

    fn resolve_external_identity(
        &mut self,
        subject: &Subject,
        _password: &str,
    ) -> Result<ResolvedIdentity, ServiceFailure> {
        Ok(ResolvedIdentity {
            subject: subject.clone(),
            is_new_user: false,
        })
    }
}

/// Shell that traces every surface update to stdout.
struct TraceShell;

impl Shell for TraceShell {
    fn set_window_title(&mut self, title: &str) {
        println!("  title:  {}", title);
    }

    fn push_history(&mut self, token: &str, navigate: bool) {
        println!("  history: {} (navigate={})", token, navigate);
    }

    fn alert(&mut self, text: &str) {
        println!("  alert:  {}", text);
    }
}

/// Registry that echoes every requested view synchronously, so scripts can
/// navigate anywhere without declaring screens up front.
struct EchoRegistry;

struct EchoView {
    name: String,
}

impl ContentView for EchoView {
    fn view_name(&self) -> &str {
        &self.name
    }

    fn as_bookmarkable(&mut self) -> Option<&mut dyn BookmarkableView> {
        Some(self)
    }
}

impl BookmarkableView for EchoView {
    fn render_view(&mut self, path: ViewPath) -> Result<(), ConsoleError> {
        println!("  render: {} <- {}", self.name, path.token());
        Ok(())
    }
}

impl ViewRegistry for EchoRegistry {
    fn create_content(&mut self, view_name: &str) -> ContentOutcome {
        ContentOutcome::Ready(Box::new(EchoView {
            name: view_name.to_string(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Script loop
// ─────────────────────────────────────────────────────────────────────────

fn run_simulate() -> Result<(), ConsoleError> {
    let config = load_config();
    let mut context = ConsoleContext::new(
        config,
        ScriptedService {
            body: StatusBody::Empty,
        },
        Box::new(MemorySessionStore::new()),
        Box::new(EchoRegistry),
        Box::new(SimpleContainer::new()),
        Box::new(TraceShell),
    );

    let mut now_ms: u64 = 0;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|err| ConsoleError::Io {
            context: "reading script".to_string(),
            source: err,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        println!("> {}", line);
        if let Err(err) = run_command(&mut context, line, &mut now_ms) {
            println!("  error:  {}", err);
        }
        report(&context, now_ms);
    }
    Ok(())
}

fn run_command(
    context: &mut ConsoleContext<ScriptedService>,
    line: &str,
    now_ms: &mut u64,
) -> Result<(), ConsoleError> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "status" => {
            let body = if rest == "empty" { "" } else { rest };
            context.session_mut().service_mut().body = parse_status_body(body)?;
            Ok(())
        }
        "login" => {
            let user = if rest.is_empty() { None } else { Some(rest) };
            let outcome = context.login(user, None, *now_ms)?;
            match outcome {
                LoginOutcome::LoggedIn { subject, .. } => {
                    println!("  login:  subject {} in session {}", subject.id, subject.session_id);
                    context.build_core_ui("", *now_ms)?;
                }
                LoginOutcome::Registering { subject } => {
                    println!("  login:  subject {} needs registration", subject.id)
                }
                LoginOutcome::ShowLogin { reason } => println!("  login:  prompt ({:?})", reason),
                LoginOutcome::ServerInitializing => println!("  login:  server initializing"),
            }
            Ok(())
        }
        "nav" => context.handle_history_change(rest, *now_ms),
        "goto" => context.go_to_view(rest, None, false, *now_ms),
        "notify" => {
            let token = context.nav().current_token().unwrap_or_default();
            context.go_to_view(&token, Some(Message::info(rest.to_string())), true, *now_ms)
        }
        "logout" => context.logout(*now_ms),
        "tick" => {
            let delta: u64 = rest.parse().map_err(|_| {
                ConsoleError::service("script", format!("bad tick amount {:?}", rest))
            })?;
            *now_ms += delta;
            let signals = context.tick(*now_ms)?;
            for signal in signals {
                println!("  signal: {:?}", signal);
            }
            Ok(())
        }
        other => Err(ConsoleError::service(
            "script",
            format!("unknown command {:?}", other),
        )),
    }
}

fn report(context: &ConsoleContext<ScriptedService>, now_ms: u64) {
    let state = context.session().state();
    let token = context
        .nav()
        .current_token()
        .unwrap_or_else(|| "(none)".to_string());
    let deadline = context
        .next_deadline()
        .map(|at| format!("{}ms", at.saturating_sub(now_ms)))
        .unwrap_or_else(|| "-".to_string());
    println!("  [t={}ms state={:?} view={} next-timer={}]", now_ms, state, token, deadline);
}

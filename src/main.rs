// Planman - plan quality gate for coding-agent hooks
// Main entry point

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};

use planman::config::load_config;
use planman::hooks::{run_guarded, run_hook, HookEvent};
use planman::planning::{detector, DETECTION_THRESHOLD};
use planman::session::FileSessionStore;

#[derive(Parser)]
#[command(
    name = "planman",
    version,
    about = "Plan quality gate: scores agent plans and sends weak ones back for revision"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as a host hook (reads the hook payload from stdin)
    Hook {
        #[command(subcommand)]
        event: HookCommand,
    },
    /// Remove stored session state
    Clear {
        /// Only this session's state and markers
        #[arg(long)]
        session: Option<String>,
    },
    /// List stored sessions
    Sessions,
    /// Score text from stdin with the local plan classifier
    Detect {
        /// Treat the text as written in plan mode
        #[arg(long)]
        plan_mode: bool,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum HookCommand {
    /// After a tool call; tracks plan files
    PostToolUse,
    /// Before plan mode ends; evaluates the plan file
    PreExitPlan,
    /// After the agent's turn; evaluates inline plans
    Stop,
}

impl From<HookCommand> for HookEvent {
    fn from(command: HookCommand) -> Self {
        match command {
            HookCommand::PostToolUse => HookEvent::PostToolUse,
            HookCommand::PreExitPlan => HookEvent::PreExitPlan,
            HookCommand::Stop => HookEvent::Stop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hook { event } => {
            run_hook_command(event.into()).await;
            Ok(())
        }
        Commands::Clear { session } => clear(session.as_deref()),
        Commands::Sessions => sessions(),
        Commands::Detect { plan_mode } => detect(plan_mode),
    }
}

/// Hooks always exit 0; anything that goes wrong means "allow".
async fn run_hook_command(event: HookEvent) {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        eprintln!("[planman] warning: failed to read hook input: {e}");
        raw.clear();
    }

    let output = run_guarded(run_hook(event, &raw)).await;
    if let Some(json) = output.to_json() {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(json.as_bytes());
        let _ = stdout.flush();
    }
}

fn store() -> Result<FileSessionStore> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config = load_config(Some(&cwd));
    planman::logging::init(&config, Some(&cwd));
    Ok(FileSessionStore::new(config.state_dir()))
}

fn clear(session: Option<&str>) -> Result<()> {
    let store = store()?;
    let (removed, total) = match session {
        Some(id) => store.clear_session(id),
        None => store.clear_all(),
    };
    println!("Removed {removed}/{total} files.");
    Ok(())
}

fn sessions() -> Result<()> {
    let store = store()?;
    let sessions = store.list_sessions();
    if sessions.is_empty() {
        println!("No active sessions");
        return Ok(());
    }

    for (path, state) in sessions {
        let score = state
            .last_score
            .map_or_else(|| "-".to_string(), |s| format!("{s}/10"));
        let last = state
            .last_eval_time
            .and_then(|t| Utc.timestamp_opt(t as i64, 0).single())
            .map_or_else(
                || "never".to_string(),
                |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
        println!(
            "{}  round {}  score {}  last evaluated {}",
            state.session_id, state.round_count, score, last
        );
        if let Some(plan) = &state.plan_file_path {
            println!("    plan: {}", plan.display());
        }
        println!("    file: {}", path.display());
    }
    Ok(())
}

fn detect(plan_mode: bool) -> Result<()> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;

    let result = detector::score(&text, plan_mode);
    println!("Score: {} (threshold: {})", result.total, DETECTION_THRESHOLD);
    println!("Is plan: {}", result.is_plan());

    let mut signals = result.signals.clone();
    signals.sort_by_key(|s| std::cmp::Reverse(s.weight()));
    for signal in signals {
        println!("  {}: +{}", signal.name(), signal.weight());
    }
    Ok(())
}

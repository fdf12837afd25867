//! `teleop-cli` – Operator console
//!
//! This binary drives a robot from the terminal. It:
//!
//! 1. Loads `~/.teleop/config.toml`, writing a default one on first run.
//! 2. Loads the robot's `hardware.json` when configured.
//! 3. Installs the built-in layout (drive joystick, weapon slider and
//!    direction buttons) on a headless surface.
//! 4. Feeds pointer commands from stdin into the session and prints a
//!    colored status line on every link state change.
//! 5. Intercepts **Ctrl-C** to disconnect cleanly.

mod config;
mod layout;
mod script;

use colored::Colorize;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use teleop_controls::{PointerEvent, RecordingSurface};
use teleop_hal::HardwareConfig;
use teleop_link::Connection;
use teleop_runtime::{Session, SessionStatus};
use teleop_types::LinkState;

use crate::script::Command;

fn main() {
    let _telemetry = teleop_runtime::init_tracing("teleop");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start runtime".red(), e);
            std::process::exit(1);
        }
    };

    runtime.block_on(run(cfg));
}

async fn run(cfg: config::Config) {
    let connection = Connection::from_config(&cfg.link);
    let target = match connection.transport() {
        teleop_link::TransportKind::Polling => cfg.link.control_url(),
        teleop_link::TransportKind::Socket => cfg.link.socket_url(),
    };
    println!("  Robot: {}\n", target.bold());

    let surface = RecordingSurface::new(cfg.surface.width, cfg.surface.height);
    let mut session = Session::new(surface, connection, cfg.session.clone());

    if let Err(e) = layout::install(&mut session) {
        println!("{}: {}", "Layout error".red(), e);
        return;
    }

    if let Some(path) = &cfg.hardware {
        match HardwareConfig::load_from(path) {
            Ok(hardware) => session.set_hardware_config(hardware),
            Err(e) => println!("{}: {}", "Hardware error".red(), e),
        }
    }

    // ── Status line ──────────────────────────────────────────────────────
    let (status_tx, status_rx) = watch::channel(session.status());
    session.on_status_change(move |status| {
        print_status_line(status);
        status_tx.send_replace(status.clone());
    });

    // ── Shutdown ─────────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let ctrlc_tx = Arc::clone(&shutdown_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disconnecting …".yellow().bold());
        ctrlc_tx.send_replace(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Pointer script ───────────────────────────────────────────────────
    let (input_tx, mut input_rx) = mpsc::channel::<PointerEvent>(64);
    let script_shutdown = Arc::clone(&shutdown_tx);
    std::thread::spawn(move || read_script(input_tx, status_rx, script_shutdown));

    println!("  Type {} for a list of commands.\n", "help".bold().cyan());

    session.run(&mut input_rx, &mut shutdown_rx).await;

    let issues = session.issues().entries().to_vec();
    session.dispose();
    if !issues.is_empty() {
        println!("{}", "Issues".bold().underline());
        for issue in issues {
            println!("  {}", issue.to_string().yellow());
        }
    }
    println!("{}", "  ✓ Disconnected.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Stdin reader
// ─────────────────────────────────────────────────────────────────────────────

fn read_script(
    inputs: mpsc::Sender<PointerEvent>,
    status: watch::Receiver<SessionStatus>,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };
        match script::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Command::Pointer(event))) => {
                if inputs.blocking_send(event).is_err() {
                    break;
                }
            }
            Ok(Some(Command::Status)) => print_status_line(&status.borrow()),
            Ok(Some(Command::Help)) => print_help(),
            Ok(Some(Command::Quit)) => {
                println!("{}", "Goodbye.".green());
                shutdown.send_replace(true);
                break;
            }
            Err(e) => println!("{} {}", "Invalid command:".red(), e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_status_line(status: &SessionStatus) {
    let state = match status.state {
        LinkState::Connected => status.state.to_string().green().bold(),
        LinkState::Connecting => status.state.to_string().yellow(),
        LinkState::Error => status.state.to_string().red().bold(),
        LinkState::Disconnected => status.state.to_string().dimmed(),
    };
    let ping = status
        .ping
        .map(|p| format!(" {} ms", p.as_millis()))
        .unwrap_or_default();
    print!("  [{}] {}{}", format!("{:?}", status.transport).to_lowercase(), state, ping.dimmed());
    if status.state == LinkState::Error
        && let Some(error) = &status.last_error
    {
        print!(" – {}", error.to_string().red());
    }
    if !status.issues.is_empty() {
        print!(" ({} issue(s))", status.issues.len().to_string().yellow());
    }
    println!();
}

fn print_help() {
    println!();
    println!("{}", "Pointer commands".bold().underline());
    println!("  {}  – press at (X, Y)", "down <mouse|ID> X Y".bold().cyan());
    println!("  {}  – drag to (X, Y)", "move <mouse|ID> X Y".bold().cyan());
    println!("  {}  – release", "up <mouse|ID> [X Y]".bold().cyan());
    println!("  {}               – link status", "status".bold().cyan());
    println!("  {}          – disconnect and exit", "quit  exit".bold().cyan());
    println!();
}

fn print_banner() {
    println!();
    println!("{}", r#"  ______     __                "#.bold().cyan());
    println!("{}", r#" /_  __/__  / /__ ___  ___     "#.bold().cyan());
    println!("{}", r#"  / / / -_)/ / -_) _ \/ _ \    "#.bold().cyan());
    println!("{}", r#" /_/  \__/_/\__/\___/ .__/    "#.bold().cyan());
    println!("{}", r#"                   /_/          "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "teleop".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Touch teleoperation console");
    println!();
}

//! Parley - terminal chat client
//!
//! Reads lines from stdin and streams replies from a parley relay.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the relay on localhost:3001
//! parley
//!
//! # Another endpoint
//! parley --endpoint http://gpu-box:3001/api/chat
//!
//! # Debug logging (goes to stderr)
//! RUST_LOG=parley_core=debug parley
//! ```

mod commands;
mod input;
mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use parley_core::config::{default_config_path, load_config_from_path, ConfigOverrides};
use parley_core::{ConversationStore, HttpBackend, StoreChange, StoreError};

use commands::{format_list, Command, HELP};
use input::{Input, InterruptAction};
use render::Renderer;

/// Parley - streaming chat in the terminal
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chat endpoint URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "PARLEY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,
}

/// Log to stderr so records do not interleave with the conversation
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Store changes and the renderer that prints them
///
/// Everything is printed from the prompt loop's task, so a reply is fully
/// on screen before the next command's output.
struct Screen {
    renderer: Renderer,
    changes: mpsc::UnboundedReceiver<StoreChange>,
}

impl Screen {
    fn new(changes: mpsc::UnboundedReceiver<StoreChange>) -> Self {
        Self {
            renderer: Renderer::new(),
            changes,
        }
    }

    fn show(&self, change: &StoreChange) {
        if let Some(text) = self.renderer.render(change) {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
    }

    /// Print every change already published
    fn catch_up(&mut self) {
        while let Ok(change) = self.changes.try_recv() {
            self.show(&change);
        }
    }
}

/// Run one turn, printing it as it streams; Ctrl-C cancels it
async fn run_turn(
    store: &mut ConversationStore<HttpBackend>,
    content: String,
    screen: &mut Screen,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) {
    let cancel = CancellationToken::new();
    let turn = store.send_message_with_cancel(content, cancel.clone());
    tokio::pin!(turn);

    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            Some(change) = screen.changes.recv() => screen.show(&change),
            Some(()) = interrupts.recv() => {
                input::on_interrupt(Some(&cancel));
            }
        }
    };
    screen.catch_up();

    match result {
        Ok(_) => {}
        Err(StoreError::TurnInFlight) => eprintln!("A reply is still being generated."),
        Err(e) => eprintln!("{e}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging();

    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(endpoint) = args.endpoint {
        overrides = overrides.with_endpoint(endpoint);
    }
    if let Some(ms) = args.connect_timeout_ms {
        overrides = overrides.with_connect_timeout_ms(ms);
    }
    overrides.apply(&mut config);
    config.validate()?;

    tracing::info!(endpoint = %config.endpoint, source = %config.source(), "Configuration loaded");

    let backend = HttpBackend::from_config(&config)?;
    let mut store = ConversationStore::new(backend).with_title_max_chars(config.title_max_chars);
    let mut screen = Screen::new(store.subscribe());
    let mut interrupts = input::listen_for_interrupts();

    println!("parley {} - talking to {}", env!("CARGO_PKG_VERSION"), config.endpoint);
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        screen.catch_up();

        let line = match input::next_input(&mut lines, &mut interrupts).await? {
            Input::Line(line) => line,
            Input::Closed => break,
            Input::Interrupt => match input::on_interrupt(None) {
                InterruptAction::Exit => break,
                InterruptAction::CancelledTurn => continue,
            },
        };

        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match command {
            Command::New => {
                store.create_conversation();
            }
            Command::List => {
                println!("{}", format_list(store.conversations(), store.active_id()));
            }
            Command::Switch(n) => match store.conversations().get(n - 1).map(|c| c.id.clone()) {
                Some(id) => store.set_active(id),
                None => eprintln!("No conversation {n}; see /list"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Send(content) => {
                run_turn(&mut store, content, &mut screen, &mut interrupts).await;
            }
        }
    }

    screen.catch_up();
    Ok(())
}

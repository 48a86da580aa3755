//! minechat - resilient terminal chat client
//!
//! Reads the live feed, keeps a local history and submits what you type,
//! reconnecting on its own whenever the server goes quiet or drops a
//! connection.
//!
//! # Usage
//!
//! ```bash
//! # Chat (default command); stdin lines are sent, the feed goes to stdout
//! minechat --nickname Vasya
//!
//! # Create an account; the token is saved to the credential store
//! minechat register Vasya
//!
//! # Send a single message and exit
//! minechat --token 4632b104 send "hello there"
//!
//! # List stored accounts
//! minechat accounts
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=minechat_client=debug` to see the wire.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use minechat_client::{
    register_account, resolve_token, send_once, ClientConfig, CredentialStore,
    ReconnectSupervisor, SupervisorExit,
};
use minechat_core::{Nickname, StatusEvent};

/// minechat - resilient chat client with history and auto-reconnect
#[derive(Parser, Debug)]
#[command(name = "minechat", version, about)]
struct Args {
    /// Config file (default: <config_dir>/minechat/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Host of the read-only feed
    #[arg(long, global = true)]
    read_host: Option<String>,

    /// Port of the read-only feed
    #[arg(long, global = true)]
    read_port: Option<u16>,

    /// Host of the write connection
    #[arg(long, global = true)]
    write_host: Option<String>,

    /// Port of the write connection
    #[arg(long, global = true)]
    write_port: Option<u16>,

    /// Session log file
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Credential store file
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Account token (takes precedence over the credential store)
    #[arg(short, long, global = true)]
    token: Option<String>,

    /// Nickname to look up in the credential store
    #[arg(short, long, global = true)]
    nickname: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat interactively (default)
    Run,
    /// Register a new account and save its token
    Register {
        /// Preferred nickname; the server may adjust it
        nickname: String,
    },
    /// Send one message and exit
    Send {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// List accounts in the credential store
    Accounts,
}

impl Args {
    /// Loads the config file, then applies command-line overrides.
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load_or_default(self.config.as_deref())?;

        if let Some(host) = &self.read_host {
            config.read.host = host.clone();
        }
        if let Some(port) = self.read_port {
            config.read.port = port;
        }
        if let Some(host) = &self.write_host {
            config.write.host = host.clone();
        }
        if let Some(port) = self.write_port {
            config.write.port = port;
        }
        if let Some(path) = &self.history {
            config.history_path = path.clone();
        }
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(nickname) = &self.nickname {
            config.nickname = Some(nickname.clone());
        }

        config.validate(self.config.as_deref().unwrap_or(Path::new("<command line>")))?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("minechat=info".parse()?)
                .add_directive("minechat_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.load_config().context("Failed to load configuration")?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_chat(config).await,
        Command::Register { nickname } => {
            let nickname = Nickname::parse(&nickname)?;
            let (status_tx, mut status_rx) = mpsc::unbounded_channel();
            let result = register_account(&config, &nickname, Some(status_tx)).await;
            while let Ok(event) = status_rx.try_recv() {
                report_status(&event);
            }
            let credentials = result.context("Registration failed")?;
            println!("Registered as {}", credentials.nickname);
            println!("Token: {}", credentials.account_hash.expose());
            println!(
                "Saved to {}; next time run: minechat --nickname {:?}",
                config.credentials_path.display(),
                credentials.nickname.as_str()
            );
            Ok(())
        }
        Command::Send { message } => {
            let token = resolve_token(&config).await?;
            let nickname = send_once(&config, &token, &message.join(" "))
                .await
                .context("Failed to send message")?;
            info!(nickname = %nickname, "Message delivered to server");
            Ok(())
        }
        Command::Accounts => {
            let store = CredentialStore::new(&config.credentials_path);
            let accounts = store.load_all().await?;
            if accounts.is_empty() {
                println!("No accounts in {}", store.path().display());
            }
            for credentials in accounts {
                println!("{}", credentials.nickname);
            }
            Ok(())
        }
    }
}

async fn run_chat(config: ClientConfig) -> Result<()> {
    let token = resolve_token(&config).await?;
    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let history_path = config.history_path.clone();
    let (supervisor, handles) = ReconnectSupervisor::start(config, token, cancel_token)
        .await
        .with_context(|| format!("Failed to open history at {}", history_path.display()))?;

    spawn_stdin_reader(handles.outbound_tx);

    let mut display_rx = handles.display_rx;
    tokio::spawn(async move {
        while let Some(line) = display_rx.recv().await {
            println!("{line}");
        }
    });

    let mut status_rx = handles.status_rx;
    tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            report_status(&event);
        }
    });

    match supervisor.run().await {
        SupervisorExit::Shutdown => Ok(()),
        SupervisorExit::AuthRejected => {
            bail!("The server did not accept the token. Check it or register again.")
        }
    }
}

fn report_status(event: &StatusEvent) {
    match status_notice(event) {
        Some(notice) => eprintln!("{notice}"),
        None => debug!(%event, "Status"),
    }
}

/// The stderr line for a status event, if the user should see one.
///
/// Connection changes only go to the log. A rejected token is reported
/// once, as the exit error of `run_chat`.
fn status_notice(event: &StatusEvent) -> Option<String> {
    match event {
        StatusEvent::Connection { .. } | StatusEvent::AuthRejected => None,
        _ => Some(format!("* {event}")),
    }
}

/// Forwards stdin lines to the outbound queue.
///
/// Uses a plain thread: a blocking stdin read cannot be cancelled and would
/// otherwise hold up runtime shutdown.
fn spawn_stdin_reader(outbound_tx: mpsc::UnboundedSender<String>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if outbound_tx.send(line).is_err() {
                break;
            }
        }
        debug!("Stdin closed");
    });
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

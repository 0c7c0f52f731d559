//! CLI entry point for `mailintake`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};

use mailintake::config::{self, Config};
use mailintake::intake::{self, normalize, Intake};
use mailintake::store::memory::MemoryStore;

#[derive(Parser)]
#[command(
    name = "mailintake",
    version,
    about = "Inbound email webhook that files client mail as incidents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the standard location
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// Host address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
        /// JSON array of client documents to seed the store with
        #[arg(long, value_name = "FILE")]
        clients: Option<PathBuf>,
    },
    /// Classify a webhook payload without filing it
    Classify {
        /// Payload JSON file
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = config::load_config_from(path)?;
            config::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
        None => config::load_config(),
    };

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Serve {
            host,
            port,
            clients,
        } => cmd_serve(config, host, port, clients.as_deref()).await,
        Commands::Classify { path, json } => cmd_classify(&path, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "mailintake.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Run the webhook server until interrupted.
async fn cmd_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    clients: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = match clients {
        Some(path) => MemoryStore::from_json_file(path)?,
        None => MemoryStore::new(),
    };

    if config.webhook.secret.is_none() {
        tracing::warn!("No webhook secret configured; every webhook request will be refused");
    }
    tracing::info!(
        environment = %config.webhook.environment,
        handle_unknown_senders = config.intake.handle_unknown_senders,
        "Starting mailintake"
    );

    let intake = Intake::new(
        Arc::new(store),
        config.webhook.clone(),
        config.intake.clone(),
    );
    mailintake::server::start_server(&config.server, Arc::new(intake)).await?;
    Ok(())
}

/// Normalize and classify a payload file, printing what would be filed.
fn cmd_classify(path: &Path, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let contents = std::fs::read_to_string(path)?;
    let payload: serde_json::Value = serde_json::from_str(&contents)?;
    let email = normalize::normalize(&payload, chrono::Utc::now())?;
    let result = intake::classify(&email)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let content = &result.content;
    println!();
    println!("  {:<14} {}", "Sender", result.sender_email);
    println!("  {:<14} {}", "Message id", email.message_id);
    println!("  {:<14} {}", "Title", content.title);
    println!("  {:<14} {}", "Priority", content.priority);
    println!("  {:<14} {}", "Tags", content.tags.join(", "));
    println!("  {:<14} {}", "Reply", if content.is_reply { "yes" } else { "no" });
    if let Some(thread) = &content.thread_id {
        println!("  {:<14} {thread}", "Thread");
    }
    if !result.attachments.is_empty() {
        let summary = &result.attachment_summary;
        println!(
            "  {:<14} {} ({}, {} safe)",
            "Attachments", summary.total_count, summary.total_size, summary.safe_count
        );
        for line in &summary.file_list {
            println!("    {line}");
        }
    }
    println!();
    println!("{}", content.description);
    println!();
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailintake", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

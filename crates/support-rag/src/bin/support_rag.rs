//! Support assistant command line
//!
//! Run with: cargo run -p support-rag -- <command>

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use support_rag::{
    chat::ChatSession,
    server::SupportServer,
    types::{AnswerSource, ChatRole, ComposedAnswer},
    Assistant, RagConfig,
};

#[derive(Parser)]
#[command(name = "support-rag")]
#[command(about = "Answer questions from your support documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the documents directory into the vector store
    Ingest {
        /// Directory to ingest (defaults to data.documents_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Drop the collection before ingesting
        #[arg(long)]
        recreate: bool,
    },
    /// Ask a single question
    Ask {
        question: String,
        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Interactive chat
    Chat,
    /// Show system status
    Status,
    /// Start the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Ingest { dir, recreate } => ingest(config, dir, recreate).await,
        Commands::Ask { question, top_k } => {
            let assistant = Assistant::from_config(config)?;
            let answer = assistant.ask(&question, top_k).await;
            print_answer(&answer);
            Ok(())
        }
        Commands::Chat => chat(Assistant::from_config(config)?).await,
        Commands::Status => {
            let status = Assistant::from_config(config)?.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Commands::Serve => {
            let server = SupportServer::new(config)?;
            println!("Support assistant listening on http://{}", server.address());
            println!("  Health: http://{}/health", server.address());
            println!("  API Info: http://{}/api/info", server.address());
            server.start().await?;
            Ok(())
        }
    }
}

async fn ingest(mut config: RagConfig, dir: Option<PathBuf>, recreate: bool) -> anyhow::Result<()> {
    if let Some(dir) = dir {
        config.data.documents_dir = dir;
    }
    let documents_dir = config.data.documents_dir.clone();
    let assistant = Assistant::from_config(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Ingesting {}", documents_dir.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = assistant.ingest(recreate).await;
    spinner.finish_and_clear();
    let report = report?;

    println!(
        "{} {} of {} files ingested, {} chunks written in {} ms",
        style("✓").green(),
        report.files_ingested,
        report.files_seen,
        report.chunks_written,
        report.processing_time_ms
    );
    if report.ignored > 0 {
        println!("  {} unsupported files ignored", report.ignored);
    }
    if report.sources_removed > 0 {
        println!("  {} documents no longer on disk removed", report.sources_removed);
    }
    for skipped in &report.skipped {
        println!(
            "  {} {}: {}",
            style("skipped").yellow(),
            skipped.path.display(),
            skipped.reason
        );
    }
    Ok(())
}

fn print_answer(answer: &ComposedAnswer) {
    println!("{}", answer.text);
    let label = style(answer.source.label());
    let tag = if answer.source.is_ai() {
        label.green()
    } else if answer.source == AnswerSource::DocumentSearchOnly {
        label.yellow()
    } else {
        label.red()
    };
    println!("\n[{}]", tag);
    if answer.source == AnswerSource::DocumentSearchOnly && !answer.attempts.is_empty() {
        println!(
            "{}",
            style("AI services are currently unavailable; showing matching excerpts.").dim()
        );
    }
}

async fn chat(assistant: Assistant) -> anyhow::Result<()> {
    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", style("Support assistant").bold());
    println!("Commands: /clear /history /status /quit\n");

    loop {
        print!("{} ", style("you>").cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("Chat history cleared.");
            }
            "/history" => {
                for turn in &session.turns {
                    let who = match turn.role {
                        ChatRole::User => style("you").cyan(),
                        ChatRole::Assistant => style("assistant").magenta(),
                    };
                    println!("[{}] {}: {}", turn.timestamp.format("%H:%M:%S"), who, turn.text);
                }
            }
            "/status" => {
                let status = assistant.status().await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            message => {
                let answer = assistant.chat().ask(&mut session, message).await;
                print!("{} ", style("assistant>").magenta().bold());
                print_answer(&answer);
                println!();
            }
        }
    }
    Ok(())
}

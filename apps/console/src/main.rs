use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    conversation_viewer::DETAIL_FAILURE_FALLBACK,
    view::{render_call, render_conversations, render_detail},
    CallController, CallState, ConversationViewer, DisplayMode, HttpVoiceAgentApi,
    SummaryEndpoint, VoiceAgentApi,
};
use shared::domain::ConversationId;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod session;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "voice-console",
    about = "Place voice agent calls and review conversation summaries"
)]
struct Args {
    /// Config file (defaults to ./voice_console.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// conversations or latest_transcript_summary
    #[arg(long, global = true)]
    endpoint: Option<SummaryEndpoint>,
    /// Per-request timeout; 0 or unset waits indefinitely.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// strict or legacy
    #[arg(long, global = true)]
    display_mode: Option<DisplayMode>,
    /// Used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place one outbound call and print the reported status.
    Call {
        #[arg(allow_hyphen_values = true)]
        phone_number: String,
    },
    /// List conversation summaries.
    Conversations,
    /// Print the transcript of one conversation.
    Conversation { id: String },
    /// Read commands from stdin until `quit`.
    Interactive,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = resolve_settings(&args)?;
    info!(
        base_url = %settings.base_url,
        endpoint = %settings.conversation_endpoint,
        display_mode = %settings.display_mode,
        timeout_secs = ?settings.request_timeout().map(|t| t.as_secs()),
        "voice console starting"
    );

    let api: Arc<dyn VoiceAgentApi> = Arc::new(
        HttpVoiceAgentApi::new(&settings.api_options()).context("failed to set up backend client")?,
    );

    match args.command {
        Command::Call { phone_number } => {
            let calls = CallController::new(api, settings.display_mode);
            calls.submit_call(&phone_number).await;
            print_lines(render_call(&calls.display().await));
            Ok(exit_code(matches!(calls.state().await, CallState::Success(_))))
        }
        Command::Conversations => {
            let viewer = ConversationViewer::new(api, settings.conversation_endpoint);
            viewer.activate().await;
            let snapshot = viewer.snapshot().await;
            print_lines(render_conversations(&snapshot));
            Ok(exit_code(snapshot.error.is_none()))
        }
        Command::Conversation { id } => {
            let viewer = ConversationViewer::new(api, settings.conversation_endpoint);
            match viewer.fetch_detail(&ConversationId(id)).await {
                Ok(detail) => {
                    print_lines(render_detail(&detail));
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    println!("Error: {}", err.user_message(DETAIL_FAILURE_FALLBACK));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Interactive => {
            let calls = CallController::new(api.clone(), settings.display_mode);
            let viewer = ConversationViewer::new(api, settings.conversation_endpoint);
            session::run(calls, viewer).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(base_url) = &args.base_url {
        settings.set_base_url(base_url);
    }
    if let Some(endpoint) = args.endpoint {
        settings.conversation_endpoint = endpoint;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = Some(timeout_secs);
    }
    if let Some(display_mode) = args.display_mode {
        settings.display_mode = display_mode;
    }
    Ok(settings)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

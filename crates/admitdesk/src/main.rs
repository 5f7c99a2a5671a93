// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admitdesk - terminal client for the admissions consultation backend.
//!
//! This is the binary entry point: a customer-side chat, an officer-side
//! console, and a config inspector, all driven by the same session
//! controller the library crates expose.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use admitdesk_config::AdmitdeskConfig;
use admitdesk_core::{
    AdmitdeskError, ChatMessage, ClientSessionState, Credentials, CustomerId, OfficialId, Party,
    QueueId,
};
use admitdesk_notify::SseNotificationSource;
use admitdesk_queue::QueueGateway;
use admitdesk_session::{SessionController, SessionUpdate};
use admitdesk_transport::ChatSocket;

/// Admitdesk - terminal client for the admissions consultation backend.
#[derive(Parser, Debug)]
#[command(name = "admitdesk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Join the consultation queue as a customer and chat.
    Chat {
        /// Customer account id.
        #[arg(long)]
        customer_id: i64,
    },
    /// Officer console: inspect the queue, accept requests, chat.
    Officer {
        /// Officer account id.
        #[arg(long)]
        official_id: i64,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match admitdesk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            admitdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);

    let result = match cli.command {
        Commands::Chat { customer_id } => {
            run_chat(&config, Party::Customer(CustomerId(customer_id))).await
        }
        Commands::Officer { official_id } => {
            run_officer(&config, Party::Official(OfficialId(official_id))).await
        }
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("admitdesk: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(config: &AdmitdeskConfig) -> Result<(), AdmitdeskError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| AdmitdeskError::Internal(format!("failed to render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Wires the REST gateway, notification channel, and message socket into
/// one controller for the given party.
fn build_controller(
    config: &AdmitdeskConfig,
    party: Party,
) -> Result<SessionController, AdmitdeskError> {
    let credentials = Credentials::new(party, config.backend.bearer_token.clone());
    let gateway = QueueGateway::new(&config.backend.base_url, &credentials)?;
    let notify =
        SseNotificationSource::connect(&config.backend.base_url, &credentials, &config.notify)?;
    let socket = ChatSocket::new(&config.backend.socket_url(), party, &config.transport);

    Ok(SessionController::new(
        party,
        Arc::new(gateway),
        Arc::new(notify),
        Arc::new(socket),
    ))
}

async fn run_chat(config: &AdmitdeskConfig, party: Party) -> Result<(), AdmitdeskError> {
    let mut controller = build_controller(config, party)?;

    controller.join_queue().await?;
    println!("waiting for an admission officer... (/cancel to leave, /quit to exit)");

    run_console(&mut controller).await;
    controller.shutdown().await;
    Ok(())
}

async fn run_officer(config: &AdmitdeskConfig, party: Party) -> Result<(), AdmitdeskError> {
    let mut controller = build_controller(config, party)?;

    print_queue(&controller).await;
    println!("commands: /list /sessions /accept <queue_id> /reject <queue_id> <reason> /refresh /end /quit");

    run_console(&mut controller).await;
    controller.shutdown().await;
    Ok(())
}

/// Interleaves stdin commands with controller updates until /quit.
async fn run_console(controller: &mut SessionController) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => break,
                };
                if !handle_line(controller, line.trim()).await {
                    break;
                }
            }
            updates = controller.next_update() => match updates {
                Ok(updates) => {
                    for update in updates {
                        print_update(&update);
                    }
                }
                Err(e) => warn!(error = %e, "channel error"),
            }
        }
    }
}

/// Applies one console line. Returns false when the user quits.
async fn handle_line(controller: &mut SessionController, line: &str) -> bool {
    let result = match line {
        "" => Ok(()),
        "/quit" => return false,
        "/cancel" => controller.cancel_queue().await,
        "/end" => {
            let result = controller.end_session().await;
            if result.is_ok() {
                println!("session ended");
            }
            result
        }
        "/reset" => controller.reset(),
        "/refresh" => match controller.refresh_history().await {
            Ok(count) => {
                println!("history reloaded ({count} messages)");
                print_history(controller.messages());
                Ok(())
            }
            Err(e) => Err(e),
        },
        "/list" => match controller.list_queue().await {
            Ok(entries) => {
                for entry in &entries {
                    println!(
                        "  queue {} customer {} [{}]",
                        entry.queue_id.0, entry.customer_id.0, entry.status
                    );
                }
                println!("{} waiting", entries.len());
                Ok(())
            }
            Err(e) => Err(e),
        },
        "/sessions" => match controller.list_active_sessions().await {
            Ok(sessions) => {
                for session in &sessions {
                    println!(
                        "  session {} customer {} started {}",
                        session.session_id.get(),
                        session.customer_id.0,
                        session.start_time
                    );
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        _ if line.starts_with("/accept ") => match parse_id(&line["/accept ".len()..]) {
            Some(queue_id) => match controller.accept(QueueId(queue_id)).await {
                Ok(session) => {
                    println!("session {} open", session.session_id.get());
                    print_history(controller.messages());
                    Ok(())
                }
                Err(e) => Err(e),
            },
            None => {
                eprintln!("usage: /accept <queue_id>");
                Ok(())
            }
        },
        _ if line.starts_with("/reject ") => {
            let rest = &line["/reject ".len()..];
            match rest.split_once(' ').and_then(|(id, reason)| {
                parse_id(id).map(|id| (id, reason.trim().to_string()))
            }) {
                Some((queue_id, reason)) => {
                    controller.reject(QueueId(queue_id), &reason).await
                }
                None => {
                    eprintln!("usage: /reject <queue_id> <reason>");
                    Ok(())
                }
            }
        }
        text => {
            if controller.state() != ClientSessionState::Chatting {
                eprintln!("not in a chat (state: {})", controller.state());
                Ok(())
            } else if !controller.can_send() {
                eprintln!("chat connection is down, try again shortly");
                Ok(())
            } else {
                controller.send_message(text).await
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{e}");
    }
    true
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

async fn print_queue(controller: &SessionController) {
    match controller.list_queue().await {
        Ok(entries) => {
            println!("{} request(s) waiting", entries.len());
            for entry in &entries {
                println!(
                    "  queue {} customer {} [{}]",
                    entry.queue_id.0, entry.customer_id.0, entry.status
                );
            }
        }
        Err(e) => eprintln!("could not fetch the queue: {e}"),
    }
}

fn print_history(messages: &[ChatMessage]) {
    for message in messages {
        print_message(message);
    }
}

fn print_message(message: &ChatMessage) {
    let sender = if message.is_from_bot {
        "bot".to_string()
    } else {
        format!("{}", message.sender_id)
    };
    println!("[{}] {}: {}", message.timestamp.format("%H:%M:%S"), sender, message.message_text);
}

fn print_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::StateChanged(state) => match state {
            ClientSessionState::Chatting => println!("an officer accepted your request, chat is open"),
            ClientSessionState::Ended => println!("session over (/reset to start again, /quit to exit)"),
            ClientSessionState::Idle => println!("back to idle"),
            ClientSessionState::InQueue => println!("waiting in queue"),
        },
        SessionUpdate::QueueUpdated(payload) => {
            if let Some(position) = payload
                .as_ref()
                .and_then(|p| p.get("position"))
                .and_then(serde_json::Value::as_i64)
            {
                println!("queue position: {position}");
            }
        }
        SessionUpdate::MessageReceived(message) => print_message(message),
        SessionUpdate::HistoryRefreshed(count) => println!("history loaded ({count} messages)"),
        SessionUpdate::CounterpartEnded => println!("the other party ended the chat"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parses_chat_args() {
        let cli = Cli::parse_from(["admitdesk", "chat", "--customer-id", "42"]);
        assert!(matches!(cli.command, Commands::Chat { customer_id: 42 }));
    }

    #[test]
    fn cli_parses_officer_args() {
        let cli = Cli::parse_from(["admitdesk", "officer", "--official-id", "9"]);
        assert!(matches!(cli.command, Commands::Officer { official_id: 9 }));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = admitdesk_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
    }
}

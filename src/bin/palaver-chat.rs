//! Interactive chat application for conversing with a Botpress bot.
//!
//! This binary provides a REPL interface over the Botpress Chat API with
//! polling-based reply delivery.
//!
//! # Usage
//!
//! ```bash
//! # Credentials from the environment (CHAT_API_ID, CHAT_USER_KEY)
//! palaver-chat
//!
//! # Credentials from a YAML store
//! palaver-chat --secrets ~/.palaver.yaml
//!
//! # Disable colors (useful for piping output)
//! palaver-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Create a new conversation
//! - `/switch <n|id>` - Switch the active conversation
//! - `/listen` - Stream conversation events
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arrrg::CommandLine;
use futures::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use palaver::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, SendOutcome, SessionStats, TurnRole,
    help_text, parse_command,
};
use palaver::{Botpress, StderrLogger};

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for dim text (used for ids and notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Main entry point for the palaver-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("palaver-chat [OPTIONS]");
    let config = ChatConfig::resolve(args)?;
    let use_color = config.use_color;

    let mut client = Botpress::new(config.api_id.clone(), config.user_key.clone())?;
    if config.verbose {
        client = client.with_logger(Arc::new(StderrLogger));
    }

    let mut session = ChatSession::connect(client, &config).await?;
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling while listening.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "Palaver Chat (user: {}, conversation: {})",
        session.user().display_name(),
        dim(session.active_conversation().unwrap_or("-"), use_color)
    );
    println!("Type /help for commands, /quit to exit\n");

    match session.history().await {
        Ok(turns) => {
            for turn in turns {
                print_turn(turn.role, &turn.content, use_color);
            }
        }
        Err(err) => eprintln!("Error loading history: {err}"),
    }

    loop {
        // Reset interrupt flag before each input.
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands.
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            session.close();
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::NewConversation => match session.new_conversation().await {
                            Ok(id) => println!("Switched to new conversation {}", dim(&id, use_color)),
                            Err(err) => eprintln!("Error: {err}"),
                        },
                        ChatCommand::ListConversations => {
                            print_conversations(&session, use_color);
                        }
                        ChatCommand::Switch(selector) => match session.switch(&selector) {
                            Ok(id) => {
                                println!("Active conversation: {}", dim(&id, use_color));
                                show_history(&mut session, use_color).await;
                            }
                            Err(err) => eprintln!("Error: {err}"),
                        },
                        ChatCommand::Refresh => match session.reload_history().await {
                            Ok(turns) => {
                                for turn in turns.to_vec() {
                                    print_turn(turn.role, &turn.content, use_color);
                                }
                            }
                            Err(err) => eprintln!("Error: {err}"),
                        },
                        ChatCommand::Whoami => {
                            let user = session.user();
                            println!(
                                "{} {}",
                                user.display_name(),
                                dim(&format!("({})", user.id), use_color)
                            );
                        }
                        ChatCommand::SetKey(key) => match session.rotate_key(key).await {
                            Ok(user) => println!("Now chatting as {}", user.display_name()),
                            Err(err) => eprintln!("Error: {err}"),
                        },
                        ChatCommand::NewUser { name, id } => {
                            match session.recreate_user(&name, &id).await {
                                Ok(user) => println!("Created and adopted {}", user.display_name()),
                                Err(err) => eprintln!("Error: {err}"),
                            }
                        }
                        ChatCommand::Listen => {
                            listen(&session, &interrupted, use_color).await;
                        }
                        ChatCommand::Stats => {
                            print_stats(&session.stats());
                        }
                        ChatCommand::Invalid(message) => {
                            eprintln!("{message}");
                        }
                    }
                    continue;
                }

                // Regular message - send and poll for the reply.
                match session.send(line).await {
                    Ok(SendOutcome::Replied(reply)) => {
                        print_turn(TurnRole::Assistant, &reply, use_color);
                    }
                    Ok(SendOutcome::TimedOut { attempts }) => {
                        println!(
                            "{}",
                            dim(
                                &format!("No response received within timeout ({attempts} polls)."),
                                use_color
                            )
                        );
                    }
                    Err(err) => eprintln!("Error: {err}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt.
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit.
                session.close();
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Input error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

/// Streams conversation events until ctrl-c or the stream ends.
async fn listen(session: &ChatSession, interrupted: &AtomicBool, use_color: bool) {
    let mut stream = match session.listen().await {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("Error: {err}");
            return;
        }
    };
    println!("{}", dim("Listening; ctrl-c to stop.", use_color));

    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(chunk)) => print_turn(TurnRole::Assistant, &chunk, use_color),
                Some(Err(err)) => {
                    eprintln!("Stream error: {err}");
                    break;
                }
                None => break,
            },
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if interrupted.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }
    println!("{}", dim("Stopped listening.", use_color));
}

async fn show_history(session: &mut ChatSession, use_color: bool) {
    match session.history().await {
        Ok(turns) => {
            for turn in turns.to_vec() {
                print_turn(turn.role, &turn.content, use_color);
            }
        }
        Err(err) => eprintln!("Error loading history: {err}"),
    }
}

fn print_conversations(session: &ChatSession, use_color: bool) {
    let active = session.active_conversation();
    for (index, conversation) in session.conversations().iter().enumerate() {
        let marker = if Some(conversation.id.as_str()) == active {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {} {}",
            index + 1,
            dim(&conversation.id, use_color)
        );
    }
}

fn print_turn(role: TurnRole, content: &str, use_color: bool) {
    let label = match role {
        TurnRole::User => "You:".to_string(),
        TurnRole::Assistant => {
            if use_color {
                format!("{ANSI_CYAN}Bot:{ANSI_RESET}")
            } else {
                "Bot:".to_string()
            }
        }
    };
    println!("{label} {content}");
}

fn print_stats(stats: &SessionStats) {
    println!("    Session Statistics:");
    println!("      User: {} ({})", stats.user_name, stats.user_id);
    println!("      Conversations: {}", stats.conversation_count);
    match stats.active_conversation.as_deref() {
        Some(id) => println!("      Active conversation: {id}"),
        None => println!("      Active conversation: (none)"),
    }
    println!("      Turns held locally: {}", stats.active_turns);
    println!(
        "      Sent/replied/timed out: {}/{}/{}",
        stats.messages_sent, stats.replies_received, stats.poll_timeouts
    );
    println!("      History fetch limit: {}", stats.history_limit);
}

fn dim(text: &str, use_color: bool) -> String {
    if use_color {
        format!("{ANSI_DIM}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

//! Interactive line-oriented chat loop.

use std::error::Error;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use crate::cli::render::{describe_error, render_history};
use crate::core::chat_stream::{CompletionService, ReplyStream};
use crate::core::config::Config;
use crate::core::error::ChatError;
use crate::core::image::ImageUpload;
use crate::core::session::Session;

#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput {
    Prompt(String),
    Images(Vec<PathBuf>),
    History,
    Reset,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatInput::Prompt(trimmed.to_string());
    };

    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "image" | "img" => ChatInput::Images(parts.map(PathBuf::from).collect()),
        "history" => ChatInput::History,
        "reset" | "clear" => ChatInput::Reset,
        "quit" | "exit" => ChatInput::Quit,
        other => ChatInput::Unknown(other.to_string()),
    }
}

/// Print fragments as they arrive. Ctrl+C abandons the reply.
pub async fn stream_to_terminal(mut stream: ReplyStream<'_>) -> Result<(), ChatError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stdout = io::stdout();

    let outcome = loop {
        tokio::select! {
            next = stream.next_fragment() => match next {
                Ok(Some(fragment)) => {
                    print!("{fragment}");
                    let _ = stdout.flush();
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            },
            _ = &mut ctrl_c => break Err(ChatError::Cancelled),
        }
    };
    if matches!(outcome, Err(ChatError::Cancelled)) {
        stream.cancel();
    }
    println!();
    outcome
}

/// Read each path and add the images to the session, reporting failures.
pub fn attach_images(session: &mut Session, paths: &[PathBuf]) -> usize {
    let mut uploads = Vec::new();
    for path in paths {
        match ImageUpload::from_path(path) {
            Ok(upload) => uploads.push(upload),
            Err(err) => eprintln!("❌ Could not read {}: {err}", path.display()),
        }
    }

    let rejected = session.add_images(&uploads);
    for (name, err) in &rejected {
        eprintln!("❌ {name}: {err}");
    }
    uploads.len() - rejected.len()
}

/// Next line typed at the prompt. `interrupt` finishing first ends input
/// the same way EOF does.
async fn next_prompt<R, F>(lines: &mut Lines<R>, interrupt: F) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => {
            debug!("Interrupted at the prompt");
            println!();
            Ok(None)
        }
    }
}

pub async fn run_chat<S>(config: &Config, service: &S) -> Result<(), Box<dyn Error>>
where
    S: CompletionService + ?Sized,
{
    if let Err(err) = service.check_credentials() {
        eprintln!("{}", describe_error(&err));
        std::process::exit(1);
    }

    let mut session = Session::create(config.completion_params());
    println!(
        "Color Compass ({}). Ask about colors or attach images with /image <path>. /quit or Ctrl+C to exit.",
        session.params().model
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        // Once a reply has streamed, SIGINT no longer kills the process, so
        // the prompt listens for it too.
        let interrupt = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let Some(line) = next_prompt(&mut lines, interrupt).await? else {
            break;
        };

        match parse_input(&line) {
            ChatInput::Empty => {}
            ChatInput::Prompt(text) => match session.send(text, service) {
                Ok(stream) => {
                    if let Err(err) = stream_to_terminal(stream).await {
                        eprintln!("{}", describe_error(&err));
                    }
                }
                Err(err) => eprintln!("{}", describe_error(&err)),
            },
            ChatInput::Images(paths) => {
                if paths.is_empty() {
                    eprintln!("⚠️  Usage: /image <path>...");
                    continue;
                }
                let added = attach_images(&mut session, &paths);
                if added > 0 {
                    println!("📎 Attached {added} image(s); they will be sent with your next message.");
                }
            }
            ChatInput::History => println!("{}", render_history(session.visible_messages())),
            ChatInput::Reset => {
                session.reset();
                println!("🧹 Conversation cleared.");
            }
            ChatInput::Quit => break,
            ChatInput::Unknown(command) => {
                debug!(%command, "Unknown chat command");
                eprintln!("⚠️  Unknown command: /{command}");
            }
        }
    }

    session.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::image::tiny_png;

    #[test]
    fn parses_prompts_and_commands() {
        assert_eq!(parse_input("   "), ChatInput::Empty);
        assert_eq!(
            parse_input("  which palette? "),
            ChatInput::Prompt("which palette?".into())
        );
        assert_eq!(
            parse_input("/image a.png b.jpg"),
            ChatInput::Images(vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")])
        );
        assert_eq!(parse_input("/image"), ChatInput::Images(Vec::new()));
        assert_eq!(parse_input("/history"), ChatInput::History);
        assert_eq!(parse_input("/clear"), ChatInput::Reset);
        assert_eq!(parse_input("/exit"), ChatInput::Quit);
        assert_eq!(parse_input("/dance"), ChatInput::Unknown("dance".into()));
    }

    #[test]
    fn attach_images_skips_unreadable_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        std::fs::write(&good, tiny_png()).unwrap();
        std::fs::write(&bad, b"nope").unwrap();
        let missing = dir.path().join("missing.png");

        let mut session = Session::create(Config::default().completion_params());
        let added = attach_images(&mut session, &[good, bad, missing]);

        assert_eq!(added, 1);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn prompt_returns_typed_lines() {
        let mut lines = BufReader::new(&b"which palette?\n"[..]).lines();
        let line = next_prompt(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(line.as_deref(), Some("which palette?"));
        assert_eq!(next_prompt(&mut lines, std::future::pending()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn interrupt_at_the_prompt_ends_input() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let line = next_prompt(&mut lines, std::future::ready(())).await.unwrap();
        assert_eq!(line, None);
    }
}

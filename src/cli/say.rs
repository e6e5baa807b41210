//! One-shot "say" command

use std::error::Error;
use std::path::PathBuf;

use crate::cli::chat::{attach_images, stream_to_terminal};
use crate::cli::render::describe_error;
use crate::core::chat_stream::CompletionService;
use crate::core::config::Config;
use crate::core::error::ChatError;
use crate::core::session::Session;

/// 2 when a partial reply was printed and kept, 1 for every other failure.
pub(crate) fn exit_code(err: &ChatError) -> i32 {
    if err.kept_partial_reply() {
        2
    } else {
        1
    }
}

pub async fn run_say<S>(
    config: &Config,
    service: &S,
    prompt: Vec<String>,
    images: Vec<PathBuf>,
) -> Result<(), Box<dyn Error>>
where
    S: CompletionService + ?Sized,
{
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() && images.is_empty() {
        eprintln!("Usage: color-compass say [--image PATH]... <prompt>");
        std::process::exit(1);
    }

    let mut session = Session::create(config.completion_params());
    if !images.is_empty() && attach_images(&mut session, &images) == 0 && prompt.trim().is_empty() {
        std::process::exit(1);
    }

    let stream = if prompt.trim().is_empty() {
        session.stream_reply(service)
    } else {
        session.send(prompt, service)
    };

    let result = match stream {
        Ok(stream) => stream_to_terminal(stream).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            eprintln!("{}", describe_error(&err));
            std::process::exit(exit_code(&err));
        }
    }
}

//! Color Compass is a terminal chat assistant that streams answers from a
//! remote multimodal model, steered toward colorblind-friendly advice.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session transcript, image ingestion and the streaming
//!   completion driver.
//! - [`api`] defines the chat payloads sent to and received from the
//!   OpenAI-compatible endpoint.
//! - [`cli`] is the terminal surface: argument parsing, the chat loop and
//!   message rendering.
//! - [`utils`] holds URL and credential helpers.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;

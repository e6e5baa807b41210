pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod error;
pub mod image;
pub mod message;
pub mod session;
pub mod transcript;

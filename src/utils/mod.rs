pub mod auth;
pub mod url;

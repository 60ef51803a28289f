//! HTTP request handlers for the Parley web server

pub mod chat;
pub mod health;
pub mod types;

pub use chat::*;
pub use health::*;

pub use types::*;

//! Request and response types used by the handlers

pub mod chat;
pub mod common;

pub use chat::*;
pub use common::*;

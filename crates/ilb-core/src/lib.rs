//! Core domain + application logic for the invite-link bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the link
//! store live behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod ports;
pub mod replies;
pub mod router;
pub mod store;

pub use errors::{Error, Result};

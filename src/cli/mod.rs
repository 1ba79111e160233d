//! Command-line frontends for the client and the relay
//!
//! This module is only available when the "cli" feature is enabled; the
//! relay command also needs the "server" feature.

mod checkout;
mod config;
#[path = "main.rs"]
mod main_impl;
mod progress;
#[cfg(feature = "server")]
mod relay;

pub use main_impl::{main, Cli};
#[cfg(feature = "server")]
pub use relay::{main as relay_main, RelayCli};

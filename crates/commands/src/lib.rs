//! Slash-command registry consulted before agent dispatch (§4.4).

pub mod error;
pub mod registry;

pub use {
    error::{Error, Result},
    registry::{CommandContext, CommandHandler, CommandRegistry},
};

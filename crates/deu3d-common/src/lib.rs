// Shared console output and configuration for the deu3d crates

pub mod common;
pub mod cvar;

pub use common::{init_console_logger, ConsoleLogger};
pub use cvar::{Cvar, CvarContext, CvarFlags};

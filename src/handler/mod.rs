//! Command handler registration and dispatch.

mod table;

pub use table::{CommandEntry, CommandHandler, CommandTable};

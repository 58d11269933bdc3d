//! Command dispatch table.
//!
//! Maps a verb to up to three handlers (one per actionable kind) plus help
//! text. Lookup is an exact, case-sensitive key match; a miss is reported
//! as [`BridgeError::CommandNotFound`] and is never fatal to the parser.
//!
//! # Example
//!
//! ```
//! use atbridge::handler::{CommandEntry, CommandTable};
//! use atbridge::protocol::Command;
//!
//! let mut table = CommandTable::new();
//! table.register(
//!     "GMR",
//!     CommandEntry::new("check version information")
//!         .on_execute(|_params| println!("atbridge 0.1.0")),
//! );
//!
//! let cmd = Command::decode("GMR").unwrap();
//! table.execute(&cmd).unwrap();
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{BridgeError, Result};
use crate::protocol::{Command, CommandKind};

/// A registered handler: ordered parameters in, side effects out.
pub type CommandHandler = Box<dyn Fn(&[String]) + Send + Sync>;

/// Handlers and help text for one verb.
///
/// Any of the three kind slots may be absent; dispatching to an absent slot
/// is a no-op, matching the behavior of an unimplemented command variant.
#[derive(Default)]
pub struct CommandEntry {
    on_query: Option<CommandHandler>,
    on_set: Option<CommandHandler>,
    on_execute: Option<CommandHandler>,
    help: &'static str,
}

impl CommandEntry {
    /// Create an entry with help text and no handlers.
    pub fn new(help: &'static str) -> Self {
        Self {
            help,
            ..Self::default()
        }
    }

    /// Handler for `AT+VERB?`.
    pub fn on_query<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.on_query = Some(Box::new(f));
        self
    }

    /// Handler for `AT+VERB=<params>`.
    pub fn on_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.on_set = Some(Box::new(f));
        self
    }

    /// Handler for `AT+VERB`.
    pub fn on_execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.on_execute = Some(Box::new(f));
        self
    }

    /// Human-readable help text.
    pub fn help(&self) -> &'static str {
        self.help
    }
}

/// Static mapping from verb to [`CommandEntry`].
#[derive(Default)]
pub struct CommandTable {
    entries: HashMap<&'static str, CommandEntry>,
}

impl CommandTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `verb`, replacing any previous entry.
    pub fn register(&mut self, verb: &'static str, entry: CommandEntry) -> &mut Self {
        self.entries.insert(verb, entry);
        self
    }

    /// Look up an entry by exact verb match.
    pub fn find(&self, verb: &str) -> Option<&CommandEntry> {
        self.entries.get(verb)
    }

    /// Dispatch a decoded command to the handler matching its kind.
    ///
    /// `Test` commands have no handler slot and are a no-op; so is a
    /// registered verb whose slot for the requested kind is empty.
    pub fn execute(&self, cmd: &Command) -> Result<()> {
        let Some(entry) = self.find(&cmd.verb) else {
            tracing::warn!(verb = %cmd.verb, "command not found");
            return Err(BridgeError::CommandNotFound(cmd.verb.clone()));
        };

        let handler = match cmd.kind {
            CommandKind::Query => entry.on_query.as_ref(),
            CommandKind::Set => entry.on_set.as_ref(),
            CommandKind::Execute => entry.on_execute.as_ref(),
            CommandKind::Test => None,
        };

        if let Some(handler) = handler {
            tracing::debug!(verb = %cmd.verb, kind = ?cmd.kind, params = cmd.param_count(), "dispatch");
            handler(&cmd.params);
        }
        Ok(())
    }

    /// Render the manual: every verb with its help text, sorted.
    pub fn manual(&self) -> String {
        let mut verbs: Vec<_> = self.entries.keys().copied().collect();
        verbs.sort_unstable();

        let mut out = String::from("=== Manual: Command List ===\n");
        for verb in verbs {
            let _ = writeln!(out, "-> {}: {}", verb, self.entries[verb].help());
        }
        out
    }

    /// Number of registered verbs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no verbs are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! AT command protocol: streaming line parser and command decoder.

mod command;
mod line_parser;

pub use command::{Command, CommandKind, DecodeError, MAX_PARAMS, MAX_PARAM_LEN, MAX_VERB_LEN};
pub use line_parser::{
    CommandLine, FeedOutcome, LineParser, PushResult, Rejected, FRAME_PREFIX, MAX_FRAME_LEN,
};

//! Streaming line parser for the AT command protocol.
//!
//! Implements a byte-level state machine that recognizes one command per
//! `AT+<text>\r\n` frame in an arbitrary byte stream:
//! - `Prefix`: matching the fixed 3-byte `AT+` prefix, one byte at a time
//! - `InFrame`: accumulating payload until `\r\n`
//!
//! Bytes that break prefix matching are handed back as [`FeedOutcome::Passthrough`]
//! so a bridged stream can forward them unchanged; a control stream simply
//! discards them. Garbage input never produces an error: malformed prefixes,
//! truncated frames and buffer overflow all reset or absorb silently.
//!
//! # Example
//!
//! ```
//! use atbridge::protocol::{FeedOutcome, LineParser};
//!
//! let mut parser = LineParser::new();
//! let mut command = None;
//! for &byte in b"AT+GMR\r\n" {
//!     if let FeedOutcome::Command(line) = parser.feed(byte) {
//!         command = Some(line);
//!     }
//! }
//! assert_eq!(command.unwrap().as_bytes(), b"GMR");
//! ```

use bytes::{Bytes, BytesMut};

use super::command::{Command, DecodeError};

/// Fixed frame prefix, each byte matched in exact sequence.
pub const FRAME_PREFIX: [u8; 3] = *b"AT+";

/// Total frame budget in bytes (prefix + payload + CR). Once the internal
/// buffer reaches this budget, further payload bytes are silently dropped
/// until the frame terminates.
pub const MAX_FRAME_LEN: usize = 256;

/// Payload buffer capacity (frame budget minus the prefix).
const BUF_CAPACITY: usize = MAX_FRAME_LEN - FRAME_PREFIX.len();

/// State machine for line parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Matching the `AT+` prefix; `matched` bytes seen so far.
    Prefix { matched: usize },
    /// Prefix complete, accumulating payload until `\r\n`.
    InFrame,
}

/// One completed command line: the text between the `AT+` prefix and the
/// trailing `\r\n`, never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(Bytes);

impl CommandLine {
    /// Raw line bytes (prefix and terminator already stripped).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode this line into a typed [`Command`].
    pub fn decode(&self) -> Result<Command, DecodeError> {
        let text = std::str::from_utf8(&self.0).map_err(|_| DecodeError::InvalidText)?;
        Command::decode(text)
    }
}

/// Bytes rejected during prefix matching: up to two absorbed prefix bytes
/// plus the byte that broke the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    bytes: [u8; 3],
    len: u8,
}

impl Rejected {
    fn new(prefix_matched: usize, current: u8) -> Self {
        let mut bytes = [0u8; 3];
        bytes[..prefix_matched].copy_from_slice(&FRAME_PREFIX[..prefix_matched]);
        bytes[prefix_matched] = current;
        Self {
            bytes,
            len: (prefix_matched + 1) as u8,
        }
    }

    /// The rejected bytes, in arrival order.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Result of feeding one byte to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Byte consumed; no frame completed yet.
    Pending,
    /// A full `AT+…\r\n` frame completed with non-empty text.
    Command(CommandLine),
    /// The byte (plus any previously absorbed prefix bytes) is not part of a
    /// command frame and belongs to the surrounding data stream.
    Passthrough(Rejected),
}

/// Everything a chunk of input produced: completed commands plus the bytes
/// that were not part of any command frame.
#[derive(Debug, Default)]
pub struct PushResult {
    /// Completed command lines, in stream order.
    pub commands: Vec<CommandLine>,
    /// Non-command bytes, in stream order.
    pub passthrough: BytesMut,
}

/// Stateful parser extracting `AT+…\r\n` command frames from a byte stream.
///
/// One instance per connection; survives arbitrarily fragmented reads.
pub struct LineParser {
    /// Accumulated payload bytes (interior `\r` included).
    buf: BytesMut,
    state: State,
    /// Whether the most recently seen in-frame byte was `\r`. Tracked as
    /// parser state so the terminator is still recognized when the buffer
    /// filled up and the `\r` itself was dropped.
    last_was_cr: bool,
}

impl LineParser {
    /// Create a parser in the idle state.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(BUF_CAPACITY),
            state: State::Prefix { matched: 0 },
            last_was_cr: false,
        }
    }

    /// Reset to idle with an empty buffer.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = State::Prefix { matched: 0 };
        self.last_was_cr = false;
    }

    /// Whether the parser is currently inside a frame (prefix fully matched).
    #[inline]
    pub fn in_frame(&self) -> bool {
        self.state == State::InFrame
    }

    /// Consume one byte and advance the state machine.
    pub fn feed(&mut self, byte: u8) -> FeedOutcome {
        match self.state {
            State::Prefix { matched } => {
                if byte == FRAME_PREFIX[matched] {
                    if matched + 1 == FRAME_PREFIX.len() {
                        self.state = State::InFrame;
                    } else {
                        self.state = State::Prefix {
                            matched: matched + 1,
                        };
                    }
                    FeedOutcome::Pending
                } else {
                    // Each byte is examined exactly once: a mismatch is not
                    // re-tried as the start of a new prefix.
                    let rejected = Rejected::new(matched, byte);
                    self.reset();
                    FeedOutcome::Passthrough(rejected)
                }
            }

            State::InFrame => {
                if byte == b'\n' && self.last_was_cr {
                    return self.complete();
                }

                if self.buf.len() < BUF_CAPACITY {
                    self.buf.extend_from_slice(&[byte]);
                }
                // Past capacity the byte is dropped, but terminator tracking
                // continues so the frame can still complete.
                self.last_was_cr = byte == b'\r';
                FeedOutcome::Pending
            }
        }
    }

    /// Feed a whole chunk, collecting completed commands and passthrough
    /// bytes in stream order.
    pub fn push(&mut self, data: &[u8]) -> PushResult {
        let mut result = PushResult::default();
        for &byte in data {
            match self.feed(byte) {
                FeedOutcome::Pending => {}
                FeedOutcome::Command(line) => result.commands.push(line),
                FeedOutcome::Passthrough(rejected) => {
                    result.passthrough.extend_from_slice(rejected.as_slice());
                }
            }
        }
        result
    }

    /// Terminate the current frame and reset, yielding the command text if
    /// there is any.
    fn complete(&mut self) -> FeedOutcome {
        // Strip the trailing CR when it made it into the buffer (it may have
        // been dropped by the overflow policy).
        if self.buf.last() == Some(&b'\r') {
            self.buf.truncate(self.buf.len() - 1);
        }

        let line = self.buf.split().freeze();
        self.reset();

        if line.is_empty() {
            FeedOutcome::Pending
        } else {
            FeedOutcome::Command(CommandLine(line))
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(parser: &mut LineParser, data: &[u8]) -> Vec<CommandLine> {
        parser.push(data).commands
    }

    #[test]
    fn test_single_complete_frame() {
        let mut parser = LineParser::new();
        let commands = parse_all(&mut parser, b"AT+GMR\r\n");

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_bytes(), b"GMR");
        assert!(!parser.in_frame());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut parser = LineParser::new();
        let commands = parse_all(&mut parser, b"AT+GMR\r\nAT+CIPMUX?\r\nAT+RST\r\n");

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].as_bytes(), b"GMR");
        assert_eq!(commands[1].as_bytes(), b"CIPMUX?");
        assert_eq!(commands[2].as_bytes(), b"RST");
    }

    #[test]
    fn test_fragmented_frame() {
        let mut parser = LineParser::new();

        assert!(parse_all(&mut parser, b"AT+").is_empty());
        assert!(parser.in_frame());
        assert!(parse_all(&mut parser, b"CIPM").is_empty());
        let commands = parse_all(&mut parser, b"UX=1\r\n");

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_bytes(), b"CIPMUX=1");
    }

    #[test]
    fn test_byte_at_a_time_equals_whole_chunk() {
        let stream: &[u8] = b"xAT+GMR\r\nnoise\xffAT+CIPSTART=\"TCP\",\"1.2.3.4\",\"80\"\r\n";

        let mut whole = LineParser::new();
        let whole_result = whole.push(stream);

        let mut stepped = LineParser::new();
        let mut commands = Vec::new();
        let mut passthrough = BytesMut::new();
        for &byte in stream {
            match stepped.feed(byte) {
                FeedOutcome::Pending => {}
                FeedOutcome::Command(line) => commands.push(line),
                FeedOutcome::Passthrough(r) => passthrough.extend_from_slice(r.as_slice()),
            }
        }

        assert_eq!(whole_result.commands, commands);
        assert_eq!(whole_result.passthrough, passthrough);
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_prefix_mismatch_is_passthrough() {
        let mut parser = LineParser::new();
        let result = parser.push(b"hello");

        assert!(result.commands.is_empty());
        assert_eq!(&result.passthrough[..], b"hello");
    }

    #[test]
    fn test_partial_prefix_released_on_mismatch() {
        let mut parser = LineParser::new();
        // "AT" absorbed while matching, released together with 'x'.
        let result = parser.push(b"ATx");

        assert!(result.commands.is_empty());
        assert_eq!(&result.passthrough[..], b"ATx");
    }

    #[test]
    fn test_mismatched_byte_not_retried_as_prefix_start() {
        // Second 'A' breaks the match and is released; the following
        // "T+GMR\r\n" is plain data since the byte was examined only once.
        let mut parser = LineParser::new();
        let result = parser.push(b"AAT+GMR\r\n");

        assert!(result.commands.is_empty());
        assert_eq!(&result.passthrough[..], b"AAT+GMR\r\n");
    }

    #[test]
    fn test_lone_lf_is_payload() {
        let mut parser = LineParser::new();
        let commands = parse_all(&mut parser, b"AT+DATA\nMORE\r\n");

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_bytes(), b"DATA\nMORE");
    }

    #[test]
    fn test_interior_cr_is_payload() {
        let mut parser = LineParser::new();
        let commands = parse_all(&mut parser, b"AT+A\rB\r\n");

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_bytes(), b"A\rB");
    }

    #[test]
    fn test_empty_frame_yields_nothing() {
        let mut parser = LineParser::new();
        let result = parser.push(b"AT+\r\n");

        assert!(result.commands.is_empty());
        assert!(result.passthrough.is_empty());
        // Parser reset and usable afterward.
        assert_eq!(parser.push(b"AT+GMR\r\n").commands.len(), 1);
    }

    #[test]
    fn test_overflow_truncates_silently_and_still_completes() {
        let mut parser = LineParser::new();

        let mut stream = Vec::from(&b"AT+"[..]);
        stream.extend(std::iter::repeat(b'X').take(1000));
        stream.extend_from_slice(b"\r\n");

        let result = parser.push(&stream);

        assert_eq!(result.commands.len(), 1);
        let line = result.commands[0].as_bytes();
        assert_eq!(line.len(), MAX_FRAME_LEN - FRAME_PREFIX.len());
        assert!(line.iter().all(|&b| b == b'X'));
        assert!(result.passthrough.is_empty());
        assert!(!parser.in_frame());
    }

    #[test]
    fn test_garbage_never_errors_and_resyncs() {
        let mut parser = LineParser::new();

        // Binary noise and repeated partial prefixes leave the parser idle,
        // never wedged.
        parser.push(b"\x00\x01\x02ATAT");
        let commands = parse_all(&mut parser, b"AT+GMR\r\n");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_bytes(), b"GMR");
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut parser = LineParser::new();
        parser.push(b"AT+CIPM");
        assert!(parser.in_frame());

        parser.reset();
        assert!(!parser.in_frame());

        let commands = parse_all(&mut parser, b"AT+GMR\r\n");
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_mixed_data_and_commands() {
        let mut parser = LineParser::new();
        let result = parser.push(b"dataAT+GMR\r\nmore");

        assert_eq!(result.commands.len(), 1);
        assert_eq!(result.commands[0].as_bytes(), b"GMR");
        assert_eq!(&result.passthrough[..], b"datamore");
    }
}

//! Command decoding: frame text into a verb, a kind and typed parameters.
//!
//! The four syntactic shapes, classified in priority order:
//!
//! | Shape | Kind |
//! |---|---|
//! | `AT+<VERB>=?` | [`CommandKind::Test`] |
//! | `AT+<VERB>=<p1>,<p2>,…` | [`CommandKind::Set`] |
//! | `AT+<VERB>?` | [`CommandKind::Query`] |
//! | `AT+<VERB>` | [`CommandKind::Execute`] |
//!
//! Set parameters are comma-separated; commas inside a matched pair of
//! double quotes do not split, and a token wrapped in exactly one quote pair
//! is stripped of it. Unquoted parameters pass through verbatim, surrounding
//! whitespace included.

use thiserror::Error;

/// Maximum verb length in bytes.
pub const MAX_VERB_LEN: usize = 31;

/// Maximum number of Set parameters; tokenization stops early once reached
/// and the remaining text is discarded.
pub const MAX_PARAMS: usize = 10;

/// Maximum length of a single parameter in bytes, after quote stripping.
pub const MAX_PARAM_LEN: usize = 63;

/// Command kind derived from frame syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `AT+CMD=?`
    Test,
    /// `AT+CMD?`
    Query,
    /// `AT+CMD=<params>`
    Set,
    /// `AT+CMD`
    Execute,
}

/// A decoded command: verb, kind and ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, e.g. `"CIPSTART"`. Case-sensitive.
    pub verb: String,
    /// Syntactic kind.
    pub kind: CommandKind,
    /// Set parameters in order, quotes stripped. Empty for other kinds.
    pub params: Vec<String>,
}

/// Why a recognized frame failed to decode. Reported to the caller; the
/// command is dropped, the parser is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame text is not valid UTF-8.
    #[error("command text is not valid UTF-8")]
    InvalidText,

    /// The extracted verb has zero length.
    #[error("empty command verb")]
    EmptyVerb,

    /// The extracted verb exceeds [`MAX_VERB_LEN`].
    #[error("verb of {len} bytes exceeds the {MAX_VERB_LEN}-byte maximum")]
    VerbTooLong {
        /// Length of the offending verb.
        len: usize,
    },

    /// A Set parameter exceeds [`MAX_PARAM_LEN`].
    #[error("parameter {index} of {len} bytes exceeds the {MAX_PARAM_LEN}-byte maximum")]
    ParamTooLong {
        /// Zero-based parameter position.
        index: usize,
        /// Length of the offending parameter.
        len: usize,
    },
}

impl Command {
    /// Decode command text (frame prefix and terminator already stripped).
    pub fn decode(text: &str) -> Result<Command, DecodeError> {
        if let Some(eq) = text.find('=') {
            let verb = validate_verb(&text[..eq])?;
            let rest = &text[eq + 1..];

            // `=?` is a Test probe; everything else after `=` is Set data.
            if rest.as_bytes().first() == Some(&b'?') {
                return Ok(Command {
                    verb,
                    kind: CommandKind::Test,
                    params: Vec::new(),
                });
            }

            let params = tokenize(rest)?;
            return Ok(Command {
                verb,
                kind: CommandKind::Set,
                params,
            });
        }

        if let Some(q) = text.find('?') {
            let verb = validate_verb(&text[..q])?;
            return Ok(Command {
                verb,
                kind: CommandKind::Query,
                params: Vec::new(),
            });
        }

        Ok(Command {
            verb: validate_verb(text)?,
            kind: CommandKind::Execute,
            params: Vec::new(),
        })
    }

    /// Number of decoded parameters.
    #[inline]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

fn validate_verb(name: &str) -> Result<String, DecodeError> {
    if name.is_empty() {
        return Err(DecodeError::EmptyVerb);
    }
    if name.len() > MAX_VERB_LEN {
        return Err(DecodeError::VerbTooLong { len: name.len() });
    }
    Ok(name.to_string())
}

/// Split Set parameter text on commas outside double quotes.
///
/// A trailing empty token (text ending in `,`, or no text at all) is
/// dropped; interior empty tokens are kept.
fn tokenize(text: &str) -> Result<Vec<String>, DecodeError> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => {
                push_param(&mut params, &text[start..i])?;
                start = i + 1;
                if params.len() == MAX_PARAMS {
                    return Ok(params);
                }
            }
            _ => {}
        }
    }

    let tail = &text[start..];
    if !tail.is_empty() {
        push_param(&mut params, tail)?;
    }

    Ok(params)
}

fn push_param(params: &mut Vec<String>, raw: &str) -> Result<(), DecodeError> {
    let stripped = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };

    if stripped.len() > MAX_PARAM_LEN {
        return Err(DecodeError::ParamTooLong {
            index: params.len(),
            len: stripped.len(),
        });
    }

    params.push(stripped.to_string());
    Ok(())
}

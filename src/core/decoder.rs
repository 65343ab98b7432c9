//! Incremental UTF-8 decoding for raw response streams.
//!
//! The transport delivers the reply as unframed bytes, and chunk boundaries
//! fall wherever the network put them, including in the middle of a
//! multi-byte scalar. [`StreamDecoder`] carries the incomplete trailing bytes
//! of one chunk into the next instead of emitting replacement characters, and
//! reports genuinely invalid sequences as errors rather than fragments.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream contained a byte sequence that is not valid UTF-8.
    Malformed { offset: usize },
    /// The stream ended partway through a multi-byte sequence.
    Truncated { pending: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed { offset } => write!(
                f,
                "invalid UTF-8 byte sequence in the response stream (offset {offset})"
            ),
            DecodeError::Truncated { pending } => write!(
                f,
                "response stream ended inside a multi-byte UTF-8 sequence ({pending} byte(s) unconsumed)"
            ),
        }
    }
}

impl StdError for DecodeError {}

/// Forward-only decoder over one response body. Not restartable: each
/// exchange builds a fresh decoder alongside its byte stream.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    residual: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one chunk, returning the text it completes. An incomplete
    /// trailing sequence is held back for the next call, so the returned
    /// string may be empty even for a non-empty chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        if self.residual.is_empty() {
            // Common case: the chunk is self-contained valid UTF-8.
            if let Ok(text) = std::str::from_utf8(chunk) {
                return Ok(text.to_owned());
            }
        }

        self.residual.extend_from_slice(chunk);
        match std::str::from_utf8(&self.residual) {
            Ok(text) => {
                let text = text.to_owned();
                self.residual.clear();
                Ok(text)
            }
            // `error_len() == None` means the buffer ends inside a sequence
            // that the next chunk may complete: emit the valid prefix and
            // retain the tail. Anything else is a real decode failure.
            Err(err) if err.error_len().is_none() => {
                let tail = self.residual.split_off(err.valid_up_to());
                let head = std::mem::replace(&mut self.residual, tail);
                match String::from_utf8(head) {
                    Ok(text) => Ok(text),
                    Err(err) => Err(DecodeError::Malformed {
                        offset: err.utf8_error().valid_up_to(),
                    }),
                }
            }
            Err(err) => Err(DecodeError::Malformed {
                offset: err.valid_up_to(),
            }),
        }
    }

    /// Ends the stream. Bytes still waiting for a continuation mean the body
    /// was cut off mid-sequence, which is a decode failure, not silence.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.residual.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::Truncated {
                pending: self.residual.len(),
            })
        }
    }
}

//! Transport encodings for structured values.
//!
//! Stored metadata is flat text. [`Codec`] turns that text into a [`Value`]
//! and back, so rewrite logic never depends on a particular encoding.

mod json;
mod php;

pub use json::JsonCodec;
pub use php::PhpCodec;

use crate::Value;

/// Errors raised while decoding an encoded value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input at byte {pos}")]
    UnexpectedEnd { pos: usize },

    #[error("unexpected input at byte {pos}: expected {expected}")]
    Unexpected { pos: usize, expected: String },

    #[error("invalid number at byte {pos}")]
    InvalidNumber { pos: usize },

    #[error("string at byte {pos} is not valid UTF-8")]
    InvalidUtf8 { pos: usize },

    #[error("unsupported tag '{tag}' at byte {pos}")]
    Unsupported { pos: usize, tag: char },

    #[error("trailing data after byte {pos}")]
    TrailingData { pos: usize },

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// A reversible text encoding for [`Value`] trees.
pub trait Codec {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn encode(&self, value: &Value) -> String;

    fn decode(&self, raw: &str) -> Result<Value, CodecError>;

    /// Decode `raw` when it is a complete encoded value, otherwise `None`.
    ///
    /// Stored metadata mixes plain strings with encoded blobs, so callers
    /// probe each value rather than assume an encoding.
    fn maybe_decode(&self, raw: &str) -> Option<Value> {
        self.decode(raw).ok()
    }

    /// Whether `raw` is framed like this encoding, decodable or not.
    ///
    /// Plain-text substitution on such a value would break its framing.
    fn looks_encoded(&self, raw: &str) -> bool;
}

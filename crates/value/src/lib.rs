//! Dynamic values for stored metadata and layout data.
//!
//! Metadata and page-builder layouts arrive as flattened strings in the
//! platform's transport encoding. This crate decodes them into a [`Value`]
//! tree, rewrites attachment references inside that tree, and encodes the
//! result back.

pub mod codec;
mod rewrite;
mod value;

pub use codec::{Codec, CodecError, JsonCodec, PhpCodec};
pub use rewrite::ReferenceMaps;
pub use value::{MapKey, Value};

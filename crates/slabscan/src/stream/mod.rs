//! Streaming partial-object contract between relay and client.

pub mod decode;
pub mod repair;

pub use decode::{PartialBatch, PartialCardRecord, StreamDecoder, Utf8ChunkBuf};
pub use repair::complete_partial_json;

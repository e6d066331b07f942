//! Model persistence.
//!
//! A saved model captures the fitted forest exactly (thresholds, children,
//! leaf values, base score), the feature schema, the fitted normalizer and
//! the training metadata. Two encodings share one set of [`schema`] types:
//!
//! - **Binary** (`.aprs`): 32-byte header with magic, version, flags,
//!   payload length, CRC32 and counts, then a Postcard payload
//! - **JSON**: the same schema as a readable document
//!
//! Loading detects the encoding and validates the structure before a
//! [`PriceModel`](crate::PriceModel) is handed out.

mod convert;
mod native;
pub mod schema;
mod store;

pub use native::{
    CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR, DeserializeError, FormatFlags, FormatHeader, HEADER_SIZE, MAGIC,
    NativeCodec, SerializeError, compute_checksum,
};
pub use store::{ModelFormat, ModelStore, RetryPolicy};

//! Built-in codecs.

pub mod blob;
pub mod structured;

pub use blob::{Blob, BlobCodec};
pub use structured::{BincodeCodec, JsonCodec};

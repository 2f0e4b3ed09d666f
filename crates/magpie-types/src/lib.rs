//! Foundation types for magpie.
//!
//! This crate provides the content-addressing and identity primitives used
//! throughout the magpie workspace. Every other magpie crate depends on
//! `magpie-types`.
//!
//! # Key Types
//!
//! - [`Fingerprint`]: BLAKE3 content hash of a byte buffer or schema
//! - [`ContentHasher`]: Domain-separated hasher producing fingerprints
//! - [`Resource`]: Immutable byte buffer with a lazily computed fingerprint
//! - [`ModelId`]: Name, schema fingerprint and provenance of a saved model
//! - [`Provenance`]: Source tag recorded alongside a saved model

pub mod error;
pub mod fingerprint;
pub mod hasher;
pub mod identity;
pub mod resource;

pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use hasher::{ContentHasher, HasherError};
pub use identity::{ModelId, Provenance};
pub use resource::Resource;

//! High-level SDK for magpie.
//!
//! [`Magpie`] bundles a store, a catalog of configuration records and a
//! snapshot of the default detectors behind a small API: configure types
//! once, then save and load instances by value.
//!
//! ```
//! use magpie_sdk::{impl_attributes, Attachment, CodecHandle, Magpie, Model};
//!
//! #[derive(Default)]
//! struct Point {
//!     x: Option<i64>,
//! }
//!
//! impl_attributes!(Point {} optional { x });
//!
//! impl Model for Point {
//!     fn attachment() -> Attachment {
//!         Attachment::new().artefact("x", CodecHandle::bincode::<i64>())
//!     }
//! }
//!
//! let mut magpie = Magpie::in_memory();
//! magpie.register::<Point>().unwrap();
//! let id = magpie.save(&Point { x: Some(3) }).unwrap();
//! let point: Point = magpie.load_new(&id).unwrap();
//! assert_eq!(point.x, Some(3));
//! ```

pub mod config;
pub mod error;
pub mod magpie;

#[cfg(test)]
mod scenarios;

pub use config::MagpieConfig;
pub use error::{SdkError, SdkResult};
pub use magpie::Magpie;

// Re-export key types
pub use magpie_core::{
    impl_attributes, Attachment, AttributeBag, Attributes, ArtefactDetector, BincodeCodec, Blob,
    ChildDetector, Classification, CodecHandle, ConflictPolicy, DetectionLevel, JsonCodec, Model,
    ViewHandle,
};
pub use magpie_store::{InMemoryModelStore, ModelStore, SharedStore};
pub use magpie_types::{ModelId, Provenance, Resource};

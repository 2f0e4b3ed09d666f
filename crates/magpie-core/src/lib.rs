//! Graph classification and the save/load walkers for magpie.
//!
//! A model is any value reachable through a [`ContainerView`]. Saving a
//! model classifies each of its members as an artefact (encoded with a
//! [`Codec`] and stored as a resource), a child (another model, saved
//! recursively) or ignored, then submits the resulting tree to a
//! [`ModelStore`](magpie_store::ModelStore). Loading resolves the tree and
//! classifies the target the same way, decoding artefacts back into place.
//!
//! # Key Types
//!
//! - [`Configuration`]: immutable per-type record built from [`Attachment`]s
//! - [`Catalog`]: caller-owned set of configuration records
//! - [`DetectorRegistry`]: ordered artefact and child detectors
//! - [`Classifier`]: read-only engine producing a [`Classification`]
//! - [`WalkContext`]: runs saves and loads against a store
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use magpie_core::{
//!     impl_attributes, Catalog, CodecHandle, DetectorRegistry, Model, Attachment, WalkContext,
//!     WalkOptions,
//! };
//! use magpie_store::InMemoryModelStore;
//!
//! #[derive(Default)]
//! struct Counter {
//!     x: i64,
//! }
//!
//! impl_attributes!(Counter { x });
//!
//! impl Model for Counter {
//!     fn attachment() -> Attachment {
//!         Attachment::new().artefact("x", CodecHandle::bincode::<i64>())
//!     }
//! }
//!
//! let mut catalog = Catalog::new();
//! let config = catalog.register::<Counter>().unwrap();
//! let defaults = DetectorRegistry::new();
//! let options = WalkOptions::default();
//! let ctx = WalkContext::new(&catalog, &defaults, Arc::new(InMemoryModelStore::new()), &options);
//!
//! let id = ctx.save(&config, &Counter { x: 3 }).unwrap();
//! let mut fresh = Counter::default();
//! ctx.load(&config, &id, &mut fresh).unwrap();
//! assert_eq!(fresh.x, 3);
//! ```

pub mod catalog;
pub mod classify;
pub mod codec;
pub mod codecs;
pub mod config;
pub mod detector;
pub mod error;
pub mod registry;
pub mod trace;
pub mod view;
pub mod views;
pub mod walk;

pub use catalog::Catalog;
pub use classify::{
    ChildSlot, ChildTarget, Classification, Classifier, Member, Origin, Slot, SlotKind,
    DEFAULT_MAX_DEPTH,
};
pub use codec::{BoxError, Codec, CodecError, CodecHandle, ErasedCodec};
pub use codecs::{BincodeCodec, Blob, BlobCodec, JsonCodec};
pub use config::{Attachment, ConflictPolicy, Configuration, Endpoint, Model, StorageLocation};
pub use detector::{ArtefactDetector, ChildDetector, Collection, CollectionMatch, Detector, Pattern};
pub use error::{CoreError, CoreResult};
pub use registry::{
    default_registry, register_default, ChildMatch, DetectionLevel, DetectorPlugin,
    DetectorRegistry,
};
pub use view::{AccessFault, ContainerView, ViewHandle, RESERVED_PREFIX};
pub use views::{
    is_fitted, AttributeBag, AttributeView, Attributes, FilteredView, KeyedMap, MapView,
    NamedMember, NamedSequenceView, SequenceView,
};
pub use walk::{WalkContext, WalkOptions};

// Re-exported for `inventory::submit!` in plugin crates.
pub use inventory;

//! Model tree storage for magpie.
//!
//! A save produces a [`ModelTree`]: the model's display name, one entry per
//! artefact slot pointing at an encoded resource, and one entry per child
//! slot holding the child's [`ModelId`](magpie_types::ModelId). Trees are
//! handed to a [`ModelStore`], which returns the identity the tree can later
//! be resolved by.
//!
//! # Staging
//!
//! Encoded artefacts are not held in memory for a whole save. Each one is
//! written to a [`StagingArea`] (a temporary directory, one file per
//! artefact) and the tree refers to the staged file. The store reads staged
//! files on submit and replaces the references with stored ones.
//!
//! # Storage Backends
//!
//! - [`InMemoryModelStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Trees are immutable once submitted; identities are content derived.
//! 2. Staged fingerprints are verified before a tree is accepted.
//! 3. A tree may only reference children that are already stored, unless
//!    the store is told that children live elsewhere.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod staging;
pub mod traits;
pub mod tree;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryModelStore;
pub use staging::StagingArea;
pub use traits::{ModelStore, SharedStore};
pub use tree::{ArtefactEntry, ChildEntry, ModelTree, ResourceRef};

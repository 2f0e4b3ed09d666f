//! Built-in container views.

pub mod attributes;
pub mod filtered;
pub mod map;
pub mod sequence;

pub use attributes::{AttributeBag, AttributeView, Attributes};
pub use filtered::{is_fitted, FilteredView};
pub use map::{KeyedMap, MapView};
pub use sequence::{NamedMember, NamedSequenceView, SequenceView};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Keys starting with this prefix belong to the protocol and are never
/// visited.
pub const RESERVED_PREFIX: &str = "__";

pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Faults raised while accessing a container through a view.
///
/// Classification treats a fault on a single key as "absent" and logs it.
/// Walkers surface faults that leave a save or load incomplete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessFault {
    #[error("view {view} cannot access a container of this type, expected {expected}")]
    ContainerType { view: String, expected: &'static str },

    #[error("unknown key {0}")]
    UnknownKey(String),

    #[error("value for {key} must be of type {expected}")]
    ValueType { key: String, expected: &'static str },

    #[error("{key} is computed and cannot be accessed directly")]
    Computed { key: String },

    #[error("view {view} does not support {op}")]
    Unsupported { view: String, op: &'static str },

    #[error("host object failed on {key}: {reason}")]
    Host { key: String, reason: String },
}

// ---------------------------------------------------------------------------
// ContainerView
// ---------------------------------------------------------------------------

/// Uniform mapping interface over one container shape.
///
/// Containers are passed type-erased; a view downcasts to the shape it
/// understands and reports [`AccessFault::ContainerType`] otherwise.
pub trait ContainerView: Send + Sync {
    /// Stable name, used for equality.
    fn name(&self) -> &str;

    /// Visitable member names in a stable order, without reserved names.
    fn keys(&self, container: &dyn Any) -> Result<Vec<String>, AccessFault>;

    /// Read a member. `Ok(None)` when the member is absent.
    fn get<'a>(&self, container: &'a dyn Any, key: &str)
        -> Result<Option<&'a dyn Any>, AccessFault>;

    fn get_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        key: &str,
    ) -> Result<Option<&'a mut dyn Any>, AccessFault>;

    fn set(&self, container: &mut dyn Any, key: &str, value: Box<dyn Any>)
        -> Result<(), AccessFault>;

    /// Build a fresh container of this shape from entries in key order.
    fn rebuild(&self, entries: Vec<(String, Box<dyn Any>)>) -> Result<Box<dyn Any>, AccessFault> {
        let _ = entries;
        Err(AccessFault::Unsupported {
            view: self.name().to_string(),
            op: "rebuild",
        })
    }

    /// Returns `true` if containers of this shape are replaced through
    /// [`rebuild`](ContainerView::rebuild) on load instead of being filled
    /// in place.
    fn replaces_wholesale(&self) -> bool {
        false
    }
}

/// Shared handle to a container view. Handles compare by view name.
#[derive(Clone)]
pub struct ViewHandle(Arc<dyn ContainerView>);

impl ViewHandle {
    pub fn new(view: impl ContainerView + 'static) -> Self {
        Self(Arc::new(view))
    }
}

impl std::ops::Deref for ViewHandle {
    type Target = dyn ContainerView;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for ViewHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.name() == other.0.name()
    }
}

impl Eq for ViewHandle {}

impl fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewHandle({})", self.0.name())
    }
}

// ---------------------------------------------------------------------------
// Downcast helpers for view implementations
// ---------------------------------------------------------------------------

pub fn downcast_container<'a, T: Any>(
    view: &str,
    container: &'a dyn Any,
) -> Result<&'a T, AccessFault> {
    container
        .downcast_ref::<T>()
        .ok_or_else(|| AccessFault::ContainerType {
            view: view.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

pub fn downcast_container_mut<'a, T: Any>(
    view: &str,
    container: &'a mut dyn Any,
) -> Result<&'a mut T, AccessFault> {
    container
        .downcast_mut::<T>()
        .ok_or_else(|| AccessFault::ContainerType {
            view: view.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// Unbox a value handed to `set` or `rebuild`.
pub fn downcast_value<T: Any>(key: &str, value: Box<dyn Any>) -> Result<T, AccessFault> {
    value
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| AccessFault::ValueType {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

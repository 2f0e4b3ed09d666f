use std::any::Any;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::view::{
    downcast_container, downcast_container_mut, is_reserved, AccessFault, ContainerView,
    ViewHandle,
};

/// Named-member access for plain structs and attribute bags.
///
/// Usually derived with [`impl_attributes!`](crate::impl_attributes).
pub trait Attributes: Any {
    fn attribute_names(&self) -> Vec<String>;

    fn attribute(&self, name: &str) -> Result<Option<&dyn Any>, AccessFault>;

    fn attribute_mut(&mut self, name: &str) -> Result<Option<&mut dyn Any>, AccessFault>;

    fn set_attribute(&mut self, name: &str, value: Box<dyn Any>) -> Result<(), AccessFault>;
}

/// Implement [`Attributes`] for a struct by listing its fields.
///
/// Fields under `optional { .. }` must be `Option<T>`; `None` reads as an
/// absent member and setting one stores `Some(value)`.
///
/// ```
/// use magpie_core::impl_attributes;
///
/// #[derive(Default)]
/// struct Linear {
///     weights: Vec<f32>,
///     bias: Option<f32>,
///     label: String,
/// }
///
/// impl_attributes!(Linear { weights, label } optional { bias });
/// ```
#[macro_export]
macro_rules! impl_attributes {
    ($ty:ty { $($field:ident),* $(,)? } $(optional { $($opt:ident),* $(,)? })?) => {
        impl $crate::Attributes for $ty {
            fn attribute_names(&self) -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![
                    $(::std::string::String::from(stringify!($field)),)*
                    $($(::std::string::String::from(stringify!($opt)),)*)?
                ]
            }

            fn attribute(
                &self,
                name: &str,
            ) -> ::std::result::Result<
                ::std::option::Option<&dyn ::std::any::Any>,
                $crate::AccessFault,
            > {
                match name {
                    $(stringify!($field) => ::std::result::Result::Ok(
                        ::std::option::Option::Some(&self.$field as &dyn ::std::any::Any),
                    ),)*
                    $($(stringify!($opt) => ::std::result::Result::Ok(
                        self.$opt.as_ref().map(|v| v as &dyn ::std::any::Any),
                    ),)*)?
                    _ => ::std::result::Result::Ok(::std::option::Option::None),
                }
            }

            fn attribute_mut(
                &mut self,
                name: &str,
            ) -> ::std::result::Result<
                ::std::option::Option<&mut dyn ::std::any::Any>,
                $crate::AccessFault,
            > {
                match name {
                    $(stringify!($field) => ::std::result::Result::Ok(
                        ::std::option::Option::Some(&mut self.$field as &mut dyn ::std::any::Any),
                    ),)*
                    $($(stringify!($opt) => ::std::result::Result::Ok(
                        self.$opt.as_mut().map(|v| v as &mut dyn ::std::any::Any),
                    ),)*)?
                    _ => ::std::result::Result::Ok(::std::option::Option::None),
                }
            }

            fn set_attribute(
                &mut self,
                name: &str,
                value: ::std::boxed::Box<dyn ::std::any::Any>,
            ) -> ::std::result::Result<(), $crate::AccessFault> {
                let _ = &value;
                match name {
                    $(stringify!($field) => {
                        self.$field = $crate::view::downcast_value(name, value)?;
                        ::std::result::Result::Ok(())
                    })*
                    $($(stringify!($opt) => {
                        self.$opt = ::std::option::Option::Some(
                            $crate::view::downcast_value(name, value)?,
                        );
                        ::std::result::Result::Ok(())
                    })*)?
                    _ => ::std::result::Result::Err($crate::AccessFault::UnknownKey(
                        ::std::string::String::from(name),
                    )),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// AttributeView
// ---------------------------------------------------------------------------

/// Container view over any [`Attributes`] type.
pub struct AttributeView<T> {
    name: String,
    _container: PhantomData<fn() -> T>,
}

impl<T: Attributes> AttributeView<T> {
    pub fn new() -> Self {
        Self {
            name: format!("attributes<{}>", std::any::type_name::<T>()),
            _container: PhantomData,
        }
    }
}

impl<T: Attributes> Default for AttributeView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Attributes> ContainerView for AttributeView<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self, container: &dyn Any) -> Result<Vec<String>, AccessFault> {
        let this = downcast_container::<T>(&self.name, container)?;
        Ok(this
            .attribute_names()
            .into_iter()
            .filter(|k| !is_reserved(k))
            .collect())
    }

    fn get<'a>(
        &self,
        container: &'a dyn Any,
        key: &str,
    ) -> Result<Option<&'a dyn Any>, AccessFault> {
        downcast_container::<T>(&self.name, container)?.attribute(key)
    }

    fn get_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        key: &str,
    ) -> Result<Option<&'a mut dyn Any>, AccessFault> {
        downcast_container_mut::<T>(&self.name, container)?.attribute_mut(key)
    }

    fn set(
        &self,
        container: &mut dyn Any,
        key: &str,
        value: Box<dyn Any>,
    ) -> Result<(), AccessFault> {
        downcast_container_mut::<T>(&self.name, container)?.set_attribute(key, value)
    }
}

impl ViewHandle {
    /// [`AttributeView`] for `T`.
    pub fn attributes<T: Attributes>() -> Self {
        Self::new(AttributeView::<T>::new())
    }
}

// ---------------------------------------------------------------------------
// AttributeBag
// ---------------------------------------------------------------------------

/// Dynamic attribute bag: named members of any type, in insertion order.
#[derive(Default)]
pub struct AttributeBag {
    entries: IndexMap<String, Box<dyn Any>>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Any>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Box::new(value));
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Attributes for AttributeBag {
    fn attribute_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn attribute(&self, name: &str) -> Result<Option<&dyn Any>, AccessFault> {
        Ok(self.entries.get(name).map(|v| &**v))
    }

    fn attribute_mut(&mut self, name: &str) -> Result<Option<&mut dyn Any>, AccessFault> {
        Ok(self.entries.get_mut(name).map(|v| &mut **v))
    }

    fn set_attribute(&mut self, name: &str, value: Box<dyn Any>) -> Result<(), AccessFault> {
        self.entries.insert(name.to_string(), value);
        Ok(())
    }
}

impl std::fmt::Debug for AttributeBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeBag")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Linear {
        weights: Vec<f32>,
        label: String,
        bias: Option<f32>,
    }

    crate::impl_attributes!(Linear { weights, label } optional { bias });

    #[derive(Default)]
    struct Empty;

    crate::impl_attributes!(Empty {});

    // -----------------------------------------------------------------------
    // impl_attributes!
    // -----------------------------------------------------------------------

    #[test]
    fn names_are_declaration_order() {
        let view = AttributeView::<Linear>::new();
        let keys = view.keys(&Linear::default()).unwrap();
        assert_eq!(keys, vec!["weights", "label", "bias"]);
    }

    #[test]
    fn optional_none_reads_as_absent() {
        let view = AttributeView::<Linear>::new();
        let mut model = Linear::default();
        assert!(view.get(&model, "bias").unwrap().is_none());

        view.set(&mut model, "bias", Box::new(0.5f32)).unwrap();
        assert_eq!(model.bias, Some(0.5));
        let bias = view.get(&model, "bias").unwrap().unwrap();
        assert_eq!(bias.downcast_ref::<f32>(), Some(&0.5));
    }

    #[test]
    fn get_mut_reaches_field() {
        let view = AttributeView::<Linear>::new();
        let mut model = Linear::default();
        let weights = view.get_mut(&mut model, "weights").unwrap().unwrap();
        weights.downcast_mut::<Vec<f32>>().unwrap().push(1.0);
        assert_eq!(model.weights, vec![1.0]);
    }

    #[test]
    fn set_rejects_wrong_type_and_unknown_key() {
        let view = AttributeView::<Linear>::new();
        let mut model = Linear::default();
        assert!(matches!(
            view.set(&mut model, "label", Box::new(3u8)),
            Err(AccessFault::ValueType { .. })
        ));
        assert_eq!(
            view.set(&mut model, "missing", Box::new(3u8)),
            Err(AccessFault::UnknownKey("missing".into()))
        );
    }

    #[test]
    fn unknown_key_reads_as_absent() {
        let view = AttributeView::<Linear>::new();
        assert!(view.get(&Linear::default(), "missing").unwrap().is_none());
    }

    #[test]
    fn wrong_container_is_a_fault() {
        let view = AttributeView::<Linear>::new();
        assert!(matches!(
            view.keys(&Empty),
            Err(AccessFault::ContainerType { .. })
        ));
    }

    #[test]
    fn empty_struct_has_no_keys() {
        let view = AttributeView::<Empty>::new();
        assert!(view.keys(&Empty).unwrap().is_empty());
        assert!(view.rebuild(Vec::new()).is_err());
        assert!(!view.replaces_wholesale());
    }

    // -----------------------------------------------------------------------
    // AttributeBag
    // -----------------------------------------------------------------------

    #[test]
    fn bag_keeps_insertion_order_and_skips_reserved() {
        let bag = AttributeBag::new()
            .with("z", 1u8)
            .with("__meta", "internal")
            .with("a", 2u8);
        let view = AttributeView::<AttributeBag>::new();
        assert_eq!(view.keys(&bag).unwrap(), vec!["z", "a"]);
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn bag_access_through_view() {
        let mut bag = AttributeBag::new().with("x", 3i64);
        let view = ViewHandle::attributes::<AttributeBag>();
        let x = view.get(&bag, "x").unwrap().unwrap();
        assert_eq!(x.downcast_ref::<i64>(), Some(&3));

        view.set(&mut bag, "y", Box::new(String::from("new"))).unwrap();
        assert_eq!(bag.get::<String>("y").map(String::as_str), Some("new"));
        assert!(bag.remove("x").is_some());
        assert!(!bag.contains("x"));
    }

    #[test]
    fn view_names_include_type() {
        let a = ViewHandle::attributes::<Linear>();
        let b = ViewHandle::attributes::<Linear>();
        let c = ViewHandle::attributes::<AttributeBag>();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

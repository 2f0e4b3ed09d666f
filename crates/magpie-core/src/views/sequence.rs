use std::any::Any;
use std::marker::PhantomData;

use crate::view::{
    downcast_container, downcast_container_mut, downcast_value, AccessFault, ContainerView,
    ViewHandle,
};

fn index_of(key: &str) -> Option<usize> {
    key.parse().ok()
}

// ---------------------------------------------------------------------------
// SequenceView
// ---------------------------------------------------------------------------

/// Container view over `Vec<T>` with keys `"0"`, `"1"`, ...
///
/// Sequences are replaced wholesale on load when they hold only artefacts.
pub struct SequenceView<T> {
    name: String,
    _element: PhantomData<fn() -> T>,
}

impl<T: Any> SequenceView<T> {
    pub fn new() -> Self {
        Self {
            name: format!("sequence<{}>", std::any::type_name::<T>()),
            _element: PhantomData,
        }
    }
}

impl<T: Any> Default for SequenceView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any> ContainerView for SequenceView<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self, container: &dyn Any) -> Result<Vec<String>, AccessFault> {
        let items = downcast_container::<Vec<T>>(&self.name, container)?;
        Ok((0..items.len()).map(|i| i.to_string()).collect())
    }

    fn get<'a>(
        &self,
        container: &'a dyn Any,
        key: &str,
    ) -> Result<Option<&'a dyn Any>, AccessFault> {
        let items = downcast_container::<Vec<T>>(&self.name, container)?;
        Ok(index_of(key)
            .and_then(|i| items.get(i))
            .map(|v| v as &dyn Any))
    }

    fn get_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        key: &str,
    ) -> Result<Option<&'a mut dyn Any>, AccessFault> {
        let items = downcast_container_mut::<Vec<T>>(&self.name, container)?;
        Ok(index_of(key)
            .and_then(|i| items.get_mut(i))
            .map(|v| v as &mut dyn Any))
    }

    fn set(
        &self,
        container: &mut dyn Any,
        key: &str,
        value: Box<dyn Any>,
    ) -> Result<(), AccessFault> {
        let items = downcast_container_mut::<Vec<T>>(&self.name, container)?;
        let index = index_of(key).ok_or_else(|| AccessFault::UnknownKey(key.to_string()))?;
        let value = downcast_value::<T>(key, value)?;
        match index.cmp(&items.len()) {
            std::cmp::Ordering::Less => items[index] = value,
            std::cmp::Ordering::Equal => items.push(value),
            std::cmp::Ordering::Greater => return Err(AccessFault::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn rebuild(&self, entries: Vec<(String, Box<dyn Any>)>) -> Result<Box<dyn Any>, AccessFault> {
        let items = entries
            .into_iter()
            .map(|(key, value)| downcast_value::<T>(&key, value))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Box::new(items))
    }

    fn replaces_wholesale(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// NamedSequenceView
// ---------------------------------------------------------------------------

/// A sequence element that carries its own member name, as framework
/// layers do.
pub trait NamedMember: Any {
    fn member_name(&self) -> &str;
}

/// Container view over `Vec<T>` keyed `<member_name>_<index>`.
///
/// Elements are filled in place on load; the sequence keeps its identity.
pub struct NamedSequenceView<T> {
    name: String,
    _element: PhantomData<fn() -> T>,
}

impl<T: NamedMember> NamedSequenceView<T> {
    pub fn new() -> Self {
        Self {
            name: format!("named-sequence<{}>", std::any::type_name::<T>()),
            _element: PhantomData,
        }
    }

    fn key_for(index: usize, item: &T) -> String {
        format!("{}_{}", item.member_name(), index)
    }

    /// Index encoded in `key`, if it names the element at that index.
    fn locate(items: &[T], key: &str) -> Option<usize> {
        let (_, suffix) = key.rsplit_once('_')?;
        let index = index_of(suffix)?;
        let item = items.get(index)?;
        (Self::key_for(index, item) == key).then_some(index)
    }
}

impl<T: NamedMember> Default for NamedSequenceView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NamedMember> ContainerView for NamedSequenceView<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self, container: &dyn Any) -> Result<Vec<String>, AccessFault> {
        let items = downcast_container::<Vec<T>>(&self.name, container)?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| Self::key_for(i, item))
            .collect())
    }

    fn get<'a>(
        &self,
        container: &'a dyn Any,
        key: &str,
    ) -> Result<Option<&'a dyn Any>, AccessFault> {
        let items = downcast_container::<Vec<T>>(&self.name, container)?;
        Ok(Self::locate(items, key).map(|i| &items[i] as &dyn Any))
    }

    fn get_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        key: &str,
    ) -> Result<Option<&'a mut dyn Any>, AccessFault> {
        let items = downcast_container_mut::<Vec<T>>(&self.name, container)?;
        Ok(match Self::locate(items, key) {
            Some(i) => Some(&mut items[i] as &mut dyn Any),
            None => None,
        })
    }

    fn set(
        &self,
        container: &mut dyn Any,
        key: &str,
        value: Box<dyn Any>,
    ) -> Result<(), AccessFault> {
        let items = downcast_container_mut::<Vec<T>>(&self.name, container)?;
        let index =
            Self::locate(items, key).ok_or_else(|| AccessFault::UnknownKey(key.to_string()))?;
        items[index] = downcast_value::<T>(key, value)?;
        Ok(())
    }

    fn rebuild(&self, entries: Vec<(String, Box<dyn Any>)>) -> Result<Box<dyn Any>, AccessFault> {
        let items = entries
            .into_iter()
            .map(|(key, value)| downcast_value::<T>(&key, value))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Box::new(items))
    }
}

impl ViewHandle {
    /// [`SequenceView`] over `Vec<T>`.
    pub fn sequence<T: Any>() -> Self {
        Self::new(SequenceView::<T>::new())
    }

    /// [`NamedSequenceView`] over `Vec<T>`.
    pub fn named_sequence<T: NamedMember>() -> Self {
        Self::new(NamedSequenceView::<T>::new())
    }
}

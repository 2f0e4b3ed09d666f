use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::view::{
    downcast_container, downcast_container_mut, downcast_value, AccessFault, ContainerView,
    ViewHandle,
};

/// String-keyed map shapes a [`MapView`] can present.
pub trait KeyedMap: Any {
    type Value: Any;

    /// Keys in a stable order.
    fn ordered_keys(&self) -> Vec<String>;
    fn value(&self, key: &str) -> Option<&Self::Value>;
    fn value_mut(&mut self, key: &str) -> Option<&mut Self::Value>;
    fn put(&mut self, key: String, value: Self::Value);
    fn from_entries(entries: Vec<(String, Self::Value)>) -> Self;
}

impl<V: Any> KeyedMap for BTreeMap<String, V> {
    type Value = V;

    fn ordered_keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn value(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn value_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn put(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn from_entries(entries: Vec<(String, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<V: Any> KeyedMap for IndexMap<String, V> {
    type Value = V;

    fn ordered_keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn value(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn value_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn put(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn from_entries(entries: Vec<(String, V)>) -> Self {
        entries.into_iter().collect()
    }
}

/// Hash maps have no stable iteration order, so keys are sorted.
impl<V: Any> KeyedMap for HashMap<String, V> {
    type Value = V;

    fn ordered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn value(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn value_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn put(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn from_entries(entries: Vec<(String, V)>) -> Self {
        entries.into_iter().collect()
    }
}

/// Container view over a string-keyed map.
pub struct MapView<M> {
    name: String,
    _map: PhantomData<fn() -> M>,
}

impl<M: KeyedMap> MapView<M> {
    pub fn new() -> Self {
        Self {
            name: format!("map<{}>", std::any::type_name::<M>()),
            _map: PhantomData,
        }
    }
}

impl<M: KeyedMap> Default for MapView<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: KeyedMap> ContainerView for MapView<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self, container: &dyn Any) -> Result<Vec<String>, AccessFault> {
        Ok(downcast_container::<M>(&self.name, container)?
            .ordered_keys()
            .into_iter()
            .filter(|k| !crate::view::is_reserved(k))
            .collect())
    }

    fn get<'a>(
        &self,
        container: &'a dyn Any,
        key: &str,
    ) -> Result<Option<&'a dyn Any>, AccessFault> {
        Ok(downcast_container::<M>(&self.name, container)?
            .value(key)
            .map(|v| v as &dyn Any))
    }

    fn get_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        key: &str,
    ) -> Result<Option<&'a mut dyn Any>, AccessFault> {
        Ok(downcast_container_mut::<M>(&self.name, container)?
            .value_mut(key)
            .map(|v| v as &mut dyn Any))
    }

    fn set(
        &self,
        container: &mut dyn Any,
        key: &str,
        value: Box<dyn Any>,
    ) -> Result<(), AccessFault> {
        let value = downcast_value::<M::Value>(key, value)?;
        downcast_container_mut::<M>(&self.name, container)?.put(key.to_string(), value);
        Ok(())
    }

    fn rebuild(&self, entries: Vec<(String, Box<dyn Any>)>) -> Result<Box<dyn Any>, AccessFault> {
        let entries = entries
            .into_iter()
            .map(|(key, value)| {
                let value = downcast_value::<M::Value>(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>, AccessFault>>()?;
        Ok(Box::new(M::from_entries(entries)))
    }

    fn replaces_wholesale(&self) -> bool {
        true
    }
}

impl ViewHandle {
    /// [`MapView`] over map type `M`.
    pub fn map<M: KeyedMap>() -> Self {
        Self::new(MapView::<M>::new())
    }
}

use std::any::Any;
use std::sync::Arc;

use crate::view::{AccessFault, ContainerView, ViewHandle};
use crate::views::Attributes;

type KeepFn = dyn Fn(&str) -> bool + Send + Sync;

/// Restricts the keys another view enumerates.
///
/// Only [`keys`](ContainerView::keys) is filtered. Reads and writes by key
/// go straight to the inner view, so declared slots outside the filter
/// still resolve.
pub struct FilteredView {
    name: String,
    inner: ViewHandle,
    keep: Arc<KeepFn>,
}

impl FilteredView {
    /// `filter` names the predicate; views compare by name, so two
    /// filters with the same name over the same inner view are equal.
    pub fn new(
        filter: &str,
        inner: ViewHandle,
        keep: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: format!("{filter}<{}>", inner.name()),
            inner,
            keep: Arc::new(keep),
        }
    }
}

impl ContainerView for FilteredView {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self, container: &dyn Any) -> Result<Vec<String>, AccessFault> {
        let mut keys = self.inner.keys(container)?;
        keys.retain(|k| (self.keep)(k));
        Ok(keys)
    }

    fn get<'a>(
        &self,
        container: &'a dyn Any,
        key: &str,
    ) -> Result<Option<&'a dyn Any>, AccessFault> {
        self.inner.get(container, key)
    }

    fn get_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        key: &str,
    ) -> Result<Option<&'a mut dyn Any>, AccessFault> {
        self.inner.get_mut(container, key)
    }

    fn set(
        &self,
        container: &mut dyn Any,
        key: &str,
        value: Box<dyn Any>,
    ) -> Result<(), AccessFault> {
        self.inner.set(container, key, value)
    }

    fn rebuild(&self, entries: Vec<(String, Box<dyn Any>)>) -> Result<Box<dyn Any>, AccessFault> {
        self.inner.rebuild(entries)
    }

    fn replaces_wholesale(&self) -> bool {
        self.inner.replaces_wholesale()
    }
}

/// Estimator convention: learned state lives in members whose name ends
/// with `_`. Hyperparameters and dunder names are skipped.
pub fn is_fitted(key: &str) -> bool {
    key.ends_with('_') && !key.starts_with("__")
}

impl ViewHandle {
    /// [`FilteredView`] over `inner`.
    pub fn filtered(
        filter: &str,
        inner: ViewHandle,
        keep: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(FilteredView::new(filter, inner, keep))
    }

    /// Attributes of `T` that pass [`is_fitted`].
    pub fn fitted_attributes<T: Attributes>() -> Self {
        Self::filtered("fitted", Self::attributes::<T>(), is_fitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ridge {
        alpha: f64,
        coef_: Vec<f64>,
        intercept_: f64,
        n_iter: u32,
    }

    crate::impl_attributes!(Ridge { alpha, coef_, intercept_, n_iter });

    #[test]
    fn fitted_keys_only() {
        let view = ViewHandle::fitted_attributes::<Ridge>();
        assert_eq!(
            view.keys(&Ridge::default()).unwrap(),
            vec!["coef_", "intercept_"]
        );
        assert!(view.name().starts_with("fitted<attributes<"));
    }

    #[test]
    fn access_is_not_filtered() {
        let view = ViewHandle::fitted_attributes::<Ridge>();
        let mut ridge = Ridge {
            alpha: 0.5,
            ..Ridge::default()
        };
        let alpha = view.get(&ridge, "alpha").unwrap().unwrap();
        assert_eq!(alpha.downcast_ref::<f64>(), Some(&0.5));
        view.set(&mut ridge, "intercept_", Box::new(2.0f64)).unwrap();
        assert_eq!(ridge.intercept_, 2.0);
    }

    #[test]
    fn dunder_names_are_not_fitted() {
        assert!(is_fitted("coef_"));
        assert!(!is_fitted("__dict__"));
        assert!(!is_fitted("alpha"));
        assert!(!is_fitted("_private"));
    }

    #[test]
    fn equality_follows_filter_and_inner_names() {
        let a = ViewHandle::fitted_attributes::<Ridge>();
        let b = ViewHandle::filtered("fitted", ViewHandle::attributes::<Ridge>(), |_| true);
        let c = ViewHandle::filtered("public", ViewHandle::attributes::<Ridge>(), is_fitted);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn wholesale_follows_inner_view() {
        let view = ViewHandle::filtered("even", ViewHandle::sequence::<u8>(), |k| {
            k.parse::<usize>().is_ok_and(|i| i % 2 == 0)
        });
        assert!(view.replaces_wholesale());
        assert_eq!(view.keys(&vec![1u8, 2, 3]).unwrap(), vec!["0", "2"]);
    }
}

//! Typed build requests

use crate::context::BuildRequest;
use crate::error::{BuildError, Result};
use crate::factory::FactorySet;
use crate::spec_builder::SpecificationBuilder;
use forge_accessor::{Bean, BeanType};
use forge_model::{Criteria, Overrides, Params, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Fluent request for one `T`
///
/// Each call returns a new builder; the original is left untouched so a
/// partially configured builder can be reused as a template.
pub struct Builder<'f, T> {
    factories: &'f FactorySet,
    request: BuildRequest,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Builder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories,
            request: self.request.clone(),
            _marker: PhantomData,
        }
    }
}

impl<'f, T: Bean> Builder<'f, T> {
    pub(crate) fn new(factories: &'f FactorySet) -> Self {
        Self {
            factories,
            request: BuildRequest::new(BeanType::of::<T>()),
            _marker: PhantomData,
        }
    }

    /// Set a property; dotted keys resolve a referenced object
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.overrides.insert(name.into(), value.into());
        self
    }

    /// Set several properties at once
    #[must_use]
    pub fn properties(mut self, overrides: Overrides) -> Self {
        self.request.overrides.extend(overrides);
        self
    }

    /// Set a build parameter, handed to constructors, hooks and definitions
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.params.insert(name.into(), value.into());
        self
    }

    /// Set several build parameters at once
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.request.params.extend(params);
        self
    }

    /// Build through a named extension
    #[must_use]
    pub fn extend(mut self, name: impl Into<String>) -> Self {
        self.request.extension = Some(name.into());
        self
    }

    /// Apply a named combination; combinations apply in the order given
    #[must_use]
    pub fn combine(mut self, name: impl Into<String>) -> Self {
        self.request.combinations.push(name.into());
        self
    }

    /// Add call-site specifications, registered after every type-level one
    #[must_use]
    pub fn spec(
        mut self,
        definition: impl Fn(&mut SpecificationBuilder<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.request.specs.push(Arc::new(definition));
        self
    }

    /// Build the object and, when configured, save its tree
    ///
    /// # Errors
    /// Fails with the first [`BuildError`] raised anywhere in the tree.
    pub fn build(&self) -> Result<Arc<T>> {
        let object = self.factories.run(self.request.clone())?;
        object.downcast::<T>().ok_or(BuildError::UnexpectedType {
            expected: std::any::type_name::<T>(),
            actual: object.type_tag().name(),
        })
    }

    /// Saved objects matching this builder's direct properties
    ///
    /// # Errors
    /// Returns [`BuildError::Repository`] if the repository fails.
    pub fn query(&self) -> Result<Vec<Arc<T>>> {
        let criteria: Criteria = self.request.overrides.clone();
        self.factories.query::<T>(&criteria)
    }
}

//! Persistence collaborator
//!
//! Provides [`DataRepository`], the boundary through which references are
//! queried and finished build trees are saved, and [`InMemoryRepository`].

use crate::error::RepositoryError;
use forge_accessor::{matches, BeanType};
use forge_model::{Criteria, ObjectRef};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::TypeId;

/// Save and query built objects
pub trait DataRepository: Send + Sync {
    /// Store an object
    ///
    /// # Errors
    /// Returns [`RepositoryError`] if the backend refuses it.
    fn save(&self, object: ObjectRef) -> Result<(), RepositoryError>;

    /// Objects of `bean` matching every criterion, in save order
    ///
    /// Criteria keys are property paths and may be dotted into referenced
    /// objects.
    ///
    /// # Errors
    /// Returns [`RepositoryError`] if the backend cannot be read.
    fn query(&self, bean: BeanType, criteria: &Criteria) -> Result<Vec<ObjectRef>, RepositoryError>;

    /// Forget everything
    fn clear(&self);
}

/// Repository keeping objects in memory, per type, in save order
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    objects: RwLock<IndexMap<TypeId, Vec<ObjectRef>>>,
}

impl InMemoryRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().values().map(Vec::len).sum()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored object of `bean`, in save order
    #[must_use]
    pub fn all(&self, bean: BeanType) -> Vec<ObjectRef> {
        self.objects
            .read()
            .get(&bean.id())
            .cloned()
            .unwrap_or_default()
    }
}

impl DataRepository for InMemoryRepository {
    fn save(&self, object: ObjectRef) -> Result<(), RepositoryError> {
        let mut objects = self.objects.write();
        let bucket = objects.entry(object.type_tag().id()).or_default();
        if !bucket.contains(&object) {
            bucket.push(object);
        }
        Ok(())
    }

    fn query(&self, bean: BeanType, criteria: &Criteria) -> Result<Vec<ObjectRef>, RepositoryError> {
        let class = bean.class();
        let objects = self.objects.read();
        Ok(objects
            .get(&bean.id())
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|object| matches(class.as_ref(), object.as_any(), criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn clear(&self) {
        self.objects.write().clear();
    }
}

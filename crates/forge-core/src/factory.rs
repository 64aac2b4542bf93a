//! Factories: instantiation, sequences and registered specifications
//!
//! One [`Factory`] exists per bean type, created the first time the type is
//! touched through a [`FactorySet`]. Named extensions share the factory's
//! sequence counter and constructor.

use crate::builder::Builder;
use crate::config::ForgeConfig;
use crate::context::{build_tree, BuildRequest};
use crate::error::{BuildError, Result};
use crate::repository::{DataRepository, InMemoryRepository};
use crate::spec_builder::{SpecDefinition, SpecificationBuilder};
use dashmap::DashMap;
use forge_accessor::{Bean, BeanAccessor, BeanType, Converter};
use forge_model::{Criteria, ObjectRef, Overrides, Params, Value, ValueKind};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Constructor = Arc<dyn Fn(u64, &Params) -> Box<dyn Any + Send + Sync> + Send + Sync>;
type Hook = Arc<dyn Fn(&mut dyn Any, u64, &Params) + Send + Sync>;

#[derive(Clone, Default)]
struct Extension {
    hooks: Vec<Hook>,
    definitions: Vec<SpecDefinition>,
}

struct FactoryState {
    constructor: Constructor,
    hooks: Vec<Hook>,
    definitions: Vec<SpecDefinition>,
    combinations: IndexMap<String, SpecDefinition>,
    extensions: IndexMap<String, Extension>,
}

/// Instantiates one bean type and owns its sequence counter
pub struct Factory {
    bean: BeanType,
    sequence: Arc<AtomicU64>,
    state: RwLock<FactoryState>,
}

fn typed_hook<T: Bean>(hook: impl Fn(&mut T, u64, &Params) + Send + Sync + 'static) -> Hook {
    Arc::new(move |object, sequence, params| {
        if let Some(object) = object.downcast_mut::<T>() {
            hook(object, sequence, params);
        }
    })
}

impl Factory {
    fn new(bean: BeanType, sequence_start: u64) -> Self {
        Self {
            bean,
            sequence: Arc::new(AtomicU64::new(sequence_start)),
            state: RwLock::new(FactoryState {
                constructor: Arc::new(move |_, _| bean.new_instance()),
                hooks: Vec::new(),
                definitions: Vec::new(),
                combinations: IndexMap::new(),
                extensions: IndexMap::new(),
            }),
        }
    }

    /// Type this factory builds
    #[inline]
    #[must_use]
    pub fn bean(&self) -> BeanType {
        self.bean
    }

    /// Issue the next sequence number
    ///
    /// Atomic and gap-free across threads; extensions draw from the same
    /// counter.
    #[inline]
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Sequence number the next object will receive
    #[inline]
    #[must_use]
    pub fn peek_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Names of registered extensions
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        self.state.read().extensions.keys().cloned().collect()
    }

    /// Names of defined combinations
    #[must_use]
    pub fn combinations(&self) -> Vec<String> {
        self.state.read().combinations.keys().cloned().collect()
    }

    pub(crate) fn check_extension(&self, extension: Option<&str>) -> Result<()> {
        match extension {
            Some(name) if !self.state.read().extensions.contains_key(name) => {
                Err(BuildError::UnknownExtension {
                    type_name: self.bean.name(),
                    name: name.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Construct and run hooks: the factory's own, then the extension's
    pub(crate) fn instantiate(
        &self,
        extension: Option<&str>,
        sequence: u64,
        params: &Params,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        let (constructor, hooks) = {
            let state = self.state.read();
            let mut hooks = state.hooks.clone();
            if let Some(name) = extension {
                hooks.extend(self.extension(&state, name)?.hooks.iter().cloned());
            }
            (Arc::clone(&state.constructor), hooks)
        };

        let mut object = constructor(sequence, params);
        for hook in &hooks {
            hook(&mut *object, sequence, params);
        }
        Ok(object)
    }

    /// Specification definitions in collection order: type-level, then the
    /// extension's, then each requested combination
    pub(crate) fn definitions(
        &self,
        extension: Option<&str>,
        combinations: &[String],
    ) -> Result<Vec<SpecDefinition>> {
        let state = self.state.read();
        let mut definitions = state.definitions.clone();
        if let Some(name) = extension {
            definitions.extend(self.extension(&state, name)?.definitions.iter().cloned());
        }
        for name in combinations {
            let combination = state
                .combinations
                .get(name)
                .ok_or_else(|| BuildError::UnknownCombination {
                    type_name: self.bean.name(),
                    name: name.clone(),
                })?;
            definitions.push(Arc::clone(combination));
        }
        Ok(definitions)
    }

    fn extension<'s>(&self, state: &'s FactoryState, name: &str) -> Result<&'s Extension> {
        state
            .extensions
            .get(name)
            .ok_or_else(|| BuildError::UnknownExtension {
                type_name: self.bean.name(),
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Factory")
            .field("bean", &self.bean)
            .field("next_sequence", &self.peek_sequence())
            .field("definitions", &state.definitions.len())
            .field("combinations", &state.combinations.keys().collect::<Vec<_>>())
            .field("extensions", &state.extensions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Process-wide registry of factories, accessor service and repository
///
/// Safe to share between threads: factories live in a concurrent map,
/// sequences are atomic, and every build works on its own session.
///
/// # Example
///
/// ```rust
/// use forge_accessor::{Bean, BeanClass};
/// use forge_core::FactorySet;
///
/// #[derive(Debug, Default)]
/// struct Product {
///     price: i64,
///     tax: i64,
/// }
///
/// impl Bean for Product {
///     fn describe() -> BeanClass<Self> {
///         Self::class()
///             .property("price", |p| p.price, |p, v| p.price = v)
///             .property("tax", |p| p.tax, |p, v| p.tax = v)
///     }
/// }
///
/// let factories = FactorySet::new();
/// factories.define::<Product>(|spec| {
///     spec.property("tax").depends_on("price", |price| price.as_int().map(|p| p / 10));
/// });
///
/// let product = factories.to_build::<Product>().property("price", 10000).build().unwrap();
/// assert_eq!(product.tax, 1000);
/// ```
pub struct FactorySet {
    config: ForgeConfig,
    factories: DashMap<TypeId, Arc<Factory>>,
    accessor: RwLock<BeanAccessor>,
    repository: Arc<dyn DataRepository>,
}

impl FactorySet {
    /// Registry with default configuration and an in-memory repository
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ForgeConfig::default())
    }

    /// Registry with explicit configuration
    #[must_use]
    pub fn with_config(config: ForgeConfig) -> Self {
        Self {
            config,
            factories: DashMap::new(),
            accessor: RwLock::new(BeanAccessor::new()),
            repository: Arc::new(InMemoryRepository::new()),
        }
    }

    /// Replace the persistence collaborator
    #[must_use]
    pub fn with_repository(mut self, repository: Arc<dyn DataRepository>) -> Self {
        self.repository = repository;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Persistence collaborator
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn DataRepository> {
        &self.repository
    }

    /// Factory for `T`, created on first use
    #[must_use]
    pub fn factory<T: Bean>(&self) -> Arc<Factory> {
        self.factory_of(BeanType::of::<T>())
    }

    /// Factory for a type known only at runtime, as reached through
    /// reference properties
    #[must_use]
    pub fn factory_of(&self, bean: BeanType) -> Arc<Factory> {
        Arc::clone(
            self.factories
                .entry(bean.id())
                .or_insert_with(|| Arc::new(Factory::new(bean, self.config.sequence_start)))
                .value(),
        )
    }

    /// Register type-level specifications for `T`
    pub fn define<T: Bean>(
        &self,
        definition: impl Fn(&mut SpecificationBuilder<'_>) + Send + Sync + 'static,
    ) -> &Self {
        self.factory::<T>()
            .state
            .write()
            .definitions
            .push(Arc::new(definition));
        self
    }

    /// Register a named specification set for `T`, applied on request
    pub fn define_combination<T: Bean>(
        &self,
        name: impl Into<String>,
        definition: impl Fn(&mut SpecificationBuilder<'_>) + Send + Sync + 'static,
    ) -> &Self {
        self.factory::<T>()
            .state
            .write()
            .combinations
            .insert(name.into(), Arc::new(definition));
        self
    }

    /// Register a named extension of `T` whose hook runs after `T`'s own
    pub fn extend<T: Bean>(
        &self,
        name: impl Into<String>,
        hook: impl Fn(&mut T, u64, &Params) + Send + Sync + 'static,
    ) -> &Self {
        self.factory::<T>()
            .state
            .write()
            .extensions
            .entry(name.into())
            .or_default()
            .hooks
            .push(typed_hook(hook));
        self
    }

    /// Register specifications collected only when building extension `name`
    pub fn define_extension<T: Bean>(
        &self,
        name: impl Into<String>,
        definition: impl Fn(&mut SpecificationBuilder<'_>) + Send + Sync + 'static,
    ) -> &Self {
        self.factory::<T>()
            .state
            .write()
            .extensions
            .entry(name.into())
            .or_default()
            .definitions
            .push(Arc::new(definition));
        self
    }

    /// Replace the constructor of `T`, keeping its specifications and sequence
    pub fn register<T: Bean>(
        &self,
        constructor: impl Fn(u64, &Params) -> T + Send + Sync + 'static,
    ) -> &Self {
        self.factory::<T>().state.write().constructor =
            Arc::new(move |sequence, params| Box::new(constructor(sequence, params)));
        self
    }

    /// Run `hook` on every new `T`, right after construction
    pub fn on_build<T: Bean>(&self, hook: impl Fn(&mut T, u64, &Params) + Send + Sync + 'static) -> &Self {
        self.factory::<T>().state.write().hooks.push(typed_hook(hook));
        self
    }

    /// Add conversions to the shared accessor service
    pub fn register_converter(&self, register: impl FnOnce(&mut Converter)) -> &Self {
        register(self.accessor.write().converter_mut());
        self
    }

    /// Replace the default for properties storing `kind`
    pub fn register_default(
        &self,
        kind: ValueKind,
        default: impl Fn(&str, u64) -> Value + Send + Sync + 'static,
    ) -> &Self {
        self.accessor.write().defaults_mut().register(kind, default);
        self
    }

    /// Issue the next sequence number of `T`
    pub fn next_sequence<T: Bean>(&self) -> u64 {
        self.factory::<T>().next_sequence()
    }

    /// Start a build of `T`
    #[must_use]
    pub fn to_build<T: Bean>(&self) -> Builder<'_, T> {
        Builder::new(self)
    }

    /// Build one `T` from overrides and params
    ///
    /// # Errors
    /// Fails with any [`BuildError`] raised while building the tree; nothing
    /// is saved in that case.
    pub fn build<T: Bean>(&self, overrides: Overrides, params: Params) -> Result<Arc<T>> {
        self.to_build::<T>()
            .properties(overrides)
            .params(params)
            .build()
    }

    /// Saved objects of `T` matching `criteria`, without building
    ///
    /// # Errors
    /// Returns [`BuildError::Repository`] if the repository fails.
    pub fn query<T: Bean>(&self, criteria: &Criteria) -> Result<Vec<Arc<T>>> {
        let bean = BeanType::of::<T>();
        let criteria = self.accessor.read().convert_criteria(bean, criteria);
        self.repository
            .query(bean, &criteria)?
            .into_iter()
            .map(|object| {
                object.downcast::<T>().ok_or(BuildError::UnexpectedType {
                    expected: bean.name(),
                    actual: object.type_tag().name(),
                })
            })
            .collect()
    }

    /// Forget every saved object
    pub fn clear_repository(&self) {
        self.repository.clear();
    }

    /// Snapshot of the accessor service for one build
    pub(crate) fn accessor(&self) -> BeanAccessor {
        self.accessor.read().clone()
    }

    pub(crate) fn run(&self, request: BuildRequest) -> Result<ObjectRef> {
        build_tree(self, request)
    }
}

impl Default for FactorySet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FactorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorySet")
            .field("config", &self.config)
            .field("factories", &self.factories.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_accessor::BeanClass;
    use std::collections::HashSet;

    #[derive(Debug, Default)]
    struct Counter {
        label: String,
        hits: i64,
    }

    impl Bean for Counter {
        fn describe() -> BeanClass<Self> {
            Self::class()
                .property("label", |c| c.label.clone(), |c, v| c.label = v)
                .property("hits", |c| c.hits, |c, v| c.hits = v)
        }
    }

    #[test]
    fn sequences_start_at_configured_base() {
        let factories = FactorySet::with_config(ForgeConfig::new().with_sequence_start(10));
        assert_eq!(factories.next_sequence::<Counter>(), 10);
        assert_eq!(factories.next_sequence::<Counter>(), 11);
    }

    #[test]
    fn factory_is_created_once() {
        let factories = FactorySet::new();
        assert!(Arc::ptr_eq(&factories.factory::<Counter>(), &factories.factory::<Counter>()));
        assert!(Arc::ptr_eq(
            &factories.factory::<Counter>(),
            &factories.factory_of(BeanType::of::<Counter>())
        ));
    }

    #[test]
    fn hooks_run_in_order_with_extension_last() {
        let factories = FactorySet::new();
        factories
            .on_build::<Counter>(|c, seq, _| c.label = format!("base{seq}"))
            .extend::<Counter>("loud", |c, _, _| c.label.push('!'));
        let factory = factories.factory::<Counter>();

        let plain = factory.instantiate(None, 1, &Params::new()).unwrap();
        assert_eq!(plain.downcast_ref::<Counter>().unwrap().label, "base1");

        let loud = factory.instantiate(Some("loud"), 2, &Params::new()).unwrap();
        assert_eq!(loud.downcast_ref::<Counter>().unwrap().label, "base2!");
        assert_eq!(factory.extensions(), vec!["loud".to_string()]);
    }

    #[test]
    fn unknown_names_fail() {
        let factories = FactorySet::new();
        let factory = factories.factory::<Counter>();
        assert!(matches!(
            factory.instantiate(Some("missing"), 1, &Params::new()),
            Err(BuildError::UnknownExtension { .. })
        ));
        assert!(matches!(
            factory.definitions(None, &["missing".to_string()]),
            Err(BuildError::UnknownCombination { .. })
        ));
    }

    #[test]
    fn register_replaces_constructor_only() {
        let factories = FactorySet::new();
        factories
            .define::<Counter>(|spec| spec.property("label").value(|| "spec"))
            .register::<Counter>(|seq, _| Counter {
                label: String::new(),
                hits: i64::try_from(seq).unwrap_or_default() * 100,
            });
        let factory = factories.factory::<Counter>();
        let object = factory.instantiate(None, 2, &Params::new()).unwrap();
        assert_eq!(object.downcast_ref::<Counter>().unwrap().hits, 200);
        assert_eq!(factory.definitions(None, &[]).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_sequences_are_gap_free() {
        let factories = FactorySet::new();
        let issued: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..100)
                            .map(|_| factories.next_sequence::<Counter>())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<u64> = issued.iter().copied().collect();
        assert_eq!(unique.len(), 800);
        assert_eq!(unique.iter().min(), Some(&1));
        assert_eq!(unique.iter().max(), Some(&800));
    }
}

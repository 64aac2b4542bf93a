//! Per-object build orchestration
//!
//! An [`ObjectContext`] drives one object from overrides to a finished,
//! shared instance:
//! 1. dotted overrides become references, queried first and built on miss
//! 2. literals, then type-level, extension, combination and call-site
//!    specifications are registered into the session
//! 3. the factory instantiates the object with its sequence number
//! 4. every specified property is resolved and assigned
//! 5. the accessor fills remaining properties with defaults
//! 6. the object is frozen, linked to the children it created, and kept
//!    for saving

use crate::error::{BuildError, Result};
use crate::factory::{Factory, FactorySet};
use crate::session::BuildSession;
use crate::spec::Specification;
use crate::spec_builder::{SpecDefinition, SpecificationBuilder};
use forge_accessor::{path_type, BeanAccessor, BeanType, ErasedBeanClass, PropertyType};
use forge_model::{Criteria, ObjectRef, Overrides, Params, PropertyChain, Value};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Everything needed to build one object
#[derive(Clone)]
pub(crate) struct BuildRequest {
    pub(crate) bean: BeanType,
    pub(crate) extension: Option<String>,
    pub(crate) overrides: Overrides,
    pub(crate) params: Params,
    pub(crate) combinations: Vec<String>,
    pub(crate) specs: Vec<SpecDefinition>,
}

impl BuildRequest {
    pub(crate) fn new(bean: BeanType) -> Self {
        Self {
            bean,
            extension: None,
            overrides: Overrides::new(),
            params: Params::new(),
            combinations: Vec::new(),
            specs: Vec::new(),
        }
    }
}

/// Caller-supplied override after parsing its key
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyOverride {
    /// Value for a property of the object itself
    Direct {
        /// Property name
        name: String,
        /// Value to assign
        value: Value,
    },
    /// Criterion on the object referenced through `base`
    Reference {
        /// Reference property on the object itself
        base: String,
        /// Path inside the referenced object
        remainder: PropertyChain,
        /// Expected value at that path
        value: Value,
    },
}

impl PropertyOverride {
    /// Parse an override key
    ///
    /// # Errors
    /// Returns [`BuildError::InvalidChain`] for malformed keys.
    pub fn parse(key: &str, value: Value) -> Result<Self> {
        let chain: PropertyChain = key.parse()?;
        let (base, remainder) = chain.split_first();
        Ok(match remainder {
            None => Self::Direct {
                name: base.to_string(),
                value,
            },
            Some(remainder) => Self::Reference {
                base: base.to_string(),
                remainder,
                value,
            },
        })
    }
}

/// Build state of one object in a build tree
///
/// Carries its full path from the root so every chain it registers is
/// computed once, top-down.
pub struct ObjectContext {
    bean: BeanType,
    factory: Arc<Factory>,
    extension: Option<String>,
    sequence: u64,
    params: Params,
    overrides: Vec<PropertyOverride>,
    combinations: Vec<String>,
    specs: Vec<SpecDefinition>,
    prefix: Vec<String>,
    parent: Option<BeanType>,
}

impl ObjectContext {
    fn new(
        factories: &FactorySet,
        request: BuildRequest,
        prefix: Vec<String>,
        parent: Option<BeanType>,
    ) -> Result<Self> {
        let factory = factories.factory_of(request.bean);
        factory.check_extension(request.extension.as_deref())?;
        let overrides = request
            .overrides
            .into_iter()
            .map(|(key, value)| PropertyOverride::parse(&key, value))
            .collect::<Result<Vec<_>>>()?;
        let sequence = factory.next_sequence();

        Ok(Self {
            bean: request.bean,
            factory,
            extension: request.extension,
            sequence,
            params: request.params,
            overrides,
            combinations: request.combinations,
            specs: request.specs,
            prefix,
            parent,
        })
    }

    /// Type being built
    #[inline]
    #[must_use]
    pub fn bean(&self) -> BeanType {
        self.bean
    }

    /// Sequence number issued for this object
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Build parameters
    #[inline]
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Parsed overrides in caller order
    #[inline]
    #[must_use]
    pub fn overrides(&self) -> &[PropertyOverride] {
        &self.overrides
    }

    /// Path from the root object, empty for the root
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Property of the parent this object is built for
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        self.prefix.last().map(String::as_str)
    }

    /// Type of the parent object, `None` for the root
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<BeanType> {
        self.parent
    }

    fn chain(&self, name: &str) -> PropertyChain {
        PropertyChain::under(&self.prefix, name)
    }

    fn build(self, env: &BuildEnv<'_>, session: &mut BuildSession) -> Result<ObjectRef> {
        let class = self.bean.class();
        let children = self.resolve_references(env, session, class.as_ref())?;
        self.collect_specifications(session)?;

        let mut object =
            self.factory
                .instantiate(self.extension.as_deref(), self.sequence, &self.params)?;

        let mut assigned = HashSet::new();
        for chain in session.chains_owned_by(&self.prefix) {
            let Some(value) = session.resolve(&chain)? else {
                continue;
            };
            let name = chain.name();
            env.accessor
                .set_property(class.as_ref(), &mut *object, name, value)
                .map_err(|e| BuildError::from_access(class.type_name(), name, e))?;
            assigned.insert(name.to_string());
        }

        env.accessor
            .assign_defaults(class.as_ref(), &mut *object, self.sequence, |name| {
                assigned.contains(name)
            })
            .map_err(|e| {
                let property = e.property().unwrap_or_default().to_string();
                BuildError::from_access(class.type_name(), &property, e)
            })?;

        let object = ObjectRef::from_boxed(self.bean.tag(), object);
        for child in children {
            session.tree_mut().add_node(&object, child);
        }
        session.record(&self.prefix, class.as_ref(), &object);
        session.cache_for_saving(object.clone());

        tracing::trace!(
            bean = self.bean.name(),
            sequence = self.sequence,
            path = %self.prefix.join("."),
            "object built"
        );
        Ok(object)
    }

    /// Turn dotted overrides into reference values, returning the children
    /// created for them
    fn resolve_references(
        &self,
        env: &BuildEnv<'_>,
        session: &mut BuildSession,
        class: &dyn ErasedBeanClass,
    ) -> Result<Vec<ObjectRef>> {
        let mut groups: IndexMap<&str, Criteria> = IndexMap::new();
        for entry in &self.overrides {
            match entry {
                PropertyOverride::Direct { name, value } => {
                    if let (Value::Object(object), Some(related)) = (
                        value,
                        class.property_type(name).and_then(PropertyType::referenced),
                    ) {
                        session.record(self.chain(name).segments(), related.class().as_ref(), object);
                    }
                    session.register(Specification::literal(self.chain(name), value.clone()));
                }
                PropertyOverride::Reference {
                    base,
                    remainder,
                    value,
                } => {
                    groups
                        .entry(base.as_str())
                        .or_default()
                        .insert(remainder.to_string(), value.clone());
                }
            }
        }

        let mut children = Vec::new();
        for (base, criteria) in groups {
            let base_chain = self.chain(base);
            if session.is_literal(&base_chain) {
                tracing::debug!(path = %base_chain, "reference given as a value, criteria ignored");
                continue;
            }
            let (value, created) = self.query_or_create(env, session, class, base, criteria)?;
            if created {
                children.push(value.clone());
            }
            session.register(Specification::literal(self.chain(base), Value::Object(value)));
        }
        Ok(children)
    }

    fn query_or_create(
        &self,
        env: &BuildEnv<'_>,
        session: &mut BuildSession,
        class: &dyn ErasedBeanClass,
        base: &str,
        criteria: Criteria,
    ) -> Result<(ObjectRef, bool)> {
        let base_chain = self.chain(base);
        let related = class.property_type(base).and_then(PropertyType::referenced);
        for key in criteria.keys() {
            let known = related.is_some_and(|related| {
                key.parse::<PropertyChain>()
                    .ok()
                    .and_then(|path| path_type(related, &path))
                    .is_some()
            });
            if !known {
                return Err(BuildError::UnresolvableReference {
                    path: format!("{base_chain}.{key}"),
                });
            }
        }
        let Some(related) = related else {
            return Err(BuildError::UnresolvableReference {
                path: base_chain.to_string(),
            });
        };
        let criteria = env.accessor.convert_criteria(related, &criteria);

        if let Some(found) = env.factories.repository().query(related, &criteria)?.into_iter().next() {
            tracing::debug!(path = %base_chain, bean = related.name(), "reference satisfied by query");
            session.record(base_chain.segments(), related.class().as_ref(), &found);
            return Ok((found, false));
        }

        if env.factories.config().reuse_pending_references {
            if let Some(found) = session.find_pending(related, &criteria) {
                tracing::debug!(path = %base_chain, bean = related.name(), "reference satisfied by object of this build");
                session.record(base_chain.segments(), related.class().as_ref(), &found);
                return Ok((found, false));
            }
        }

        tracing::debug!(path = %base_chain, bean = related.name(), "reference created");
        let mut request = BuildRequest::new(related);
        request.overrides = criteria;
        let child = Self::new(
            env.factories,
            request,
            base_chain.segments().to_vec(),
            Some(self.bean),
        )?;
        Ok((child.build(env, session)?, true))
    }

    fn collect_specifications(&self, session: &mut BuildSession) -> Result<()> {
        let mut definitions = self
            .factory
            .definitions(self.extension.as_deref(), &self.combinations)?;
        definitions.extend(self.specs.iter().cloned());

        for definition in definitions {
            let mut builder =
                SpecificationBuilder::new(session, &self.prefix, self.sequence, &self.params);
            definition(&mut builder);
            builder.finish()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ObjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectContext")
            .field("bean", &self.bean)
            .field("sequence", &self.sequence)
            .field("prefix", &self.prefix)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

struct BuildEnv<'f> {
    factories: &'f FactorySet,
    accessor: BeanAccessor,
}

/// Build a whole tree rooted at `request` in a fresh session
///
/// Nothing is saved unless every object of the tree was built. Saving is
/// not transactional: if the repository fails part-way, the objects saved
/// before the failure stay saved and the error is returned.
pub(crate) fn build_tree(factories: &FactorySet, request: BuildRequest) -> Result<ObjectRef> {
    let env = BuildEnv {
        factories,
        accessor: factories.accessor(),
    };
    let bean = request.bean;
    tracing::debug!(bean = bean.name(), "build tree started");

    let mut session = BuildSession::new();
    let root = ObjectContext::new(factories, request, Vec::new(), None)?.build(&env, &mut session)?;

    let saved = if factories.config().persist_on_build {
        let order = session.save_order(&root);
        for object in &order {
            factories.repository().save(object.clone())?;
        }
        order.len()
    } else {
        0
    };

    tracing::debug!(
        bean = bean.name(),
        objects = session.pending().len(),
        saved,
        "build tree committed"
    );
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::repository::{DataRepository, InMemoryRepository};
    use forge_accessor::{Bean, BeanClass};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Owner {
        name: String,
    }

    impl Bean for Owner {
        fn describe() -> BeanClass<Self> {
            Self::class().property("name", |o| o.name.clone(), |o, v| o.name = v)
        }
    }

    #[derive(Debug, Default)]
    struct Pet {
        kind: String,
        owner: Option<Arc<Owner>>,
    }

    impl Bean for Pet {
        fn describe() -> BeanClass<Self> {
            Self::class()
                .property("kind", |p| p.kind.clone(), |p, v| p.kind = v)
                .property("owner", |p| p.owner.clone(), |p, v| p.owner = v)
        }
    }

    struct FailingRepository;

    impl DataRepository for FailingRepository {
        fn save(&self, _: ObjectRef) -> std::result::Result<(), RepositoryError> {
            Err(RepositoryError::Backend("read only".into()))
        }

        fn query(&self, _: BeanType, _: &Criteria) -> std::result::Result<Vec<ObjectRef>, RepositoryError> {
            Ok(Vec::new())
        }

        fn clear(&self) {}
    }

    #[test]
    fn override_keys_are_parsed() {
        assert_eq!(
            PropertyOverride::parse("kind", Value::from("cat")).unwrap(),
            PropertyOverride::Direct {
                name: "kind".into(),
                value: Value::from("cat"),
            }
        );
        assert_eq!(
            PropertyOverride::parse("owner.name", Value::from("Ann")).unwrap(),
            PropertyOverride::Reference {
                base: "owner".into(),
                remainder: PropertyChain::leaf("name"),
                value: Value::from("Ann"),
            }
        );
        assert!(PropertyOverride::parse("owner..name", Value::Null).is_err());
    }

    #[test]
    fn child_is_linked_and_saved_first() {
        let factories = FactorySet::new();
        let mut request = BuildRequest::new(BeanType::of::<Pet>());
        request.overrides.insert("owner.name".into(), Value::from("Ann"));

        let root = build_tree(&factories, request).unwrap();
        let pet = root.downcast::<Pet>().unwrap();
        let owner = pet.owner.clone().unwrap();
        assert_eq!(owner.name, "Ann");
        assert_eq!(pet.kind, "kind#1");

        let saved = factories.repository().query(BeanType::of::<Owner>(), &Criteria::new()).unwrap();
        assert_eq!(saved.len(), 1);
        assert!(Arc::ptr_eq(&saved[0].downcast::<Owner>().unwrap(), &owner));
    }

    #[test]
    fn context_exposes_its_position() {
        let factories = FactorySet::new();
        let mut request = BuildRequest::new(BeanType::of::<Owner>());
        request.params.insert("locale".into(), Value::from("fr"));
        let context = ObjectContext::new(
            &factories,
            request,
            vec!["owner".into()],
            Some(BeanType::of::<Pet>()),
        )
        .unwrap();

        assert_eq!(context.sequence(), 1);
        assert_eq!(context.property_name(), Some("owner"));
        assert_eq!(context.parent(), Some(BeanType::of::<Pet>()));
        assert_eq!(context.params().get("locale"), Some(&Value::from("fr")));
        assert_eq!(context.prefix(), &["owner".to_string()]);
    }

    #[test]
    fn reference_to_scalar_is_unresolvable() {
        let factories = FactorySet::new();
        let mut request = BuildRequest::new(BeanType::of::<Pet>());
        request.overrides.insert("kind.length".into(), Value::Int(3));
        let err = build_tree(&factories, request).unwrap_err();
        assert!(matches!(err, BuildError::UnresolvableReference { path } if path == "kind.length"));
    }

    #[test]
    fn unknown_remainder_is_unresolvable() {
        let factories = FactorySet::new();
        let mut request = BuildRequest::new(BeanType::of::<Pet>());
        request.overrides.insert("owner.age".into(), Value::Int(3));
        let err = build_tree(&factories, request).unwrap_err();
        assert!(matches!(err, BuildError::UnresolvableReference { path } if path == "owner.age"));
    }

    #[test]
    fn repository_failure_aborts_build() {
        let factories = FactorySet::new().with_repository(Arc::new(FailingRepository));
        let err = build_tree(&factories, BuildRequest::new(BeanType::of::<Owner>())).unwrap_err();
        assert!(matches!(err, BuildError::Repository(_)));
    }

    #[test]
    fn persistence_can_be_disabled() {
        let repository = Arc::new(InMemoryRepository::new());
        let factories = FactorySet::with_config(crate::ForgeConfig::new().with_persist_on_build(false))
            .with_repository(Arc::clone(&repository) as Arc<dyn DataRepository>);
        build_tree(&factories, BuildRequest::new(BeanType::of::<Owner>())).unwrap();
        assert!(repository.is_empty());
    }
}
